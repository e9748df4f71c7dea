//! Mermaid diagram builders.
//!
//! Builders return the diagram body only; [`fenced`] wraps a body in the
//! ```` ```mermaid ```` block that [`super::Document::segments`] recognizes.

use crate::progress::Stage;
use crate::types::SearchResult;

/// Opening fence of an inline diagram block
pub const MERMAID_OPEN: &str = "```mermaid\n";
/// Closing fence, preceded by the newline that ends the diagram body
pub const FENCE_CLOSE: &str = "\n```";

/// Number of sources linked into the findings overview
pub const DIAGRAM_SOURCES: usize = 3;

/// Make text safe to use inside a `[...]` node label.
pub fn label(text: &str) -> String {
    text.replace('[', "(")
        .replace(']', ")")
        .replace('"', "'")
        .replace('\n', " ")
}

pub fn fenced(body: &str) -> String {
    format!("{}{}{}", MERMAID_OPEN, body.trim_end(), FENCE_CLOSE)
}

/// Query feeding the key findings, with up to three sources pointing at them.
pub fn findings_overview(sources: &[SearchResult]) -> String {
    let mut lines = vec![
        "graph LR".to_string(),
        "  A[Query] --> B[Key Findings]".to_string(),
    ];
    for (i, source) in sources.iter().take(DIAGRAM_SOURCES).enumerate() {
        lines.push(format!("  S{}[{}] --> B", i + 1, label(&source.title)));
    }
    lines.join("\n")
}

fn node_id(stage: Stage) -> &'static str {
    match stage {
        Stage::QueryAnalysis => "Q",
        Stage::WebSearch => "S",
        Stage::Synthesis => "A",
        Stage::Report => "R",
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::QueryAnalysis => "Query Analysis",
        Stage::WebSearch => "Web Search",
        Stage::Synthesis => "Synthesis",
        Stage::Report => "Report",
    }
}

/// The four pipeline stages left to right, highlighting `active`.
pub fn pipeline_flow(active: Option<Stage>) -> String {
    let chain = Stage::ALL
        .iter()
        .map(|stage| format!("{}[{}]", node_id(*stage), stage_label(*stage)))
        .collect::<Vec<_>>()
        .join(" --> ");

    let mut lines = vec!["graph LR".to_string(), format!("  {}", chain)];
    if let Some(stage) = active {
        lines.push("  classDef active fill:#ffd54f,stroke:#333,stroke-width:2px".to_string());
        lines.push(format!("  class {} active", node_id(stage)));
    }
    lines.join("\n")
}
