use super::diagram::{self, FENCE_CLOSE, MERMAID_OPEN};
use super::prompts::excerpt;
use crate::types::{Report, ReportSection, SearchResult, SectionKind, SectionStatus};
use serde::{Deserialize, Serialize};

const EMPTY_CLOSE: &str = "```";

/// A rendered markdown report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub query: String,
    pub markdown: String,
}

/// Piece of a [`Document`] as a presentation layer renders it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Markdown(&'a str),
    /// Body of a fenced `mermaid` block, without the fences
    Diagram(&'a str),
}

impl Document {
    /// Split the markdown into text and diagram segments, in document order.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut rest = self.markdown.as_str();

        while let Some(start) = rest.find(MERMAID_OPEN) {
            let body_start = start + MERMAID_OPEN.len();
            let after_open = &rest[body_start..];
            // An empty block closes on the line right after the opening fence
            let (body_len, close_len) = if after_open.starts_with(EMPTY_CLOSE) {
                (0, EMPTY_CLOSE.len())
            } else if let Some(body_len) = after_open.find(FENCE_CLOSE) {
                (body_len, FENCE_CLOSE.len())
            } else {
                break;
            };

            let before = &rest[..start];
            if !before.trim().is_empty() {
                segments.push(Segment::Markdown(before));
            }
            segments.push(Segment::Diagram(&after_open[..body_len]));
            rest = &after_open[body_len + close_len..];
        }

        if !rest.trim().is_empty() {
            segments.push(Segment::Markdown(rest));
        }
        segments
    }

    /// Download name: `research_report_<first 20 chars of the query>.md`
    pub fn file_name(&self) -> String {
        let stem: String = self
            .query
            .trim()
            .chars()
            .take(20)
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("research_report_{}.md", stem)
    }
}

/// Renders a [`Report`] into one markdown [`Document`].
///
/// Assembly is pure: the same report always renders to the same bytes. The
/// generation timestamp comes from the report itself.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    /// Sources summarized in the literature review
    pub literature_sources: usize,
    /// Sources listed at the end of the report
    pub listed_sources: usize,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self {
            literature_sources: 5,
            listed_sources: 10,
        }
    }
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assemble(&self, report: &Report) -> Document {
        let mut out = format!(
            "# Research Report: {}\n\nGenerated: {}\n\n---\n\n",
            report.query,
            report.generated_at.format("%B %d, %Y at %H:%M:%S UTC")
        );

        for section in ordered(&report.sections) {
            out.push_str(&render_section(section));

            match section.kind {
                SectionKind::KeyFindings => {
                    out.push_str("### Findings Overview\n\n");
                    out.push_str(&diagram::fenced(&diagram::findings_overview(&report.sources)));
                    out.push_str("\n\n");
                }
                SectionKind::Methodology => {
                    out.push_str("## Literature Review\n\n");
                    out.push_str(&self.literature_review(&report.sources));
                    out.push_str("\n\n");
                }
                _ => {}
            }
        }

        out.push_str("## Sources\n\n");
        out.push_str(&self.source_list(&report.sources));
        out.push_str(&format!(
            "---\n\n*Report generated by deepdive*\n*Total sources analyzed: {}*\n",
            report.sources.len()
        ));

        Document {
            query: report.query.clone(),
            markdown: out,
        }
    }

    fn literature_review(&self, sources: &[SearchResult]) -> String {
        if sources.is_empty() {
            return "- N/A".to_string();
        }

        sources
            .iter()
            .take(self.literature_sources)
            .map(|s| {
                let snippet = excerpt(&s.snippet, 200).replace('\n', " ");
                format!("- **{}**: {}... ({})", s.title, snippet.trim(), s.url)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn source_list(&self, sources: &[SearchResult]) -> String {
        if sources.is_empty() {
            return "No sources.\n\n".to_string();
        }

        sources
            .iter()
            .take(self.listed_sources)
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "{}. **{}**\n   URL: {}\n   Source: {}\n\n",
                    i + 1,
                    s.title,
                    s.url,
                    s.source
                )
            })
            .collect()
    }
}

/// Sections in kind order, keeping the first section of each kind.
fn ordered(sections: &[ReportSection]) -> Vec<&ReportSection> {
    let mut sorted: Vec<&ReportSection> = sections.iter().collect();
    sorted.sort_by_key(|s| s.kind);
    sorted.dedup_by_key(|s| s.kind);
    sorted
}

fn render_section(section: &ReportSection) -> String {
    let body = match &section.status {
        SectionStatus::Succeeded => section.content.trim().to_string(),
        SectionStatus::Failed { reason } => format!("> **Section unavailable:** {}", reason),
        SectionStatus::Pending => "> *Section not generated yet.*".to_string(),
    };
    format!("## {}\n\n{}\n\n", section.kind.title(), body)
}
