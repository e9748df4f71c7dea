use crate::progress::ProgressEvent;
use crate::report::prompts::excerpt;
use crate::types::SearchResult;

/// Sources included in the synthesis prompt
pub const SYNTHESIS_SOURCES: usize = 5;

/// Heading whose bullets become the run's key insights
pub const INSIGHTS_HEADING: &str = "Executive Insights";

pub fn query_analysis(query: &str) -> String {
    format!(
        r#"You are a senior research strategist. Analyze the user's query and produce
an action-ready brief to drive a high-quality web research and reporting workflow.

USER QUERY: {query}

DELIVERABLE (concise, markdown):
### Refined Search Terms (3-6)
- term

### Research Focus Areas (3-5)
- focus

### Key Questions to Answer (4-6)
- question

### Evidence To Prioritize
- data points, benchmarks, real examples, recent updates where possible

CONSTRAINTS:
- Professional, precise tone. No speculation.
- Prefer recent, credible sources; note if the topic lacks fresh evidence."#
    )
}

pub fn synthesis(query: &str, brief: &str, results: &[SearchResult]) -> String {
    let findings = results
        .iter()
        .take(SYNTHESIS_SOURCES)
        .map(|r| {
            format!(
                "Source: {}\nURL: {}\nContent: {}...",
                r.title,
                r.url,
                excerpt(&r.snippet, 200)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an expert analyst. Synthesize the following findings into a crisp, evidence-backed analysis.

TOPIC: {query}

RESEARCH BRIEF (excerpt):
{brief}

FINDINGS (title, url, excerpts):
{findings}

DELIVERABLE (markdown):
### {INSIGHTS_HEADING} (5-8 bullets)
- Each insight specific, decision-useful and grounded in evidence.

### Key Facts & Data
- Fact (source)

### Risks, Limitations, or Unknowns
- risk

### Recommendations (3-5, actionable)
- Start with a strong verb; include minimal rationale.

CITATIONS:
- Reference inline as (source: domain or short title) matching the provided URLs/titles. Do not fabricate sources."#,
        brief = excerpt(brief, 800),
    )
}

/// Events included in a narrative prompt
pub const NARRATIVE_EVENTS: usize = 40;

pub fn narrative(query: &str, events: &[ProgressEvent]) -> String {
    let start = events.len().saturating_sub(NARRATIVE_EVENTS);
    let log = events[start..]
        .iter()
        .map(|e| {
            format!(
                "[{}] {}/{} {}: {}",
                e.timestamp.format("%H:%M:%S"),
                e.component,
                e.action,
                e.status,
                e.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Summarize the progress of this research run in 3-5 plain sentences for a non-technical reader.
Mention what has completed, what is in progress and any failures.

RESEARCH QUERY: {query}

PROGRESS LOG:
{log}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_prompt_bounds_sources() {
        let results: Vec<_> = (0..8)
            .map(|i| SearchResult {
                title: format!("T{i}"),
                url: format!("https://s{i}.example"),
                snippet: "x".repeat(500),
                source: format!("s{i}.example"),
            })
            .collect();

        let prompt = synthesis("topic", "brief", &results);
        assert!(prompt.contains("Source: T4"));
        assert!(!prompt.contains("Source: T5"));
        assert!(!prompt.contains(&"x".repeat(201)));
        assert!(prompt.contains("### Executive Insights"));
    }

    #[test]
    fn test_query_analysis_prompt_contains_query() {
        let prompt = query_analysis("quantum networking");
        assert!(prompt.contains("USER QUERY: quantum networking"));
        assert!(prompt.contains("Research Focus Areas"));
    }
}
