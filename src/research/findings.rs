//! Parsing of model markdown into structured research data.

use super::prompts::INSIGHTS_HEADING;
use crate::search::host_of;
use crate::types::{Findings, SearchResult};
use std::collections::BTreeMap;

/// Shortest title that is matched against insight text
const MIN_TITLE_MATCH: usize = 8;

/// Text of a markdown list item, without its marker
fn bullet_text(line: &str) -> Option<&str> {
    let line = line.trim_start();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }

    // Numbered items: "1. text" or "1) text"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(text) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(text.trim());
        }
    }
    None
}

fn heading_text(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.starts_with('#') {
        Some(line.trim_start_matches('#').trim())
    } else {
        None
    }
}

/// Bullets grouped by the heading they appear under, in document order.
/// Bullets before the first heading are grouped under an empty heading.
fn bullets_by_heading(markdown: &str) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = vec![(String::new(), Vec::new())];

    for line in markdown.lines() {
        if let Some(heading) = heading_text(line) {
            groups.push((heading.to_lowercase(), Vec::new()));
        } else if let Some(text) = bullet_text(line) {
            let cleaned = text.replace("**", "");
            if !cleaned.is_empty() {
                if let Some((_, bullets)) = groups.last_mut() {
                    bullets.push(cleaned);
                }
            }
        }
    }

    groups
}

fn bullets_under(groups: &[(String, Vec<String>)], heading: &str) -> Vec<String> {
    let heading = heading.to_lowercase();
    groups
        .iter()
        .filter(|(h, _)| h.contains(&heading))
        .flat_map(|(_, bullets)| bullets.iter().cloned())
        .collect()
}

/// Focus areas and refined search terms listed in a research brief.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Brief {
    pub focus_areas: Vec<String>,
    pub search_terms: Vec<String>,
}

pub fn parse_brief(markdown: &str) -> Brief {
    let groups = bullets_by_heading(markdown);
    Brief {
        focus_areas: bullets_under(&groups, "focus areas"),
        search_terms: bullets_under(&groups, "search terms"),
    }
}

/// Indices of the sources an insight refers to by title or host.
fn cited_sources(insight: &str, sources: &[SearchResult]) -> Vec<usize> {
    let text = insight.to_lowercase();

    sources
        .iter()
        .enumerate()
        .filter(|(_, source)| {
            let title = source.title.trim().to_lowercase();
            if title.chars().count() >= MIN_TITLE_MATCH && text.contains(&title) {
                return true;
            }

            let hosts = [Some(source.source.to_lowercase()), host_of(&source.url)];
            hosts
                .into_iter()
                .flatten()
                .any(|host| host.contains('.') && text.contains(&host.to_lowercase()))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Build [`Findings`] from the synthesis markdown.
///
/// Insights are the bullets under the "Executive Insights" heading, or every
/// bullet when the model left that heading out.
pub fn parse_findings(query: &str, analysis: &str, sources: Vec<SearchResult>) -> Findings {
    let groups = bullets_by_heading(analysis);

    let mut insights = bullets_under(&groups, INSIGHTS_HEADING);
    if insights.is_empty() {
        insights = groups.into_iter().flat_map(|(_, bullets)| bullets).collect();
    }

    let citations: BTreeMap<usize, Vec<usize>> = insights
        .iter()
        .enumerate()
        .filter_map(|(i, insight)| {
            let cited = cited_sources(insight, &sources);
            (!cited.is_empty()).then_some((i, cited))
        })
        .collect();

    Findings {
        query: query.to_string(),
        analysis: analysis.to_string(),
        insights,
        citations,
        sources,
    }
}
