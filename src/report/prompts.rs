use crate::types::{Findings, SectionKind};

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn header(kind: SectionKind, query: &str) -> String {
    format!(
        "You are drafting the \"{}\" section of a professional research report.\n\nTOPIC: {}\n",
        kind.title(),
        query
    )
}

fn insights_block(findings: &Findings) -> String {
    if findings.insights.is_empty() {
        return "- (no distinct insights were extracted)".to_string();
    }

    findings
        .insights
        .iter()
        .enumerate()
        .map(|(i, insight)| {
            let cited: Vec<&str> = findings
                .citations_for(i)
                .into_iter()
                .map(|s| s.source.as_str())
                .collect();
            if cited.is_empty() {
                format!("- {}", insight)
            } else {
                format!("- {} (sources: {})", insight, cited.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the generation prompt for one section kind.
pub fn section_prompt(kind: SectionKind, findings: &Findings) -> String {
    let analysis = findings.analysis.as_str();
    let mut prompt = header(kind, &findings.query);

    match kind {
        SectionKind::ExecutiveSummary => {
            prompt.push_str(&format!(
                "\nANALYSIS (excerpt):\n{}\n\nKEY INSIGHTS:\n{}\n\n\
                 Write a concise executive summary of 120-180 words. Provide only the summary text.",
                excerpt(analysis, 700),
                insights_block(findings)
            ));
        }
        SectionKind::KeyFindings => {
            let sources = findings
                .sources
                .iter()
                .take(2)
                .map(|s| format!("- {}: {}...", s.title, excerpt(&s.snippet, 140)))
                .collect::<Vec<_>>()
                .join("\n");
            prompt.push_str(&format!(
                "\nANALYSIS (excerpt):\n{}\n\nKEY INSIGHTS:\n{}\n\nSUPPORTING SOURCES:\n{}\n\n\
                 Format 5-7 specific, evidence-oriented key findings as a bulleted list. \
                 Cite the source title or domain in parentheses.",
                excerpt(analysis, 1800),
                insights_block(findings),
                sources
            ));
        }
        SectionKind::Methodology => {
            prompt.push_str(&format!(
                "\nThe research combined a web search ({} sources retained) with model-assisted \
                 qualitative synthesis.\n\n\
                 Write a brief methodology section of 80-120 words covering the research approach, \
                 data sources, analysis methods and limitations. Provide only the methodology text.",
                findings.sources.len()
            ));
        }
        SectionKind::Implications => {
            prompt.push_str(&format!(
                "\nANALYSIS (excerpt):\n{}\n\n\
                 Provide implications and recommendations in 120-180 words: key implications, \
                 recommendations for further research and practical applications. \
                 Be concise and action-oriented.",
                excerpt(analysis, 1200)
            ));
        }
        SectionKind::Conclusion => {
            prompt.push_str(&format!(
                "\nANALYSIS SUMMARY (excerpt):\n{}\n\n\
                 Write a professional conclusion of 90-130 words. Provide only the conclusion text.",
                excerpt(analysis, 400)
            ));
        }
    }

    prompt
}
