//! Mock providers for testing.
//!
//! [`ScriptedLLM`] answers each prompt from the first rule whose marker the
//! prompt contains, optionally after a delay, so tests can drive every stage
//! of a run and shape section completion order. [`StaticSearch`] returns a
//! fixed result list or a fixed error.

use async_trait::async_trait;
use deepdive::llm::LLMClient;
use deepdive::search::WebSearch;
use deepdive::types::{AppError, Findings, Result, SearchResult, SectionKind};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Prompt marker of the query analysis step
pub const ANALYSIS_MARKER: &str = "senior research strategist";
/// Prompt marker of the synthesis step
pub const SYNTHESIS_MARKER: &str = "expert analyst";
/// Prompt marker of the progress narrative
pub const NARRATIVE_MARKER: &str = "Summarize the progress";

/// Prompt marker of one report section
pub fn section_marker(kind: SectionKind) -> String {
    format!("\"{}\" section", kind.title())
}

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

struct Rule {
    marker: String,
    reply: Reply,
    delay: Duration,
}

/// LLM client that answers from marker-keyed rules.
pub struct ScriptedLLM {
    rules: Vec<Rule>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedLLM {
    /// Client that answers every prompt with `fallback`.
    pub fn new(fallback: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Client scripted for a full run: brief, synthesis and one reply per section.
    pub fn for_pipeline() -> Self {
        let mut client = Self::new("Generic model reply.")
            .reply(ANALYSIS_MARKER, BRIEF)
            .reply(SYNTHESIS_MARKER, SYNTHESIS)
            .reply(NARRATIVE_MARKER, "The run searched the web and drafted every section.");
        for kind in SectionKind::ALL {
            client = client.reply(&section_marker(kind), &section_text(kind));
        }
        client
    }

    pub fn reply(self, marker: &str, text: &str) -> Self {
        self.rule(marker, Reply::Text(text.to_string()), Duration::ZERO)
    }

    pub fn reply_after(self, marker: &str, text: &str, delay: Duration) -> Self {
        self.rule(marker, Reply::Text(text.to_string()), delay)
    }

    pub fn fail(self, marker: &str, error: &str) -> Self {
        self.rule(marker, Reply::Fail(error.to_string()), Duration::ZERO)
    }

    pub fn fail_after(self, marker: &str, error: &str, delay: Duration) -> Self {
        self.rule(marker, Reply::Fail(error.to_string()), delay)
    }

    /// Earlier rules win.
    fn rule(mut self, marker: &str, reply: Reply, delay: Duration) -> Self {
        self.rules.push(Rule {
            marker: marker.to_string(),
            reply,
            delay,
        });
        self
    }

    /// Rule checked before every existing one.
    pub fn prepend_fail(mut self, marker: &str, error: &str) -> Self {
        self.rules.insert(
            0,
            Rule {
                marker: marker.to_string(),
                reply: Reply::Fail(error.to_string()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn calls_matching(&self, marker: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains(marker))
            .count()
    }

    /// Highest number of calls that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());

        let (reply, delay) = self
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.marker))
            .map(|rule| (rule.reply.clone(), rule.delay))
            .unwrap_or_else(|| (Reply::Text(self.fallback.clone()), Duration::ZERO));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(error) => Err(AppError::LLM(error)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Search backend with a fixed answer.
pub struct StaticSearch {
    results: Vec<SearchResult>,
    error: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            error: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.queries.lock().push(query.to_string());
        match &self.error {
            Some(error) => Err(AppError::Search(error.clone())),
            None => Ok(self.results.iter().take(max_results).cloned().collect()),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============= Fixtures =============

pub const BRIEF: &str = "\
## Research Objectives
- Map the current state of the field

## Key Focus Areas
- Agent planning
- Tool use

## Search Terms
- AI agents 2025
- autonomous agents benchmarks
";

/// Synthesis reply with two insights, each citing one of the sample results.
pub const SYNTHESIS: &str = "\
## Executive Insights
- Planning quality improved sharply according to Agent Planning Survey 2025
- Tool use is now standard, as reported by tools.example.org

## Detailed Analysis
Agents moved from demos into production workloads.
";

pub fn section_text(kind: SectionKind) -> String {
    format!("Drafted content for {}.", kind.title())
}

pub fn sample_results(count: usize) -> Vec<SearchResult> {
    let fixtures = [
        ("Agent Planning Survey 2025", "https://planning.example.com/survey", "planning.example.com"),
        ("Tool Use in Practice", "https://tools.example.org/report", "tools.example.org"),
        ("Benchmarks for Autonomous Agents", "https://bench.example.net/paper", "bench.example.net"),
        ("Agents in Production", "https://prod.example.io/post", "prod.example.io"),
    ];

    (0..count)
        .map(|i| {
            let (title, url, source) = fixtures[i % fixtures.len()];
            SearchResult {
                title: title.to_string(),
                url: url.to_string(),
                snippet: format!("Snippet {} about {}", i, title),
                source: source.to_string(),
            }
        })
        .collect()
}

pub fn sample_findings(query: &str) -> Findings {
    let sources = sample_results(3);
    let mut citations = BTreeMap::new();
    citations.insert(0, vec![0]);
    citations.insert(1, vec![1]);

    Findings {
        query: query.to_string(),
        analysis: SYNTHESIS.to_string(),
        insights: vec![
            "Planning quality improved sharply according to Agent Planning Survey 2025"
                .to_string(),
            "Tool use is now standard, as reported by tools.example.org".to_string(),
        ],
        citations,
        sources,
    }
}
