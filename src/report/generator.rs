use super::prompts::section_prompt;
use crate::llm::{LLMClient, with_timeout};
use crate::progress::{EventLog, EventStatus, actions, components};
use crate::types::{AppError, Findings, Report, ReportSection, SectionKind};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Default number of concurrent section calls
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Drafts report sections concurrently, one model call per section kind.
///
/// At most `max_workers` calls are in flight at once. Sections that fail or
/// time out become placeholders carrying the reason; they never abort their
/// siblings.
pub struct ParallelSectionGenerator {
    llm: Arc<dyn LLMClient>,
    max_workers: usize,
    section_timeout: Option<Duration>,
}

impl ParallelSectionGenerator {
    pub fn new(llm: Arc<dyn LLMClient>, max_workers: usize) -> Self {
        Self {
            llm,
            max_workers: max_workers.max(1),
            section_timeout: None,
        }
    }

    /// Bound each section call; `None` waits indefinitely.
    pub fn with_section_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.section_timeout = timeout;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn section_timeout(&self) -> Option<Duration> {
        self.section_timeout
    }

    /// Generate one section per distinct kind in `kinds`.
    ///
    /// Returns once every task is terminal. The report lists sections in
    /// [`SectionKind`] order regardless of completion order.
    pub async fn generate(
        &self,
        events: &EventLog,
        findings: &Findings,
        kinds: &[SectionKind],
    ) -> Report {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();

        let started = Instant::now();
        let findings = Arc::new(findings.clone());
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut set = JoinSet::new();

        for kind in kinds.iter().copied() {
            let llm = Arc::clone(&self.llm);
            let events = events.clone();
            let findings = Arc::clone(&findings);
            let permits = Arc::clone(&permits);
            let timeout = self.section_timeout;

            set.spawn(async move {
                let section = match permits.acquire_owned().await {
                    Ok(_permit) => draft_section(llm.as_ref(), &events, &findings, kind, timeout).await,
                    Err(_) => ReportSection::failed(kind, "Worker pool closed"),
                };
                (kind, section)
            });
        }

        // Each task writes only its own slot
        let mut slots: BTreeMap<SectionKind, ReportSection> = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((kind, section)) => {
                    slots.insert(kind, section);
                }
                Err(e) => tracing::error!("Section task panicked: {}", e),
            }
        }

        let sections: Vec<ReportSection> = kinds
            .iter()
            .map(|kind| {
                slots.remove(kind).unwrap_or_else(|| {
                    let reason = "Section task aborted before completing";
                    events.record(
                        components::SECTIONS,
                        actions::GENERATE_SECTION,
                        EventStatus::Failed,
                        format!("{} failed: {}", kind.title(), reason),
                        json!({ "section": kind.as_str() }),
                    );
                    ReportSection::failed(*kind, reason)
                })
            })
            .collect();

        let status = Report::status_for(&sections);
        tracing::info!(
            run_id = %events.run_id(),
            sections = sections.len(),
            workers = self.max_workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            status = ?status,
            "Section generation finished"
        );

        Report {
            query: findings.query.clone(),
            sections,
            status,
            sources: findings.sources.clone(),
            generated_at: Utc::now(),
        }
    }
}

async fn draft_section(
    llm: &dyn LLMClient,
    events: &EventLog,
    findings: &Findings,
    kind: SectionKind,
    timeout: Option<Duration>,
) -> ReportSection {
    events.record(
        components::SECTIONS,
        actions::GENERATE_SECTION,
        EventStatus::Started,
        format!("Generating {}", kind.title()),
        json!({ "section": kind.as_str() }),
    );

    let started = Instant::now();
    let prompt = section_prompt(kind, findings);
    let outcome = with_timeout(llm.generate(&prompt), timeout).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let outcome = outcome.and_then(|text| {
        if text.trim().is_empty() {
            Err(AppError::LLM("Model returned empty content".to_string()))
        } else {
            Ok(text)
        }
    });

    match outcome {
        Ok(text) => {
            events.record(
                components::SECTIONS,
                actions::GENERATE_SECTION,
                EventStatus::Succeeded,
                format!("{} ready", kind.title()),
                json!({ "section": kind.as_str(), "elapsed_ms": elapsed_ms }),
            );
            ReportSection::succeeded(kind, text.trim())
        }
        Err(e) => {
            let reason = e.to_string();
            events.record(
                components::SECTIONS,
                actions::GENERATE_SECTION,
                EventStatus::Failed,
                format!("{} failed: {}", kind.title(), reason),
                json!({
                    "section": kind.as_str(),
                    "elapsed_ms": elapsed_ms,
                    "error": reason,
                }),
            );
            ReportSection::failed(kind, reason)
        }
    }
}
