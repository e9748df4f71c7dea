use super::context::RunContext;
use super::findings::{parse_brief, parse_findings};
use super::prompts;
use crate::{
    llm::{LLMClient, Provider, with_timeout},
    progress::{EventStatus, Stage, actions, components},
    report::{Document, ParallelSectionGenerator, ReportAssembler},
    search::{TavilyClient, WebSearch},
    types::{AppError, Findings, Report, ResearchQuery, Result, SearchResult, SectionKind},
    utils::toml_config::{Credentials, DeepdiveConfig},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default limit for a single query analysis, synthesis or narrative call
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub query: ResearchQuery,
    pub search_results: Vec<SearchResult>,
    pub findings: Findings,
    pub report: Report,
    pub document: Document,
}

/// Drives one research run through its four stages:
/// query analysis, web search, synthesis and report generation.
///
/// The first three stages are strictly sequential and any failure aborts the
/// run. Report generation degrades per section instead.
pub struct ResearchCoordinator {
    llm: Arc<dyn LLMClient>,
    search: Arc<dyn WebSearch>,
    generator: ParallelSectionGenerator,
    assembler: ReportAssembler,
    max_results: usize,
    llm_timeout: Option<Duration>,
}

impl ResearchCoordinator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        search: Arc<dyn WebSearch>,
        generator: ParallelSectionGenerator,
    ) -> Self {
        Self {
            llm,
            search,
            generator,
            assembler: ReportAssembler::default(),
            max_results: 5,
            llm_timeout: Some(DEFAULT_LLM_TIMEOUT),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Limit for each query analysis, synthesis and narrative call; `None`
    /// waits indefinitely
    pub fn with_llm_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn llm_timeout(&self) -> Option<Duration> {
        self.llm_timeout
    }

    /// Wire up the configured providers
    pub fn from_config(config: &DeepdiveConfig, credentials: &Credentials) -> Result<Self> {
        let provider = Provider::from_config(&config.llm, credentials.llm_api_key.clone());
        tracing::debug!(
            provider = provider.name(),
            model = provider.model(),
            "LLM provider configured"
        );
        let llm = provider.create_client()?;

        let search = TavilyClient::new(
            credentials.search_api_key.clone(),
            config.search.base_url.clone(),
            Duration::from_secs(config.search.timeout_secs),
        )?
        .with_search_depth(config.search.search_depth.clone());

        let generator = ParallelSectionGenerator::new(Arc::clone(&llm), config.report.max_workers)
            .with_section_timeout(config.report.section_timeout());

        Ok(Self::new(llm, Arc::new(search), generator)
            .with_max_results(config.search.max_results)
            .with_llm_timeout(config.llm.timeout()))
    }

    pub fn llm(&self) -> Arc<dyn LLMClient> {
        Arc::clone(&self.llm)
    }

    /// Execute the full pipeline for `ctx.query`.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunOutcome> {
        tracing::info!(run_id = %ctx.id, query = %ctx.query, "Research run started");

        let query = self.analyze_query(ctx).await?;
        let search_results = self.web_research(ctx, &query).await?;
        let findings = self.synthesize(ctx, &query, &search_results).await?;
        let (report, document) = self.generate_report(ctx, &findings).await;

        tracing::info!(
            run_id = %ctx.id,
            elapsed_ms = ctx.elapsed_ms(),
            status = ?report.status,
            "Research run finished"
        );

        Ok(RunOutcome {
            query,
            search_results,
            findings,
            report,
            document,
        })
    }

    /// Ask the model for a research brief and extract its refinement metadata.
    pub async fn analyze_query(&self, ctx: &RunContext) -> Result<ResearchQuery> {
        let stage = Stage::QueryAnalysis;
        if ctx.query.trim().is_empty() {
            let err = AppError::InvalidInput("Query must not be empty".to_string());
            return Err(fail_stage(ctx, stage, "Query analysis", err));
        }

        record_stage(
            ctx,
            stage,
            EventStatus::Started,
            "Analyzing query",
            json!({ "query": ctx.query }),
        );

        let brief = self
            .invoke_llm(ctx, actions::ANALYZE_QUERY, &prompts::query_analysis(&ctx.query))
            .await
            .map_err(|e| fail_stage(ctx, stage, "Query analysis", e))?;

        let parsed = parse_brief(&brief);
        let query = ResearchQuery {
            text: ctx.query.clone(),
            brief,
            focus_areas: parsed.focus_areas,
            search_terms: parsed.search_terms,
        };

        record_stage(
            ctx,
            stage,
            EventStatus::Succeeded,
            "Query analysis completed",
            json!({
                "focus_areas": query.focus_areas.len(),
                "search_terms": query.search_terms.len(),
            }),
        );
        Ok(query)
    }

    /// Run the web search for the submitted query.
    pub async fn web_research(
        &self,
        ctx: &RunContext,
        query: &ResearchQuery,
    ) -> Result<Vec<SearchResult>> {
        let stage = Stage::WebSearch;
        record_stage(
            ctx,
            stage,
            EventStatus::Started,
            "Searching the web",
            json!({ "max_results": self.max_results }),
        );

        let results = self
            .invoke_search(ctx, &query.text)
            .await
            .map_err(|e| fail_stage(ctx, stage, "Web research", e))?;

        record_stage(
            ctx,
            stage,
            EventStatus::Succeeded,
            format!("Found {} results", results.len()),
            json!({ "count": results.len() }),
        );
        Ok(results)
    }

    /// Synthesize the search results into findings.
    pub async fn synthesize(
        &self,
        ctx: &RunContext,
        query: &ResearchQuery,
        results: &[SearchResult],
    ) -> Result<Findings> {
        let stage = Stage::Synthesis;
        if results.is_empty() {
            let err = AppError::Research("No search results to analyze".to_string());
            return Err(fail_stage(ctx, stage, "Content analysis", err));
        }

        record_stage(
            ctx,
            stage,
            EventStatus::Started,
            "Analyzing synthesized content",
            json!({ "sources": results.len() }),
        );

        let prompt = prompts::synthesis(&query.text, &query.brief, results);
        let analysis = self
            .invoke_llm(ctx, actions::SYNTHESIZE, &prompt)
            .await
            .map_err(|e| fail_stage(ctx, stage, "Content analysis", e))?;

        let findings = parse_findings(&query.text, &analysis, results.to_vec());

        record_stage(
            ctx,
            stage,
            EventStatus::Succeeded,
            "Content analysis completed",
            json!({
                "insights": findings.insights.len(),
                "cited_insights": findings.citations.len(),
            }),
        );
        Ok(findings)
    }

    /// Draft every section concurrently and render the document.
    pub async fn generate_report(&self, ctx: &RunContext, findings: &Findings) -> (Report, Document) {
        let stage = Stage::Report;
        record_stage(
            ctx,
            stage,
            EventStatus::Started,
            "Composing final report",
            json!({
                "sections": SectionKind::ALL.len(),
                "workers": self.generator.max_workers(),
            }),
        );

        let report = self
            .generator
            .generate(&ctx.events, findings, &SectionKind::ALL)
            .await;
        let document = self.assembler.assemble(&report);

        let failed: Vec<&str> = report.failed_sections().map(|s| s.kind.as_str()).collect();
        let message = if failed.is_empty() {
            "Report generation completed".to_string()
        } else {
            format!(
                "Report generated with {} failed section(s)",
                failed.len()
            )
        };

        record_stage(
            ctx,
            stage,
            EventStatus::Succeeded,
            message,
            json!({
                "status": report.status,
                "failed_sections": failed,
                "bytes": document.markdown.len(),
            }),
        );
        (report, document)
    }

    async fn invoke_llm(&self, ctx: &RunContext, purpose: &str, prompt: &str) -> Result<String> {
        let model = self.llm.model_name().to_string();
        ctx.events.record(
            components::LLM,
            actions::INVOKE,
            EventStatus::Started,
            format!("Invoking {}", model),
            json!({ "model": model, "purpose": purpose }),
        );

        let started = Instant::now();
        let result = with_timeout(self.llm.generate(prompt), self.llm_timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(text) => ctx.events.record(
                components::LLM,
                actions::INVOKE,
                EventStatus::Succeeded,
                format!("{} responded", model),
                json!({
                    "model": model,
                    "purpose": purpose,
                    "elapsed_ms": elapsed_ms,
                    "chars": text.chars().count(),
                }),
            ),
            Err(e) => ctx.events.record(
                components::LLM,
                actions::INVOKE,
                EventStatus::Failed,
                e.to_string(),
                json!({ "model": model, "purpose": purpose, "elapsed_ms": elapsed_ms }),
            ),
        };

        result
    }

    async fn invoke_search(&self, ctx: &RunContext, query: &str) -> Result<Vec<SearchResult>> {
        let provider = self.search.name().to_string();
        ctx.events.record(
            components::SEARCH,
            actions::QUERY,
            EventStatus::Started,
            format!("Querying {}", provider),
            json!({ "provider": provider, "max_results": self.max_results }),
        );

        let started = Instant::now();
        let result = self.search.search(query, self.max_results).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(results) => ctx.events.record(
                components::SEARCH,
                actions::QUERY,
                EventStatus::Succeeded,
                format!("{} returned {} results", provider, results.len()),
                json!({ "provider": provider, "count": results.len(), "elapsed_ms": elapsed_ms }),
            ),
            Err(e) => ctx.events.record(
                components::SEARCH,
                actions::QUERY,
                EventStatus::Failed,
                e.to_string(),
                json!({ "provider": provider, "elapsed_ms": elapsed_ms }),
            ),
        };

        result
    }
}

fn record_stage(
    ctx: &RunContext,
    stage: Stage,
    status: EventStatus,
    message: impl Into<String>,
    meta: Value,
) {
    ctx.events
        .record(components::PIPELINE, stage.action(), status, message, meta);
}

/// Record a failed stage event and hand the error back for propagation
fn fail_stage(ctx: &RunContext, stage: Stage, label: &str, err: AppError) -> AppError {
    record_stage(
        ctx,
        stage,
        EventStatus::Failed,
        format!("{} failed: {}", label, err),
        json!({ "error": err.to_string() }),
    );
    err
}
