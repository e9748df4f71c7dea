use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::progress::{ProgressEvent, TimelineEntry};

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunAccepted {
    pub run_id: Uuid,
    pub status_url: String,
    pub events_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunStatusResponse {
    pub run_id: Uuid,
    pub query: String,
    pub state: RunState,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_status: Option<ReportStatus>,
    #[serde(default)]
    pub sections: Vec<SectionSummary>,
    #[serde(default)]
    pub sources: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_markdown: Option<String>,
    pub flow_diagram: String,
    /// Latest status of every (component, action) pair seen so far
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionSummary {
    pub kind: SectionKind,
    pub title: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventsResponse {
    pub run_id: Uuid,
    pub events: Vec<ProgressEvent>,
    /// Events evicted from the bounded log since the run started
    pub dropped: u64,
    /// Pass as `after` on the next poll
    pub next_after: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NarrativeResponse {
    pub run_id: Uuid,
    pub narrative: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_runs: usize,
}

// ============= Research Types =============

/// A user submission plus the refinement metadata the query analysis produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchQuery {
    pub text: String,
    /// Raw research brief returned by the query analysis step
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

/// One external document reference returned by the web search provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
}

/// Synthesized insights plus citations derived from the search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Findings {
    pub query: String,
    /// Full synthesis markdown as returned by the model
    pub analysis: String,
    pub insights: Vec<String>,
    /// Insight index -> indices into `sources`
    pub citations: BTreeMap<usize, Vec<usize>>,
    pub sources: Vec<SearchResult>,
}

impl Findings {
    /// Sources cited by the insight at `index`.
    pub fn citations_for(&self, index: usize) -> Vec<&SearchResult> {
        self.citations
            .get(&index)
            .map(|ids| ids.iter().filter_map(|&i| self.sources.get(i)).collect())
            .unwrap_or_default()
    }
}

// ============= Report Types =============

/// Report section categories, declared in report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    ExecutiveSummary,
    KeyFindings,
    Methodology,
    Implications,
    Conclusion,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::ExecutiveSummary,
        SectionKind::KeyFindings,
        SectionKind::Methodology,
        SectionKind::Implications,
        SectionKind::Conclusion,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::ExecutiveSummary => "Executive Summary",
            SectionKind::KeyFindings => "Key Findings",
            SectionKind::Methodology => "Methodology",
            SectionKind::Implications => "Implications & Recommendations",
            SectionKind::Conclusion => "Conclusion",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::ExecutiveSummary => "executive_summary",
            SectionKind::KeyFindings => "key_findings",
            SectionKind::Methodology => "methodology",
            SectionKind::Implications => "implications",
            SectionKind::Conclusion => "conclusion",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionStatus {
    Pending,
    Succeeded,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    /// Rendered markdown, may embed fenced diagram blocks
    pub content: String,
    pub status: SectionStatus,
}

impl ReportSection {
    pub fn succeeded(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            status: SectionStatus::Succeeded,
        }
    }

    /// Placeholder for a section whose generation failed.
    pub fn failed(kind: SectionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            content: String::new(),
            status: SectionStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == SectionStatus::Succeeded
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            SectionStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn summary(&self) -> SectionSummary {
        SectionSummary {
            kind: self.kind,
            title: self.kind.title().to_string(),
            succeeded: self.is_succeeded(),
            failure_reason: self.failure_reason().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every section succeeded
    Complete,
    /// At least one section is a failure placeholder
    Partial,
    /// No section succeeded
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub query: String,
    /// Always in `SectionKind` order
    pub sections: Vec<ReportSection>,
    pub status: ReportStatus,
    pub sources: Vec<SearchResult>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn failed_sections(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter().filter(|s| !s.is_succeeded())
    }

    pub(crate) fn status_for(sections: &[ReportSection]) -> ReportStatus {
        let ok = sections.iter().filter(|s| s.is_succeeded()).count();
        if ok == sections.len() {
            ReportStatus::Complete
        } else if ok == 0 {
            ReportStatus::Failed
        } else {
            ReportStatus::Partial
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Research error: {0}")]
    Research(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::LLM(_) | AppError::Search(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Configuration(_) | AppError::Research(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
