//! HTTP API
//!
//! The REST surface for starting research runs and following their progress,
//! built on axum.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::registry`](crate::api::registry) - In-memory registry of runs
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research` - Start a run; returns `202` with the run id
//! - `GET /api/research/{id}` - Run status, progress, flow diagram, report when done
//! - `GET /api/research/{id}/events?after=N` - Progress events with `seq > N`
//! - `GET /api/research/{id}/stream` - Progress events as server-sent events
//! - `GET /api/research/{id}/report` - Markdown report download
//! - `GET /api/research/{id}/narrative` - Model-written progress summary
//!
//! ## Health (`/api/health`)
//! - `GET /api/health` - Health check endpoint
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Registry of background research runs.
pub mod registry;
/// Router configuration and route definitions.
pub mod routes;

pub use registry::{RunHandle, RunPhase, RunRegistry};

use crate::progress::{EventStatus, ProgressEvent, TimelineEntry};
use crate::types::{
    EventsResponse, HealthResponse, NarrativeResponse, ReportStatus, ResearchRequest, RunAccepted,
    RunState, RunStatusResponse, SearchResult, SectionKind, SectionSummary,
};
use utoipa::OpenApi;

/// OpenAPI description of the HTTP surface
#[derive(OpenApi)]
#[openapi(
    info(title = "deepdive", description = "Research report server"),
    paths(
        handlers::health::health,
        handlers::research::start_research,
        handlers::research::get_run,
        handlers::research::get_events,
        handlers::research::stream_events,
        handlers::research::download_report,
        handlers::research::get_narrative,
    ),
    components(schemas(
        ResearchRequest,
        RunAccepted,
        RunState,
        RunStatusResponse,
        SectionSummary,
        SectionKind,
        ReportStatus,
        SearchResult,
        EventsResponse,
        ProgressEvent,
        EventStatus,
        TimelineEntry,
        NarrativeResponse,
        HealthResponse,
    )),
    tags(
        (name = "research", description = "Research runs and their progress"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
