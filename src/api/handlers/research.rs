use crate::{
    AppState,
    api::registry::{RunHandle, RunPhase},
    progress::{ProgressEvent, active_stage, overall_percent, timeline},
    report::diagram,
    research::narrate,
    types::{
        AppError, EventsResponse, NarrativeResponse, ResearchRequest, Result, RunAccepted,
        RunState, RunStatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use utoipa::IntoParams;
use uuid::Uuid;

/// How often an idle event stream checks whether its run has finished
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn lookup(state: &AppState, id: Uuid) -> Result<Arc<RunHandle>> {
    state
        .runs
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Run {} not found", id)))
}

/// Start a research run in the background
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = ResearchRequest,
    responses(
        (status = 202, description = "Run accepted", body = RunAccepted),
        (status = 400, description = "Invalid input")
    ),
    tag = "research"
)]
pub async fn start_research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<(StatusCode, Json<RunAccepted>)> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Query must not be empty".to_string()));
    }

    let capacity = state.config_manager.config().report.event_log_capacity;
    let handle = state.runs.start(query, capacity);
    let run_id = handle.id();

    let coordinator = state.coordinator();
    let runs = Arc::clone(&state.runs);
    tokio::spawn(async move {
        let result = coordinator.run(&handle.ctx).await;
        runs.finish(handle.id(), result);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id,
            status_url: format!("/api/research/{}", run_id),
            events_url: format!("/api/research/{}/events", run_id),
        }),
    ))
}

/// Current status of a run, including the report once it is ready
#[utoipa::path(
    get,
    path = "/api/research/{id}",
    responses(
        (status = 200, description = "Run status", body = RunStatusResponse),
        (status = 404, description = "Run not found")
    ),
    params(("id" = Uuid, Path, description = "Run identifier")),
    tag = "research"
)]
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunStatusResponse>> {
    let handle = lookup(&state, id)?;
    let phase = handle.phase();
    let events = handle.ctx.events.snapshot();

    let completed = matches!(phase, RunPhase::Completed(_));
    let active = if completed {
        None
    } else {
        active_stage(&events)
    };

    let mut response = RunStatusResponse {
        run_id: id,
        query: handle.ctx.query.clone(),
        state: handle.state(),
        progress_percent: overall_percent(&events, completed),
        error: None,
        report_status: None,
        sections: Vec::new(),
        sources: Vec::new(),
        report_markdown: None,
        flow_diagram: diagram::pipeline_flow(active),
        timeline: timeline(&events),
        started_at: handle.ctx.started_at,
        duration_ms: handle.duration_ms(),
    };

    match phase {
        RunPhase::Running => {}
        RunPhase::Failed(error) => response.error = Some(error),
        RunPhase::Completed(outcome) => {
            response.report_status = Some(outcome.report.status);
            response.sections = outcome.report.sections.iter().map(|s| s.summary()).collect();
            response.sources = outcome.search_results.clone();
            response.report_markdown = Some(outcome.document.markdown.clone());
        }
    }

    Ok(Json(response))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Only return events with a sequence number greater than this
    #[serde(default)]
    pub after: u64,
}

/// Poll a run's progress events
#[utoipa::path(
    get,
    path = "/api/research/{id}/events",
    responses(
        (status = 200, description = "Progress events", body = EventsResponse),
        (status = 404, description = "Run not found")
    ),
    params(("id" = Uuid, Path, description = "Run identifier"), EventsQuery),
    tag = "research"
)]
pub async fn get_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>> {
    let handle = lookup(&state, id)?;
    let log = &handle.ctx.events;

    let events = log.events_after(params.after);
    let next_after = events.last().map(|e| e.seq).unwrap_or(params.after);

    Ok(Json(EventsResponse {
        run_id: id,
        dropped: log.dropped(),
        next_after,
        events,
    }))
}

fn sse_event(event: &ProgressEvent) -> std::result::Result<Event, Infallible> {
    let sse = Event::default()
        .id(event.seq.to_string())
        .event("progress")
        .json_data(event);
    Ok(sse.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
}

/// Stream a run's progress events as server-sent events.
///
/// Replays retained events first, then follows the live log. A final `done`
/// event carries the run state.
#[utoipa::path(
    get,
    path = "/api/research/{id}/stream",
    responses(
        (status = 200, description = "Server-sent progress events"),
        (status = 404, description = "Run not found")
    ),
    params(("id" = Uuid, Path, description = "Run identifier")),
    tag = "research"
)]
pub async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let handle = lookup(&state, id)?;

    // Subscribe before the snapshot so nothing falls between them
    let mut rx = handle.ctx.events.subscribe();
    let backlog = handle.ctx.events.snapshot();

    let stream = async_stream::stream! {
        let mut last = 0u64;
        for event in backlog {
            last = event.seq;
            yield sse_event(&event);
        }

        while !handle.is_finished() {
            match tokio::time::timeout(STREAM_POLL_INTERVAL, rx.recv()).await {
                Ok(Ok(event)) => {
                    if event.seq > last {
                        last = event.seq;
                        yield sse_event(&event);
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!(run_id = %id, skipped, "Event stream lagged, catching up from log");
                    for event in handle.ctx.events.events_after(last) {
                        last = event.seq;
                        yield sse_event(&event);
                    }
                }
                Ok(Err(RecvError::Closed)) => break,
                Err(_) => {}
            }
        }

        for event in handle.ctx.events.events_after(last) {
            yield sse_event(&event);
        }

        let final_state = match handle.state() {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        yield Ok::<_, Infallible>(Event::default().event("done").data(final_state));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Download the finished report as markdown
#[utoipa::path(
    get,
    path = "/api/research/{id}/report",
    responses(
        (status = 200, description = "Markdown report", body = String, content_type = "text/markdown"),
        (status = 404, description = "Run not found or report not ready")
    ),
    params(("id" = Uuid, Path, description = "Run identifier")),
    tag = "research"
)]
pub async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let handle = lookup(&state, id)?;
    let outcome = handle
        .outcome()
        .ok_or_else(|| AppError::NotFound(format!("Report for run {} is not available", id)))?;

    let document = &outcome.document;
    let headers = [
        (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name()),
        ),
    ];

    Ok((headers, document.markdown.clone()))
}

/// Plain-language summary of a run's progress so far
#[utoipa::path(
    get,
    path = "/api/research/{id}/narrative",
    responses(
        (status = 200, description = "Progress narrative", body = NarrativeResponse),
        (status = 404, description = "Run not found"),
        (status = 502, description = "Model call failed")
    ),
    params(("id" = Uuid, Path, description = "Run identifier")),
    tag = "research"
)]
pub async fn get_narrative(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NarrativeResponse>> {
    let handle = lookup(&state, id)?;
    let events = handle.ctx.events.snapshot();

    let coordinator = state.coordinator();
    let llm = coordinator.llm();
    let narrative =
        narrate(llm.as_ref(), &handle.ctx.query, &events, coordinator.llm_timeout()).await?;

    Ok(Json(NarrativeResponse {
        run_id: id,
        narrative,
    }))
}
