mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::{ScriptedLLM, StaticSearch, sample_results, section_marker};
use deepdive::{
    AppState, ConfigManager, DeepdiveConfig, ResearchCoordinator,
    progress::{EventStatus, actions, components},
    report::ParallelSectionGenerator,
    types::{
        EventsResponse, HealthResponse, NarrativeResponse, ReportStatus, RunAccepted, RunState,
        RunStatusResponse, SectionKind,
    },
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============= Test Setup =============

fn create_test_server_with(llm: ScriptedLLM, search: StaticSearch) -> TestServer {
    let config_manager = Arc::new(ConfigManager::from_config(DeepdiveConfig::default()));

    let llm = Arc::new(llm);
    let generator = ParallelSectionGenerator::new(llm.clone(), 2);
    let coordinator = Arc::new(ResearchCoordinator::new(llm, Arc::new(search), generator));

    let state = AppState::new(config_manager, coordinator);
    TestServer::new(deepdive::api::routes::app(state)).expect("Failed to create test server")
}

fn create_test_server() -> TestServer {
    create_test_server_with(
        ScriptedLLM::for_pipeline(),
        StaticSearch::new(sample_results(3)),
    )
}

async fn start_run(server: &TestServer, query: &str) -> RunAccepted {
    let response = server
        .post("/api/research")
        .json(&json!({ "query": query }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    response.json()
}

/// Poll the status endpoint until the run leaves the running state
async fn wait_for_finish(server: &TestServer, run_id: Uuid) -> RunStatusResponse {
    for _ in 0..500 {
        let status: RunStatusResponse = server.get(&format!("/api/research/{}", run_id)).await.json();
        if status.state != RunState::Running {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Run {} did not finish", run_id);
}

// ============= Health Check Tests =============

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();

    let response = server.get("/api/health").await;
    response.assert_status_ok();

    let body: HealthResponse = response.json();
    assert_eq!(body.status, "ok");
    assert_eq!(body.active_runs, 0);
}

// ============= Run Lifecycle Tests =============

#[tokio::test]
async fn test_start_research_rejects_empty_query() {
    let server = create_test_server();

    let response = server
        .post("/api/research")
        .json(&json!({ "query": "   " }))
        .await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_run_completes_with_report() {
    let server = create_test_server();

    let accepted = start_run(&server, "AI agents in 2025").await;
    assert_eq!(
        accepted.status_url,
        format!("/api/research/{}", accepted.run_id)
    );

    let status = wait_for_finish(&server, accepted.run_id).await;
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.query, "AI agents in 2025");
    assert_eq!(status.progress_percent, 100);
    assert_eq!(status.report_status, Some(ReportStatus::Complete));
    assert_eq!(status.sources.len(), 3);
    assert!(status.error.is_none());

    let kinds: Vec<SectionKind> = status.sections.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, SectionKind::ALL.to_vec());
    assert!(status.sections.iter().all(|s| s.succeeded));

    let markdown = status.report_markdown.unwrap();
    assert!(markdown.starts_with("# Research Report: AI agents in 2025"));
    assert!(status.flow_diagram.starts_with("graph"));

    // One entry per (component, action), each in its final state
    let stages: Vec<(&str, EventStatus)> = status
        .timeline
        .iter()
        .filter(|entry| entry.component == components::PIPELINE)
        .map(|entry| (entry.action.as_str(), entry.status))
        .collect();
    assert_eq!(
        stages,
        vec![
            (actions::ANALYZE_QUERY, EventStatus::Succeeded),
            (actions::WEB_SEARCH, EventStatus::Succeeded),
            (actions::SYNTHESIZE, EventStatus::Succeeded),
            (actions::GENERATE_REPORT, EventStatus::Succeeded),
        ]
    );
    assert_eq!(
        status
            .timeline
            .iter()
            .filter(|entry| entry.component == components::SECTIONS)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_failed_run_reports_error() {
    let server = create_test_server_with(
        ScriptedLLM::for_pipeline(),
        StaticSearch::failing("HTTP 401 invalid key"),
    );

    let accepted = start_run(&server, "AI agents in 2025").await;
    let status = wait_for_finish(&server, accepted.run_id).await;

    assert_eq!(status.state, RunState::Failed);
    assert!(status.error.unwrap().contains("HTTP 401 invalid key"));
    assert!(status.report_markdown.is_none());
    assert!(status.progress_percent < 100);

    server
        .get(&format!("/api/research/{}/report", accepted.run_id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_partial_report_lists_failed_section() {
    let server = create_test_server_with(
        ScriptedLLM::for_pipeline()
            .prepend_fail(&section_marker(SectionKind::Conclusion), "safety filter"),
        StaticSearch::new(sample_results(3)),
    );

    let accepted = start_run(&server, "AI agents in 2025").await;
    let status = wait_for_finish(&server, accepted.run_id).await;

    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.report_status, Some(ReportStatus::Partial));

    let conclusion = status
        .sections
        .iter()
        .find(|s| s.kind == SectionKind::Conclusion)
        .unwrap();
    assert!(!conclusion.succeeded);
    assert!(conclusion
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("safety filter"));
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let server = create_test_server();
    let id = Uuid::new_v4();

    for suffix in ["", "/events", "/report", "/narrative", "/stream"] {
        server
            .get(&format!("/api/research/{}{}", id, suffix))
            .await
            .assert_status_not_found();
    }
}

// ============= Event Tests =============

#[tokio::test]
async fn test_events_incremental_polling() {
    let server = create_test_server();
    let accepted = start_run(&server, "AI agents in 2025").await;
    wait_for_finish(&server, accepted.run_id).await;

    let url = format!("/api/research/{}/events", accepted.run_id);
    let all: EventsResponse = server.get(&url).await.json();
    assert_eq!(all.run_id, accepted.run_id);
    assert_eq!(all.dropped, 0);
    assert!(!all.events.is_empty());
    assert_eq!(all.next_after, all.events.last().unwrap().seq);

    let tail: EventsResponse = server.get(&url).add_query_param("after", 5).await.json();
    assert_eq!(tail.events.len(), all.events.len() - 5);
    assert_eq!(tail.events[0].seq, 6);

    let none: EventsResponse = server
        .get(&url)
        .add_query_param("after", all.next_after)
        .await
        .json();
    assert!(none.events.is_empty());
    assert_eq!(none.next_after, all.next_after);
}

#[tokio::test]
async fn test_stream_replays_events_and_ends_with_done() {
    let server = create_test_server();
    let accepted = start_run(&server, "AI agents in 2025").await;
    wait_for_finish(&server, accepted.run_id).await;

    let response = server
        .get(&format!("/api/research/{}/stream", accepted.run_id))
        .await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("event: progress"));
    assert!(body.contains("\"action\":\"generate_report\""));
    assert!(body.trim_end().ends_with("data: completed"));
    assert!(body.contains("event: done"));
}

// ============= Report Tests =============

#[tokio::test]
async fn test_download_report_as_markdown() {
    let server = create_test_server();
    let accepted = start_run(&server, "AI agents in 2025").await;
    wait_for_finish(&server, accepted.run_id).await;

    let response = server
        .get(&format!("/api/research/{}/report", accepted.run_id))
        .await;
    response.assert_status_ok();

    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/markdown"));

    let disposition = response.header("content-disposition");
    assert!(disposition
        .to_str()
        .unwrap()
        .contains("research_report_AI_agents_in_2025.md"));

    let text = response.text();
    assert!(text.contains("## Executive Summary"));
    assert!(text.contains("*Report generated by deepdive*"));
}

#[tokio::test]
async fn test_narrative_endpoint() {
    let server = create_test_server();
    let accepted = start_run(&server, "AI agents in 2025").await;
    wait_for_finish(&server, accepted.run_id).await;

    let response = server
        .get(&format!("/api/research/{}/narrative", accepted.run_id))
        .await;
    response.assert_status_ok();

    let body: NarrativeResponse = response.json();
    assert_eq!(body.run_id, accepted.run_id);
    assert_eq!(
        body.narrative,
        "The run searched the web and drafted every section."
    );
}
