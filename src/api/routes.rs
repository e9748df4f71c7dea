use crate::AppState;
use crate::api::handlers::{health, research};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Routes served under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/research", post(research::start_research))
        .route("/research/{id}", get(research::get_run))
        .route("/research/{id}/events", get(research::get_events))
        .route("/research/{id}/stream", get(research::stream_events))
        .route("/research/{id}/report", get(research::download_report))
        .route("/research/{id}/narrative", get(research::get_narrative))
}

/// The complete application: API routes, request tracing and CORS
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new().nest("/api", create_router());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", super::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
