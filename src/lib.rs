//! # deepdive - Research Report Server
//!
//! Turns a research question into a structured markdown report by chaining a
//! web-search API and a language model:
//!
//! ```text
//! query -> query analysis -> web search -> synthesis -> parallel sections -> report
//! ```
//!
//! Every stage appends to a per-run [`EventLog`](progress::EventLog), which the
//! HTTP API exposes for polling and streaming.
//!
//! ## Overview
//!
//! deepdive can be used in two ways:
//!
//! 1. **As a standalone server or CLI** - Run the `deepdive` binary
//! 2. **As a library** - Embed the pipeline in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use deepdive::{DeepdiveConfig, ResearchCoordinator, RunContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeepdiveConfig::load_or_default("deepdive.toml")?;
//!     let credentials = config.credentials()?;
//!
//!     let coordinator = ResearchCoordinator::from_config(&config, &credentials)?;
//!     let ctx = RunContext::new("latest advances in AI agents", 1024);
//!
//!     let outcome = coordinator.run(&ctx).await?;
//!     println!("{}", outcome.document.markdown);
//!
//!     for event in ctx.events.snapshot() {
//!         println!("{} {}/{} {}", event.seq, event.component, event.action, event.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers, routes and the run registry
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM client implementations
//! - [`progress`] - Event log, timeline and stage progress
//! - [`report`] - Parallel section generation and report assembly
//! - [`research`] - The research pipeline
//! - [`search`] - Web search providers
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers, routes and run registry.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Per-run progress events.
pub mod progress;
/// Report section generation and assembly.
pub mod report;
/// Research pipeline coordination.
pub mod research;
/// Web search providers.
pub mod search;
/// Core types (domain model, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use api::RunRegistry;
pub use llm::{LLMClient, Provider};
pub use progress::{EventLog, EventStatus, ProgressEvent};
pub use report::{Document, ParallelSectionGenerator, ReportAssembler};
pub use research::{ResearchCoordinator, RunContext, RunOutcome};
pub use search::{TavilyClient, WebSearch};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigManager, DeepdiveConfig};

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration
    pub config_manager: Arc<ConfigManager>,
    /// Pipeline used for new runs; replaced on reload
    pub coordinator: Arc<ArcSwap<ResearchCoordinator>>,
    /// Runs started through the API
    pub runs: Arc<RunRegistry>,
}

impl AppState {
    pub fn new(config_manager: Arc<ConfigManager>, coordinator: Arc<ResearchCoordinator>) -> Self {
        let max_retained = config_manager.config().server.max_retained_runs;
        Self {
            config_manager,
            coordinator: Arc::new(ArcSwap::new(coordinator)),
            runs: Arc::new(RunRegistry::new(max_retained)),
        }
    }

    /// The pipeline new runs start on
    pub fn coordinator(&self) -> Arc<ResearchCoordinator> {
        self.coordinator.load_full()
    }

    /// Re-read the config file and rebuild the pipeline from it.
    ///
    /// Runs already in progress keep the pipeline they started with. On any
    /// error the previous pipeline stays active.
    pub fn reload(&self) -> Result<()> {
        self.reload_with(|name| std::env::var(name).ok())
    }

    /// [`AppState::reload`] with credentials resolved through `lookup`
    pub fn reload_with<F>(&self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.config_manager.reload()?;
        let config = self.config_manager.config();
        let credentials = config.credentials_from(lookup)?;
        let coordinator = ResearchCoordinator::from_config(&config, &credentials)?;
        self.coordinator.store(Arc::new(coordinator));

        tracing::info!(
            model = %config.llm.model,
            workers = config.report.max_workers,
            "Research pipeline rebuilt"
        );
        Ok(())
    }
}
