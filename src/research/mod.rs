//! Research Pipeline
//!
//! One research run moves a query through four stages, each recorded in the
//! run's [`EventLog`](crate::progress::EventLog):
//!
//! 1. **Query Analysis** - the model writes a research brief; focus areas and
//!    refined search terms are parsed out of it
//! 2. **Web Search** - the [`WebSearch`](crate::search::WebSearch) provider
//!    returns ordered results
//! 3. **Synthesis** - the model turns the results into
//!    [`Findings`](crate::types::Findings) with citations
//! 4. **Report** - sections are drafted in parallel and assembled
//!
//! Stages 1-3 are sequential; an error in any of them is recorded as a failed
//! event and aborts the run with the original message.
//!
//! # Usage
//!
//! ```ignore
//! use deepdive::research::{ResearchCoordinator, RunContext};
//!
//! let coordinator = ResearchCoordinator::from_config(&config, &credentials)?;
//! let ctx = RunContext::new("What changed in solid-state batteries?", 1024);
//!
//! let outcome = coordinator.run(&ctx).await?;
//! println!("{}", outcome.document.markdown);
//! ```

/// Per-run state passed through every stage.
pub mod context;
/// Stage orchestration.
pub mod coordinator;
/// Brief and synthesis parsing.
pub mod findings;
/// Model-written progress summaries.
pub mod narrative;
/// Prompt templates for the sequential stages.
pub mod prompts;

pub use context::RunContext;
pub use coordinator::{ResearchCoordinator, RunOutcome};
pub use narrative::narrate;
