//! Run Progress Tracking
//!
//! Every research run owns one [`EventLog`]: an ordered, append-only list of
//! [`ProgressEvent`]s describing each state transition of the pipeline stages
//! and of the concurrent section tasks.
//!
//! # Ordering
//!
//! Appends are serialized, so the log order is the real order in which events
//! were recorded. Events from concurrent section tasks interleave by completion
//! time; there is no logical clock.
//!
//! # Consumers
//!
//! - Pollers read with [`EventLog::snapshot`] or [`EventLog::events_after`]
//! - Push consumers call [`EventLog::subscribe`]
//! - [`timeline`] and [`overall_percent`] derive the views a UI renders

/// Bounded, concurrency-safe event log.
pub mod log;
/// Timeline and weighted stage progress derived from events.
pub mod timeline;

pub use log::{DEFAULT_CAPACITY, EventLog, EventStatus, ProgressEvent};
pub use timeline::{Stage, TimelineEntry, active_stage, overall_percent, timeline};

/// Component names used in progress events.
pub mod components {
    /// The sequential research pipeline (one event pair per stage)
    pub const PIPELINE: &str = "pipeline";
    /// The language-model provider
    pub const LLM: &str = "llm";
    /// The web search provider
    pub const SEARCH: &str = "search";
    /// The parallel section generator
    pub const SECTIONS: &str = "sections";
}

/// Action labels used in progress events.
pub mod actions {
    pub const ANALYZE_QUERY: &str = "analyze_query";
    pub const WEB_SEARCH: &str = "web_search";
    pub const SYNTHESIZE: &str = "synthesize";
    pub const GENERATE_REPORT: &str = "generate_report";
    pub const GENERATE_SECTION: &str = "generate_section";
    pub const INVOKE: &str = "invoke";
    pub const QUERY: &str = "query";
}
