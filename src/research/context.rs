use crate::progress::EventLog;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// State owned by one research run.
///
/// Created when a query is submitted and passed by reference through every
/// pipeline stage. Runs never share an event log.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub id: Uuid,
    pub query: String,
    pub events: EventLog,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(query: impl Into<String>, event_capacity: usize) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            query: query.into(),
            events: EventLog::with_capacity(id, event_capacity),
            started_at: Utc::now(),
        }
    }

    /// Milliseconds since the run started
    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }
}
