use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

/// Default number of events retained per run
pub const DEFAULT_CAPACITY: usize = 1024;

const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Started,
    Succeeded,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Started => "started",
            EventStatus::Succeeded => "succeeded",
            EventStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable entry in a run's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    /// Position in the log, starting at 1; never reused even after eviction
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub action: String,
    pub status: EventStatus,
    pub message: String,
    #[schema(value_type = Object)]
    pub meta: Map<String, Value>,
}

impl ProgressEvent {
    /// Look up a metadata value as a string
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

struct LogState {
    events: VecDeque<ProgressEvent>,
    next_seq: u64,
    dropped: u64,
}

struct Inner {
    run_id: Uuid,
    capacity: usize,
    state: Mutex<LogState>,
    tx: broadcast::Sender<ProgressEvent>,
}

/// Per-run, append-only event log.
///
/// Cloning is cheap and every clone appends to the same log, so section tasks
/// each hold their own handle. The log is a ring buffer: once `capacity` is
/// reached the oldest event is evicted and counted in [`EventLog::dropped`].
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<Inner>,
}

impl EventLog {
    pub fn new(run_id: Uuid) -> Self {
        Self::with_capacity(run_id, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(run_id: Uuid, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(SUBSCRIBER_BUFFER);

        Self {
            inner: Arc::new(Inner {
                run_id,
                capacity,
                state: Mutex::new(LogState {
                    events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                    next_seq: 1,
                    dropped: 0,
                }),
                tx,
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Append an event and return its sequence number.
    ///
    /// `meta` should be a JSON object; `null` records no metadata and any other
    /// value is stored under the `value` key.
    pub fn record(
        &self,
        component: &str,
        action: &str,
        status: EventStatus,
        message: impl Into<String>,
        meta: Value,
    ) -> u64 {
        let meta = match meta {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        let message = message.into();

        match status {
            EventStatus::Failed => tracing::warn!(
                run_id = %self.inner.run_id,
                component,
                action,
                status = %status,
                "{}",
                message
            ),
            _ => tracing::info!(
                run_id = %self.inner.run_id,
                component,
                action,
                status = %status,
                "{}",
                message
            ),
        }

        let mut state = self.inner.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;

        let event = ProgressEvent {
            seq,
            timestamp: Utc::now(),
            component: component.to_string(),
            action: action.to_string(),
            status,
            message,
            meta,
        };

        if state.events.len() == self.inner.capacity {
            state.events.pop_front();
            state.dropped += 1;
        }
        state.events.push_back(event.clone());

        // Sent under the lock so subscribers see log order; no receivers is fine
        let _ = self.inner.tx.send(event);

        seq
    }

    /// Non-destructive read of every retained event, in append order
    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.inner.state.lock().events.iter().cloned().collect()
    }

    /// Retained events with `seq > after`, for incremental polling
    pub fn events_after(&self, after: u64) -> Vec<ProgressEvent> {
        self.inner
            .state
            .lock()
            .events
            .iter()
            .filter(|e| e.seq > after)
            .cloned()
            .collect()
    }

    /// Sequence number of the most recent event (0 when empty)
    pub fn last_seq(&self) -> u64 {
        self.inner.state.lock().next_seq - 1
    }

    /// Number of events evicted because the log was full
    pub fn dropped(&self) -> u64 {
        self.inner.state.lock().dropped
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every event recorded after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.tx.subscribe()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("run_id", &self.inner.run_id)
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .finish()
    }
}
