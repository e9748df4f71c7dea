//! In-memory registry of research runs started through the API.

use crate::research::{RunContext, RunOutcome};
use crate::types::{Result, RunState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Lifecycle of a run as seen by API clients
#[derive(Debug, Clone)]
pub enum RunPhase {
    Running,
    Completed(Arc<RunOutcome>),
    Failed(String),
}

#[derive(Debug)]
struct Slot {
    phase: RunPhase,
    finished_at: Option<DateTime<Utc>>,
    /// Position in finishing order, used for eviction
    finish_order: Option<u64>,
}

/// One registered run: its context plus its current phase
#[derive(Debug)]
pub struct RunHandle {
    pub ctx: RunContext,
    slot: RwLock<Slot>,
}

impl RunHandle {
    fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            slot: RwLock::new(Slot {
                phase: RunPhase::Running,
                finished_at: None,
                finish_order: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.ctx.id
    }

    pub fn phase(&self) -> RunPhase {
        self.slot.read().phase.clone()
    }

    pub fn state(&self) -> RunState {
        match self.slot.read().phase {
            RunPhase::Running => RunState::Running,
            RunPhase::Completed(_) => RunState::Completed,
            RunPhase::Failed(_) => RunState::Failed,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.slot.read().finished_at.is_some()
    }

    pub fn outcome(&self) -> Option<Arc<RunOutcome>> {
        match &self.slot.read().phase {
            RunPhase::Completed(outcome) => Some(Arc::clone(outcome)),
            _ => None,
        }
    }

    /// Wall-clock time so far, frozen once the run finishes
    pub fn duration_ms(&self) -> u64 {
        let end = self.slot.read().finished_at.unwrap_or_else(Utc::now);
        (end - self.ctx.started_at).num_milliseconds().max(0) as u64
    }

    fn finish(&self, phase: RunPhase, order: u64) {
        let mut slot = self.slot.write();
        slot.phase = phase;
        slot.finished_at = Some(Utc::now());
        slot.finish_order = Some(order);
    }
}

/// Runs keyed by id.
///
/// Running runs are never evicted. Once more than `max_retained` runs have
/// finished, the earliest finished ones are dropped.
#[derive(Debug)]
pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, Arc<RunHandle>>>,
    max_retained: usize,
    finished: AtomicU64,
}

impl RunRegistry {
    pub fn new(max_retained: usize) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            max_retained: max_retained.max(1),
            finished: AtomicU64::new(0),
        }
    }

    /// Register a new running run for `query`
    pub fn start(&self, query: impl Into<String>, event_capacity: usize) -> Arc<RunHandle> {
        let handle = Arc::new(RunHandle::new(RunContext::new(query, event_capacity)));
        self.runs.write().insert(handle.id(), Arc::clone(&handle));
        handle
    }

    /// Record the terminal result of a run
    pub fn finish(&self, id: Uuid, result: Result<RunOutcome>) {
        let Some(handle) = self.get(id) else {
            tracing::warn!(run_id = %id, "Finished run is no longer registered");
            return;
        };

        let phase = match result {
            Ok(outcome) => RunPhase::Completed(Arc::new(outcome)),
            Err(e) => {
                tracing::error!(run_id = %id, error = %e, "Research run failed");
                RunPhase::Failed(e.to_string())
            }
        };
        handle.finish(phase, self.finished.fetch_add(1, Ordering::SeqCst));
        self.evict();
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<RunHandle>> {
        self.runs.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.runs
            .read()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    fn evict(&self) {
        let mut runs = self.runs.write();

        let mut finished: Vec<(u64, Uuid)> = runs
            .values()
            .filter_map(|h| h.slot.read().finish_order.map(|order| (order, h.id())))
            .collect();
        if finished.len() <= self.max_retained {
            return;
        }

        finished.sort_unstable();
        let excess = finished.len() - self.max_retained;
        for (_, id) in finished.into_iter().take(excess) {
            runs.remove(&id);
            tracing::debug!(run_id = %id, "Evicted finished run");
        }
    }
}
