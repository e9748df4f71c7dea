use super::{EventStatus, ProgressEvent, actions, components};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sequential pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    QueryAnalysis,
    WebSearch,
    Synthesis,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::QueryAnalysis,
        Stage::WebSearch,
        Stage::Synthesis,
        Stage::Report,
    ];

    /// Pipeline action label that marks this stage
    pub fn action(&self) -> &'static str {
        match self {
            Stage::QueryAnalysis => actions::ANALYZE_QUERY,
            Stage::WebSearch => actions::WEB_SEARCH,
            Stage::Synthesis => actions::SYNTHESIZE,
            Stage::Report => actions::GENERATE_REPORT,
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.action() == action)
    }

    /// Share of the overall progress bar once the stage completes
    fn weight(&self) -> u32 {
        match self {
            Stage::QueryAnalysis => 20,
            Stage::WebSearch => 30,
            Stage::Synthesis => 30,
            Stage::Report => 20,
        }
    }

    /// Partial credit while the stage is running. The report stage only
    /// counts on completion so the bar does not fill early.
    fn started_credit(&self) -> u32 {
        match self {
            Stage::QueryAnalysis => 8,
            Stage::WebSearch => 12,
            Stage::Synthesis => 12,
            Stage::Report => 0,
        }
    }
}

const RUNNING_CAP: u32 = 85;

fn stage_of(event: &ProgressEvent) -> Option<Stage> {
    if event.component != components::PIPELINE {
        return None;
    }
    Stage::from_action(&event.action)
}

/// Weighted overall completion percentage.
///
/// Held under 85% until `finished` so a UI never shows 100% before the
/// final report exists.
pub fn overall_percent(events: &[ProgressEvent], finished: bool) -> u8 {
    if finished {
        return 100;
    }

    let mut started = [false; 4];
    let mut done = [false; 4];
    for event in events {
        if let Some(stage) = stage_of(event) {
            let i = stage as usize;
            match event.status {
                EventStatus::Started => started[i] = true,
                EventStatus::Succeeded => done[i] = true,
                EventStatus::Failed => {}
            }
        }
    }

    let total: u32 = Stage::ALL
        .iter()
        .map(|stage| {
            let i = *stage as usize;
            if done[i] {
                stage.weight()
            } else if started[i] {
                stage.started_credit()
            } else {
                0
            }
        })
        .sum();

    total.min(RUNNING_CAP) as u8
}

/// Stage of the most recent pipeline event, if any
pub fn active_stage(events: &[ProgressEvent]) -> Option<Stage> {
    events.iter().rev().find_map(stage_of)
}

/// Latest state of one (component, action) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimelineEntry {
    pub component: String,
    pub action: String,
    pub status: EventStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Collapse events into one entry per (component, action), keeping the latest
/// status and the order in which each pair first appeared.
pub fn timeline(events: &[ProgressEvent]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::new();

    for event in events {
        let entry = TimelineEntry {
            component: event.component.clone(),
            action: event.action.clone(),
            status: event.status,
            message: event.message.clone(),
            timestamp: event.timestamp,
        };

        match entries
            .iter_mut()
            .find(|e| e.component == event.component && e.action == event.action)
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    entries
}
