//! Learn: weekly adherence metrics over the trailing window.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact;
use crate::error::ArtifactResult;
use crate::history::{self, Event};

/// Completion and effort adherence for the trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMetrics {
    /// Share of sessions marked completed, 0–100, one decimal.
    pub completion_pct: f64,
    /// Minutes done over minutes estimated, two decimals.
    pub adherence: f64,
}

/// Round to `decimals` places with ties resolved on the exact binary value,
/// half to even, the same way the fact file renders its numbers.
pub(crate) fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Aggregate the trailing `window_days` of events.
///
/// An empty window is a valid "no data yet" state and yields all zeros.
pub fn aggregate(events: &[Event], window_days: u32) -> WeeklyMetrics {
    let window = history::trailing_window(events, window_days);
    if window.is_empty() {
        return WeeklyMetrics::default();
    }

    let completed = window.iter().filter(|e| e.completed).count() as f64;
    let done: u64 = window.iter().map(|e| u64::from(e.done_minutes)).sum();
    let estimated: u64 = window.iter().map(|e| u64::from(e.estimated_minutes)).sum();

    let metrics = WeeklyMetrics {
        completion_pct: round_to(100.0 * completed / window.len() as f64, 1),
        adherence: round_to(done as f64 / estimated.max(1) as f64, 2),
    };
    tracing::debug!(
        events = window.len(),
        completion_pct = metrics.completion_pct,
        adherence = metrics.adherence,
        "weekly metrics aggregated"
    );
    metrics
}

/// Replace the metrics artifact.
pub fn write_metrics(path: &Path, metrics: &WeeklyMetrics) -> ArtifactResult<()> {
    artifact::write_json(path, metrics)
}
