//! Adherence baseline: a rule-of-thumb completion likelihood per session.
//!
//! Each logged session gets a likelihood from its effort ratio
//! (`done / estimated`) and reminder count:
//!
//! | condition            | likelihood |
//! |----------------------|-----------:|
//! | effort ratio ≥ 0.9   | 0.85       |
//! | reminders ≥ 2        | 0.60       |
//! | otherwise            | 0.35       |
//!
//! The report aggregates predicted and actual completion per subject and
//! scores the baseline against the labels it has seen. It is a reference
//! point for trained predictors, which live outside this crate.

use std::collections::BTreeMap;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact;
use crate::error::ArtifactResult;
use crate::history::{self, Event};

/// Fewest events the baseline report is computed from.
pub const MIN_ROWS: usize = 3;

#[derive(Debug, Error, Diagnostic)]
pub enum PredictError {
    #[error("need at least {needed} rows, found {found}")]
    #[diagnostic(
        code(planner::predict::insufficient_data),
        help("Log more study sessions in data/events.csv before running the predictor.")
    )]
    InsufficientData { needed: usize, found: usize },
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;

/// Baseline completion likelihood for one session.
pub fn baseline_likelihood(event: &Event) -> f64 {
    let effort_ratio = if event.estimated_minutes > 0 {
        f64::from(event.done_minutes) / f64::from(event.estimated_minutes)
    } else {
        0.0
    };
    if effort_ratio >= 0.9 {
        0.85
    } else if event.reminder_count >= 2 {
        0.60
    } else {
        0.35
    }
}

/// Per-subject predicted vs. actual completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAdherence {
    pub subject: String,
    pub predicted_mean: f64,
    pub actual_completion_rate: f64,
    pub n: usize,
}

/// Baseline adherence report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceReport {
    pub mode: String,
    pub rows: usize,
    pub overall_positive_rate: f64,
    /// Share of sessions where `likelihood >= 0.5` matches `completed`.
    pub baseline_accuracy: f64,
    pub per_subject: Vec<SubjectAdherence>,
}

/// Score every event with the baseline and aggregate per subject.
pub fn baseline_report(events: &[Event]) -> PredictResult<AdherenceReport> {
    if events.len() < MIN_ROWS {
        return Err(PredictError::InsufficientData {
            needed: MIN_ROWS,
            found: events.len(),
        });
    }

    let mut hits = 0usize;
    let mut positives = 0usize;
    // subject -> (sum of likelihoods, completed count, n)
    let mut groups: BTreeMap<String, (f64, usize, usize)> = BTreeMap::new();

    for event in events {
        let p = baseline_likelihood(event);
        if (p >= 0.5) == event.completed {
            hits += 1;
        }
        positives += usize::from(event.completed);

        let entry = groups
            .entry(history::canonical_subject(&event.subject))
            .or_insert((0.0, 0, 0));
        entry.0 += p;
        entry.1 += usize::from(event.completed);
        entry.2 += 1;
    }

    let n = events.len() as f64;
    let per_subject = groups
        .into_iter()
        .map(|(subject, (p_sum, done, count))| SubjectAdherence {
            subject,
            predicted_mean: p_sum / count as f64,
            actual_completion_rate: done as f64 / count as f64,
            n: count,
        })
        .collect();

    Ok(AdherenceReport {
        mode: "baseline".into(),
        rows: events.len(),
        overall_positive_rate: positives as f64 / n,
        baseline_accuracy: hits as f64 / n,
        per_subject,
    })
}

/// Replace the adherence report artifact.
pub fn write_report(path: &Path, report: &AdherenceReport) -> ArtifactResult<()> {
    artifact::write_json(path, report)
}
