//! Perceive → Reason → Act → Learn sequencer.
//!
//! Each stage is a plain function call that reads its upstream artifact from
//! the project directory and replaces its own artifact only after it has
//! fully succeeded. Stages can be run one at a time (re-running one with the
//! same upstream artifact gives the same output) or back to back via
//! [`Pipeline::run`]. The rule-engine call inside Reason is the only process
//! boundary.
//!
//! Concurrent runs against the same project directory are not coordinated;
//! callers serialise stage invocations.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::facts;
use crate::history;
use crate::metrics::{self, WeeklyMetrics};
use crate::paths::ProjectPaths;
use crate::predict::{self, AdherenceReport};
use crate::reason::invoke::Invoker;
use crate::reason::parse::MinutesPolicy;
use crate::reason::{self, Reasoner, ReasonReport};
use crate::schedule::{self, ScheduleSlot};

/// Result of a Perceive run.
#[derive(Debug, Clone, PartialEq)]
pub struct PerceiveReport {
    pub facts: usize,
    pub path: PathBuf,
}

/// Result of a full Perceive → Reason → Act → Learn pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub perceive: PerceiveReport,
    pub reason: ReasonReport,
    pub schedule: Vec<ScheduleSlot>,
    pub metrics: WeeklyMetrics,
    pub elapsed: Duration,
}

/// Stage runner bound to one project directory and one loaded config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    paths: ProjectPaths,
    config: PlannerConfig,
}

impl Pipeline {
    pub fn new(paths: ProjectPaths, config: PlannerConfig) -> Self {
        Self { paths, config }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The SWI-Prolog reasoner described by the config, run from the project root.
    pub fn default_reasoner(&self) -> PlannerResult<Invoker> {
        Ok(Invoker::from_config(&self.config)?.with_working_dir(&self.paths.root))
    }

    /// Perceive: history + config → fact file.
    pub fn perceive(&self) -> PlannerResult<PerceiveReport> {
        let events = history::load_events(&self.paths.events_csv())?;
        let deadlines = history::load_deadlines(&self.paths.deadlines_csv())?;
        let fact_set = facts::derive(&events, &deadlines, &self.config)?;

        let path = self.paths.facts_file();
        fact_set.write(&path)?;
        tracing::info!(facts = fact_set.len(), path = %path.display(), "perceive: wrote fact file");
        Ok(PerceiveReport {
            facts: fact_set.len(),
            path,
        })
    }

    /// Reason: fact file + rule file → decision artifact.
    pub fn reason(&self, reasoner: &dyn Reasoner) -> PlannerResult<ReasonReport> {
        let report = reason::reason(
            reasoner,
            &self.paths.facts_file(),
            &self.config.rules_path_in(&self.paths.root),
            MinutesPolicy::from_strict(self.config.strict_minutes),
        )?;
        let path = self.paths.plan_json();
        reason::save_plan(&path, &report.decisions)?;
        tracing::info!(path = %path.display(), "reason: wrote decisions");
        Ok(report)
    }

    /// Act: decision artifact → today's schedule.
    pub fn act(&self) -> PlannerResult<Vec<ScheduleSlot>> {
        let decisions = reason::load_plan(&self.paths.plan_json())?;
        let today = chrono::Local::now().date_naive();
        let slots = schedule::build_schedule(&decisions, &self.config, today)?;

        let path = self.paths.schedule_csv();
        schedule::write_schedule(&path, &slots)?;
        tracing::info!(slots = slots.len(), path = %path.display(), "act: wrote schedule");
        Ok(slots)
    }

    /// Learn: event log → weekly metrics.
    pub fn learn(&self) -> PlannerResult<WeeklyMetrics> {
        let events = history::load_events(&self.paths.events_csv())?;
        let weekly = metrics::aggregate(&events, self.config.window_days);

        let path = self.paths.metrics_json();
        metrics::write_metrics(&path, &weekly)?;
        tracing::info!(
            completion_pct = weekly.completion_pct,
            adherence = weekly.adherence,
            "learn: wrote weekly metrics"
        );
        Ok(weekly)
    }

    /// Baseline adherence report over the whole event log.
    pub fn predict(&self) -> PlannerResult<AdherenceReport> {
        let events = history::load_events(&self.paths.events_csv())?;
        let report = predict::baseline_report(&events)?;
        predict::write_report(&self.paths.adherence_json(), &report)?;
        tracing::info!(rows = report.rows, "predict: wrote adherence report");
        Ok(report)
    }

    /// All four stages in order; the first failure aborts the rest.
    pub fn run(&self, reasoner: &dyn Reasoner) -> PlannerResult<PipelineReport> {
        let started = Instant::now();
        let perceive = self.perceive()?;
        let reason = self.reason(reasoner)?;
        let schedule = self.act()?;
        let metrics = self.learn()?;
        let elapsed = started.elapsed();
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "pipeline finished");
        Ok(PipelineReport {
            perceive,
            reason,
            schedule,
            metrics,
            elapsed,
        })
    }
}
