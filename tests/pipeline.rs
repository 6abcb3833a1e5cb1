//! End-to-end tests for the Perceive → Reason → Act → Learn pipeline.
//!
//! A canned reasoner stands in for the rule engine so the stages can be
//! exercised against a temporary project directory without SWI-Prolog.

use std::fs;
use std::path::Path;
use std::time::Duration;

use study_planner::config::PlannerConfig;
use study_planner::error::{ConfigError, PlannerError, PlannerResult};
use study_planner::history;
use study_planner::paths::ProjectPaths;
use study_planner::pipeline::Pipeline;
use study_planner::reason::invoke::{InvokeError, RawOutput};
use study_planner::reason::{self, Reasoner};

struct Canned(&'static str);

impl Reasoner for Canned {
    fn run(&self, facts: &Path, _rules: &Path) -> PlannerResult<RawOutput> {
        assert!(facts.is_file(), "reasoner must see the fact file");
        Ok(RawOutput {
            text: self.0.to_string(),
            elapsed: Duration::from_millis(7),
        })
    }
}

const PLAN: &str = "[[math,shortlist,120],[physics,shortlist,90],[english,needs_info,30]]";

fn seeded_project(dir: &Path) -> Pipeline {
    let paths = ProjectPaths::new(dir);
    paths.ensure_dirs().unwrap();
    history::seed_sample_data(&paths).unwrap();
    Pipeline::new(paths, PlannerConfig::default())
}

#[test]
fn full_run_writes_every_artifact() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    let report = pipeline.run(&Canned(PLAN)).unwrap();

    assert_eq!(report.perceive.facts, 10);
    assert_eq!(report.reason.decisions.len(), 3);
    assert_eq!(report.reason.latency, Duration::from_millis(7));

    assert_eq!(report.schedule.len(), 2);
    assert_eq!(report.schedule[0].csv_row(), "math,17:00,19:00,120");
    assert_eq!(report.schedule[1].csv_row(), "physics,19:05,20:35,90");

    assert_eq!(report.metrics.completion_pct, 66.7);
    assert_eq!(report.metrics.adherence, 0.91);

    let paths = pipeline.paths();
    for artifact in [
        paths.facts_file(),
        paths.plan_json(),
        paths.schedule_csv(),
        paths.metrics_json(),
    ] {
        assert!(artifact.is_file(), "missing {}", artifact.display());
    }

    let facts = fs::read_to_string(paths.facts_file()).unwrap();
    assert!(facts.contains("hours_per_day(240).\n"));
    assert!(facts.contains("exam_near_days(7).\n"));
    assert!(facts.contains("deadline(math,exam,date(2025,10,28)).\n"));
    assert!(facts.contains("progress(physics,completion_pct,1.00).\n"));

    let csv = fs::read_to_string(paths.schedule_csv()).unwrap();
    assert_eq!(
        csv,
        "subject,start,end,minutes\nmath,17:00,19:00,120\nphysics,19:05,20:35,90\n"
    );
}

#[test]
fn stages_can_run_one_at_a_time() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    pipeline.perceive().unwrap();
    let first_facts = fs::read(pipeline.paths().facts_file()).unwrap();
    pipeline.perceive().unwrap();
    assert_eq!(fs::read(pipeline.paths().facts_file()).unwrap(), first_facts);

    pipeline.reason(&Canned(PLAN)).unwrap();
    let first = pipeline.act().unwrap();
    let second = pipeline.act().unwrap();
    assert_eq!(first, second);
}

#[test]
fn failed_reason_keeps_previous_plan() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    pipeline.perceive().unwrap();
    pipeline.reason(&Canned(PLAN)).unwrap();
    let before = fs::read(pipeline.paths().plan_json()).unwrap();

    let err = pipeline.reason(&Canned("true.")).unwrap_err();
    assert!(matches!(err, PlannerError::Parse(_)));
    assert_eq!(fs::read(pipeline.paths().plan_json()).unwrap(), before);
}

#[test]
fn run_stops_at_first_failure() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    let err = pipeline.run(&Canned("")).unwrap_err();
    assert!(matches!(err, PlannerError::Parse(_)));
    assert!(!pipeline.paths().schedule_csv().exists());
    assert!(!pipeline.paths().metrics_json().exists());
}

#[test]
fn empty_plan_gives_empty_schedule() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    let report = pipeline.run(&Canned("[[]]")).unwrap();
    assert!(report.reason.decisions.is_empty());
    assert!(report.schedule.is_empty());
    assert_eq!(
        fs::read_to_string(pipeline.paths().schedule_csv()).unwrap(),
        "subject,start,end,minutes\n"
    );
}

#[test]
fn missing_rule_file_is_named() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());
    pipeline.perceive().unwrap();

    let reasoner = pipeline.default_reasoner().unwrap();
    let err = pipeline.reason(&reasoner).unwrap_err();
    match err {
        PlannerError::Invoke(InvokeError::MissingRules { path }) => {
            assert!(path.ends_with("planner_rules.pl"), "got {path}");
        }
        other => panic!("expected MissingRules, got {other:?}"),
    }
    assert!(!pipeline.paths().plan_json().exists());
}

#[test]
fn missing_capacity_fails_perceive() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path());
    paths.ensure_dirs().unwrap();
    history::seed_sample_data(&paths).unwrap();
    let config = PlannerConfig {
        daily_capacity_min: None,
        ..Default::default()
    };
    let pipeline = Pipeline::new(paths, config);

    let err = pipeline.perceive().unwrap_err();
    match err {
        PlannerError::Config(ConfigError::MissingKey { key }) => {
            assert_eq!(key, "daily_capacity_min");
        }
        other => panic!("expected MissingKey, got {other:?}"),
    }
    assert!(!pipeline.paths().facts_file().exists());
}

#[test]
fn act_without_plan_is_an_artifact_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());
    let err = pipeline.act().unwrap_err();
    assert!(matches!(err, PlannerError::Artifact(_)));
}

#[test]
fn learn_on_empty_log_reports_zeros() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path());
    paths.ensure_dirs().unwrap();
    fs::write(
        paths.events_csv(),
        "date,subject,est_min,done_min,reminders,completed\n",
    )
    .unwrap();
    let pipeline = Pipeline::new(paths, PlannerConfig::default());

    let weekly = pipeline.learn().unwrap();
    assert_eq!(weekly.completion_pct, 0.0);
    assert_eq!(weekly.adherence, 0.0);
    assert!(pipeline.paths().metrics_json().is_file());
}

#[test]
fn predict_writes_baseline_report() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());

    let report = pipeline.predict().unwrap();
    assert_eq!(report.mode, "baseline");
    assert_eq!(report.rows, 3);
    assert!(pipeline.paths().adherence_json().is_file());
}

#[test]
fn saved_plan_reloads_unchanged() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = seeded_project(dir.path());
    pipeline.perceive().unwrap();

    let report = pipeline.reason(&Canned(PLAN)).unwrap();
    let loaded = reason::load_plan(&pipeline.paths().plan_json()).unwrap();
    assert_eq!(loaded, report.decisions);
}

#[test]
fn config_round_trips_through_project_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = ProjectPaths::new(dir.path());
    let config = PlannerConfig {
        daily_capacity_min: Some(90),
        buffer_min: 10,
        ..Default::default()
    };
    config.save(&paths.config_file()).unwrap();
    let loaded = PlannerConfig::load(&paths.config_file()).unwrap();
    assert_eq!(loaded, config);
}
