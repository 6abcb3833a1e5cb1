//! Project layout: where each stage reads its inputs and writes its artifact.
//!
//! Everything lives under one project root:
//!
//! ```text
//! <root>/planner.toml
//! <root>/data/events.csv          (input)
//! <root>/data/deadlines.csv       (input)
//! <root>/data/plan.json           (Reason output)
//! <root>/data/todays_plan.csv     (Act output)
//! <root>/engines/facts.pl         (Perceive output)
//! <root>/engines/planner_rules.pl (externally authored rule file)
//! <root>/report/weekly_metrics.json
//! <root>/report/adherence_report.json
//! ```

use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;
use crate::error::{ArtifactError, ArtifactResult};

/// Resolved paths for one project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Project root.
    pub root: PathBuf,
    /// `<root>/data/`
    pub data_dir: PathBuf,
    /// `<root>/engines/`
    pub engines_dir: PathBuf,
    /// `<root>/report/`
    pub report_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            engines_dir: root.join("engines"),
            report_dir: root.join("report"),
            root,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn events_csv(&self) -> PathBuf {
        self.data_dir.join("events.csv")
    }

    pub fn deadlines_csv(&self) -> PathBuf {
        self.data_dir.join("deadlines.csv")
    }

    pub fn facts_file(&self) -> PathBuf {
        self.engines_dir.join("facts.pl")
    }

    pub fn plan_json(&self) -> PathBuf {
        self.data_dir.join("plan.json")
    }

    pub fn schedule_csv(&self) -> PathBuf {
        self.data_dir.join("todays_plan.csv")
    }

    pub fn metrics_json(&self) -> PathBuf {
        self.report_dir.join("weekly_metrics.json")
    }

    pub fn adherence_json(&self) -> PathBuf {
        self.report_dir.join("adherence_report.json")
    }

    /// Create the data, engines and report directories. Idempotent.
    pub fn ensure_dirs(&self) -> ArtifactResult<()> {
        for dir in [&self.data_dir, &self.engines_dir, &self.report_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ArtifactError::Write {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let paths = ProjectPaths::new("/srv/plan");
        assert_eq!(paths.events_csv(), PathBuf::from("/srv/plan/data/events.csv"));
        assert_eq!(paths.facts_file(), PathBuf::from("/srv/plan/engines/facts.pl"));
        assert_eq!(
            paths.metrics_json(),
            PathBuf::from("/srv/plan/report/weekly_metrics.json")
        );
        assert_eq!(paths.config_file(), PathBuf::from("/srv/plan/planner.toml"));
        assert_eq!(
            paths.schedule_csv(),
            PathBuf::from("/srv/plan/data/todays_plan.csv")
        );
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ProjectPaths::new(tmp.path());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.data_dir.is_dir());
        assert!(paths.engines_dir.is_dir());
        assert!(paths.report_dir.is_dir());
    }
}
