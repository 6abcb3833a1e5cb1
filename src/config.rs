//! Planner configuration, persisted as TOML.
//!
//! The config is loaded once at the CLI boundary and threaded by reference
//! into every stage; no component reads it from disk on its own. Two keys are
//! required (`daily_capacity_min`, `near_deadline_days`) and are validated
//! lazily by the accessors, so a stage that needs them reports the exact
//! missing key. Everything else has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default config file name at the project root.
pub const CONFIG_FILE_NAME: &str = "planner.toml";

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Daily study capacity in minutes. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_capacity_min: Option<u32>,
    /// A deadline this many days out counts as "near". Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near_deadline_days: Option<u32>,
    /// Explicit path to the rule-engine executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<PathBuf>,
    /// Rule file, relative to the project root unless absolute.
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
    /// Zero-argument goal the engine runs after loading both files.
    #[serde(default = "default_entry_goal")]
    pub entry_goal: String,
    /// Hard limit for one engine invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Trailing window length for progress and weekly metrics.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Transition time between two scheduled sessions.
    #[serde(default = "default_buffer_min")]
    pub buffer_min: u32,
    /// First session start, `HH:MM`.
    #[serde(default = "default_start_time")]
    pub start_time: String,
    /// Decision label that puts a subject on today's schedule.
    #[serde(default = "default_include_label")]
    pub include_label: String,
    /// Reject non-numeric minutes in engine output instead of reading them as 0.
    #[serde(default)]
    pub strict_minutes: bool,
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("engines/planner_rules.pl")
}
fn default_entry_goal() -> String {
    "main".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_window_days() -> u32 {
    7
}
fn default_buffer_min() -> u32 {
    5
}
fn default_start_time() -> String {
    "17:00".into()
}
fn default_include_label() -> String {
    "shortlist".into()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            daily_capacity_min: Some(240),
            near_deadline_days: Some(7),
            engine_path: None,
            rules_path: default_rules_path(),
            entry_goal: default_entry_goal(),
            timeout_secs: default_timeout_secs(),
            window_days: default_window_days(),
            buffer_min: default_buffer_min(),
            start_time: default_start_time(),
            include_label: default_include_label(),
            strict_minutes: false,
        }
    }
}

impl PlannerConfig {
    /// Parse a config from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_toml_str(&content, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), "loaded planner config");
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Daily capacity in minutes.
    pub fn daily_capacity(&self) -> ConfigResult<u32> {
        self.daily_capacity_min.ok_or_else(|| ConfigError::MissingKey {
            key: "daily_capacity_min".into(),
        })
    }

    /// "Near deadline" threshold in days.
    pub fn near_deadline(&self) -> ConfigResult<u32> {
        self.near_deadline_days.ok_or_else(|| ConfigError::MissingKey {
            key: "near_deadline_days".into(),
        })
    }

    /// Parsed schedule start time.
    pub fn start(&self) -> ConfigResult<NaiveTime> {
        NaiveTime::parse_from_str(self.start_time.trim(), "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                key: "start_time".into(),
                message: format!("expected HH:MM, got \"{}\" ({e})", self.start_time),
            }
        })
    }

    /// Engine timeout as a `Duration`. Zero is rejected.
    pub fn timeout(&self) -> ConfigResult<Duration> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }

    /// Rule file path resolved against the project root.
    pub fn rules_path_in(&self, root: &Path) -> PathBuf {
        if self.rules_path.is_absolute() {
            self.rules_path.clone()
        } else {
            root.join(&self.rules_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_keys() {
        let cfg = PlannerConfig::from_toml_str(
            "daily_capacity_min = 90\nnear_deadline_days = 5\n",
            "inline",
        )
        .unwrap();
        assert_eq!(cfg.daily_capacity().unwrap(), 90);
        assert_eq!(cfg.near_deadline().unwrap(), 5);
        assert_eq!(cfg.window_days, 7);
        assert_eq!(cfg.buffer_min, 5);
        assert_eq!(cfg.include_label, "shortlist");
        assert_eq!(cfg.entry_goal, "main");
        assert_eq!(cfg.start().unwrap(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(30));
        assert!(cfg.engine_path.is_none());
        assert!(!cfg.strict_minutes);
    }

    #[test]
    fn missing_required_key_is_named() {
        let cfg = PlannerConfig::from_toml_str("near_deadline_days = 5\n", "inline").unwrap();
        match cfg.daily_capacity() {
            Err(ConfigError::MissingKey { key }) => assert_eq!(key, "daily_capacity_min"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn bad_start_time_is_invalid() {
        let cfg = PlannerConfig {
            start_time: "5pm".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.start(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let cfg = PlannerConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.timeout(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn config_roundtrip_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        let cfg = PlannerConfig {
            daily_capacity_min: Some(150),
            engine_path: Some(PathBuf::from("/opt/swipl/bin/swipl")),
            ..Default::default()
        };
        cfg.save(&path).unwrap();

        let loaded = PlannerConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn relative_rules_path_resolves_against_root() {
        let cfg = PlannerConfig::default();
        let root = Path::new("/srv/plan");
        assert_eq!(
            cfg.rules_path_in(root),
            PathBuf::from("/srv/plan/engines/planner_rules.pl")
        );
    }
}
