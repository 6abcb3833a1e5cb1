// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # study-planner
//!
//! A personal study planner organised as a four-stage agent loop.
//!
//! ## Architecture
//!
//! - **Perceive** (`facts`): event and deadline history → a sorted Prolog fact file
//! - **Reason** (`reason`): run the external rule engine over rules + facts and
//!   parse its output into typed decisions
//! - **Act** (`schedule`): greedy, capacity-bounded time-boxing of today's decisions
//! - **Learn** (`metrics`): trailing-window completion and adherence
//!
//! `pipeline` sequences the stages over a project directory laid out by
//! `paths`; `config` is loaded once by the caller and passed down.
//!
//! ## Library usage
//!
//! ```no_run
//! use study_planner::config::PlannerConfig;
//! use study_planner::paths::ProjectPaths;
//! use study_planner::pipeline::Pipeline;
//!
//! let paths = ProjectPaths::new("/home/me/study");
//! let config = PlannerConfig::load(&paths.config_file()).unwrap();
//! let pipeline = Pipeline::new(paths, config);
//! let reasoner = pipeline.default_reasoner().unwrap();
//! let report = pipeline.run(&reasoner).unwrap();
//! for slot in &report.schedule {
//!     println!("{}", slot.csv_row());
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod facts;
pub mod history;
pub mod intake;
pub mod metrics;
pub mod paths;
pub mod pipeline;
pub mod predict;
pub mod reason;
pub mod schedule;
