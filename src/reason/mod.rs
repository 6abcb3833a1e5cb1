//! Reason: ask the rule engine which subjects to study today.
//!
//! The engine sits behind the [`Reasoner`] trait: write facts, run, get raw
//! text back. [`invoke::Invoker`] is the SWI-Prolog subprocess
//! implementation; anything else that honours the same contract (an
//! in-process evaluator, a remote service, a test double) can replace it
//! without touching fact derivation or scheduling.

pub mod invoke;
pub mod parse;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artifact;
use crate::error::{ArtifactResult, PlannerResult};

use self::invoke::{Invoker, RawOutput};
use self::parse::MinutesPolicy;

/// The engine's verdict for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Canonical (trimmed, lowercased) subject.
    pub subject: String,
    /// Engine-defined label, e.g. `shortlist` or `needs_info`.
    pub decision: String,
    /// Requested study time.
    pub minutes: u32,
}

/// Something that turns a fact file plus a rule file into raw plan text.
pub trait Reasoner {
    fn run(&self, facts: &Path, rules: &Path) -> PlannerResult<RawOutput>;
}

impl Reasoner for Invoker {
    fn run(&self, facts: &Path, rules: &Path) -> PlannerResult<RawOutput> {
        Ok(self.invoke(facts, rules)?)
    }
}

/// Outcome of one Reason run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonReport {
    pub decisions: Vec<Decision>,
    /// Time spent inside the reasoner.
    pub latency: Duration,
}

/// Run the reasoner and parse its output into decisions.
pub fn reason(
    reasoner: &dyn Reasoner,
    facts: &Path,
    rules: &Path,
    policy: MinutesPolicy,
) -> PlannerResult<ReasonReport> {
    let output = reasoner.run(facts, rules)?;
    let decisions = parse::parse_plan_with(&output.text, policy)?;
    tracing::info!(
        decisions = decisions.len(),
        latency_ms = output.elapsed.as_millis() as u64,
        "reason: plan parsed"
    );
    Ok(ReasonReport {
        decisions,
        latency: output.elapsed,
    })
}

/// Replace the decision artifact.
pub fn save_plan(path: &Path, decisions: &[Decision]) -> ArtifactResult<()> {
    artifact::write_json(path, decisions)
}

/// Load the decision artifact written by the last successful Reason run.
pub fn load_plan(path: &Path) -> ArtifactResult<Vec<Decision>> {
    artifact::read_json(path)
}
