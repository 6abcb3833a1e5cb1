//! Perceive: derive the fact file the rule engine reasons over.
//!
//! Facts are Prolog clauses, one per line, each terminated by a period:
//!
//! ```text
//! deadline(math,exam,date(2025,10,28)).
//! difficulty(math,3).
//! exam_near_days(7).
//! hours_per_day(240).
//! progress(math,completion_pct,0.50).
//! subject(math).
//! ```
//!
//! The set is deduplicated and sorted, so identical inputs always produce a
//! byte-identical file. Each run replaces the previous file wholesale.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::artifact;
use crate::config::PlannerConfig;
use crate::error::{ArtifactResult, ConfigResult};
use crate::history::{self, Deadline, DeadlineKind, Event};

/// A single statement handed to the rule engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
    /// `hours_per_day(Minutes).`
    DailyCapacity(u32),
    /// `exam_near_days(Days).`
    NearDeadlineDays(u32),
    /// `subject(S).`
    Subject(String),
    /// `difficulty(S,Level).`
    Difficulty { subject: String, level: u8 },
    /// `deadline(S,Kind,date(Y,M,D)).`
    Deadline {
        subject: String,
        kind: DeadlineKind,
        date: NaiveDate,
    },
    /// `progress(S,completion_pct,Fraction).`
    Progress { subject: String, completion: f64 },
}

/// Render a subject as a Prolog atom, quoting it unless it is a plain atom.
fn atom(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyCapacity(minutes) => write!(f, "hours_per_day({minutes})."),
            Self::NearDeadlineDays(days) => write!(f, "exam_near_days({days})."),
            Self::Subject(s) => write!(f, "subject({}).", atom(s)),
            Self::Difficulty { subject, level } => {
                write!(f, "difficulty({},{level}).", atom(subject))
            }
            Self::Deadline {
                subject,
                kind,
                date,
            } => write!(
                f,
                "deadline({},{kind},date({},{},{})).",
                atom(subject),
                date.year(),
                date.month(),
                date.day()
            ),
            Self::Progress {
                subject,
                completion,
            } => write!(f, "progress({},completion_pct,{completion:.2}).", atom(subject)),
        }
    }
}

/// Deduplicated, lexicographically ordered fact lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    lines: BTreeSet<String>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fact. Returns `false` if an identical line was already present.
    pub fn insert(&mut self, fact: &Fact) -> bool {
        self.lines.insert(fact.to_string())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Fact lines in output order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// File contents: one fact per line, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Replace the fact file at `path`.
    pub fn write(&self, path: &Path) -> ArtifactResult<()> {
        artifact::write_atomic(path, self.render().as_bytes())
    }
}

/// Completion fraction per canonical subject over the trailing window.
///
/// Subjects with no events in the window are absent rather than reported as
/// zero: no data is not the same as no progress.
pub fn derive_progress(events: &[Event], window_days: u32) -> BTreeMap<String, f64> {
    let mut tally: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for event in history::trailing_window(events, window_days) {
        let entry = tally
            .entry(history::canonical_subject(&event.subject))
            .or_default();
        entry.0 += u32::from(event.completed);
        entry.1 += 1;
    }
    tally
        .into_iter()
        .map(|(subject, (done, total))| (subject, f64::from(done) / f64::from(total)))
        .collect()
}

/// Derive the complete fact set from history and configuration.
///
/// Fails only when a required config key is missing.
pub fn derive(
    events: &[Event],
    deadlines: &[Deadline],
    config: &PlannerConfig,
) -> ConfigResult<FactSet> {
    let mut facts = FactSet::new();
    facts.insert(&Fact::DailyCapacity(config.daily_capacity()?));
    facts.insert(&Fact::NearDeadlineDays(config.near_deadline()?));

    for row in deadlines {
        let subject = history::canonical_subject(&row.subject);
        facts.insert(&Fact::Subject(subject.clone()));
        facts.insert(&Fact::Difficulty {
            subject: subject.clone(),
            level: row.difficulty,
        });
        facts.insert(&Fact::Deadline {
            subject,
            kind: row.kind,
            date: row.date,
        });
    }

    let progress = derive_progress(events, config.window_days);
    for (subject, completion) in &progress {
        facts.insert(&Fact::Progress {
            subject: subject.clone(),
            completion: *completion,
        });
    }

    tracing::debug!(
        facts = facts.len(),
        deadlines = deadlines.len(),
        subjects_with_progress = progress.len(),
        "derived fact set"
    );
    Ok(facts)
}
