//! Task intake: turn a one-line request into a deadline row.
//!
//! Deterministic pattern matching, no model involved:
//!
//! ```text
//! "Add Physics quiz on 2025-10-17; need 2 hr"
//!   -> subject Physics, kind quiz, date 2025-10-17, 120 estimated minutes
//! ```
//!
//! Unknown subjects become "General", a missing kind is `task`, a missing
//! date is today, and a missing estimate is one hour.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::history::{Deadline, DeadlineKind};

static RE_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(math|physics|chemistry|english)\b").unwrap());

static RE_KIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(exam|quiz|task)\b").unwrap());

static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());

static RE_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:hrs?|hours?)\b").unwrap());

/// Difficulty given to deadlines added through intake.
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// A parsed study request.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub subject: String,
    pub kind: DeadlineKind,
    pub date: NaiveDate,
    pub estimated_minutes: u32,
}

impl TaskRequest {
    /// Deadline row with default weight and difficulty.
    ///
    /// The deadline table has no estimate column, so `estimated_minutes` is
    /// not part of the row.
    pub fn to_deadline(&self) -> Deadline {
        Deadline {
            subject: self.subject.clone(),
            kind: self.kind,
            date: self.date,
            weight: 1.0,
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl fmt::Display for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} (estimate {} min, informational only; not stored)",
            self.subject, self.kind, self.date, self.estimated_minutes
        )
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Parse a free-text request. `today` fills in a missing date.
pub fn parse_task(text: &str, today: NaiveDate) -> TaskRequest {
    let subject = RE_SUBJECT
        .captures(text)
        .map(|c| title_case(&c[1]))
        .unwrap_or_else(|| "General".into());

    let kind = RE_KIND
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(DeadlineKind::Task);

    let date = match RE_DATE.captures(text) {
        Some(c) => NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").unwrap_or_else(|_| {
            tracing::warn!(date = &c[1], "ignoring invalid date in task text");
            today
        }),
        None => today,
    };

    let estimated_minutes = RE_HOURS
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|h| h.saturating_mul(60))
        .unwrap_or(60);

    TaskRequest {
        subject,
        kind,
        date,
        estimated_minutes,
    }
}
