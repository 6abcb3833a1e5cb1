//! Activity history: the event log and the deadline table.
//!
//! Both are flat CSV files with a header row. Columns are located by header
//! name, so extra columns are ignored and column order does not matter.
//! Fields are split on `,` and stripped of surrounding quotes; embedded commas
//! are not supported.

use std::collections::HashMap;
use std::fmt;
use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use miette::Diagnostic;
use thiserror::Error;

use crate::paths::ProjectPaths;

/// Errors from loading or writing history files.
#[derive(Debug, Error, Diagnostic)]
pub enum HistoryError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(planner::history::read),
        help("Create the file, or run `studyplan init` to seed sample data.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no \"{column}\" column")]
    #[diagnostic(
        code(planner::history::missing_column),
        help("The first line must be a header naming every required column.")
    )]
    MissingColumn { path: String, column: String },

    #[error("{path}:{line}: {message}")]
    #[diagnostic(
        code(planner::history::bad_row),
        help("Fix or remove the offending row; dates are YYYY-MM-DD, minutes are integers.")
    )]
    BadRow {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to write {path}")]
    #[diagnostic(
        code(planner::history::write),
        help("Ensure the data directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Canonical subject identifier: trimmed and lowercased.
pub fn canonical_subject(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Events dated within `window_days` of the latest event date (inclusive).
///
/// The window is anchored on the log itself, not on today's date, so a stale
/// log still yields its most recent week. An empty log yields an empty window.
pub fn trailing_window(events: &[Event], window_days: u32) -> Vec<&Event> {
    let Some(latest) = events.iter().map(|e| e.date).max() else {
        return Vec::new();
    };
    let cutoff = latest - chrono::Days::new(u64::from(window_days));
    events.iter().filter(|e| e.date >= cutoff).collect()
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One logged study session.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub date: NaiveDate,
    pub subject: String,
    pub estimated_minutes: u32,
    pub done_minutes: u32,
    pub reminder_count: u32,
    pub completed: bool,
}

/// Kind of deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadlineKind {
    Exam,
    Quiz,
    Task,
}

impl fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exam => write!(f, "exam"),
            Self::Quiz => write!(f, "quiz"),
            Self::Task => write!(f, "task"),
        }
    }
}

impl FromStr for DeadlineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exam" => Ok(Self::Exam),
            "quiz" => Ok(Self::Quiz),
            "task" => Ok(Self::Task),
            other => Err(format!("unknown deadline type \"{other}\" (expected exam, quiz or task)")),
        }
    }
}

/// An upcoming exam, quiz or task.
#[derive(Debug, Clone, PartialEq)]
pub struct Deadline {
    pub subject: String,
    pub kind: DeadlineKind,
    pub date: NaiveDate,
    pub weight: f64,
    /// 1 (easy) to 5 (hard).
    pub difficulty: u8,
}

// ---------------------------------------------------------------------------
// CSV reading
// ---------------------------------------------------------------------------

const EVENT_COLUMNS: [&str; 6] = ["date", "subject", "est_min", "done_min", "reminders", "completed"];
const DEADLINE_COLUMNS: [&str; 5] = ["subject", "type", "date", "weight", "difficulty"];

/// A parsed CSV table: header index plus data rows with their 1-based line numbers.
struct Table<'a> {
    path: String,
    columns: HashMap<String, usize>,
    rows: Vec<(usize, Vec<&'a str>)>,
}

impl<'a> Table<'a> {
    fn parse(content: &'a str, path: &str, required: &[&str]) -> HistoryResult<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let columns: HashMap<String, usize> = match lines.next() {
            Some((_, header)) => header
                .split(',')
                .enumerate()
                .map(|(i, h)| (h.trim().trim_matches('"').to_lowercase(), i))
                .collect(),
            None => HashMap::new(),
        };

        for column in required {
            if !columns.contains_key(*column) {
                return Err(HistoryError::MissingColumn {
                    path: path.to_string(),
                    column: (*column).to_string(),
                });
            }
        }

        let rows: Vec<_> = lines
            .map(|(n, l)| {
                let fields = l.split(',').map(|f| f.trim().trim_matches('"'));
                (n, fields.collect::<Vec<_>>())
            })
            .collect();

        Ok(Self {
            path: path.to_string(),
            columns,
            rows,
        })
    }

    fn field(&self, row: &[&'a str], line: usize, column: &str) -> HistoryResult<&'a str> {
        let idx = self.columns[column];
        row.get(idx).copied().ok_or_else(|| HistoryError::BadRow {
            path: self.path.clone(),
            line,
            message: format!("missing value for \"{column}\""),
        })
    }

    fn bad(&self, line: usize, message: String) -> HistoryError {
        HistoryError::BadRow {
            path: self.path.clone(),
            line,
            message,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_minutes(raw: &str) -> Option<u32> {
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u32))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Some(true),
        "0" | "0.0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Parse event rows from CSV text.
pub fn parse_events(content: &str, origin: &str) -> HistoryResult<Vec<Event>> {
    let table = Table::parse(content, origin, &EVENT_COLUMNS)?;
    let mut events = Vec::with_capacity(table.rows.len());

    for (line, row) in &table.rows {
        let line = *line;
        let date_raw = table.field(row, line, "date")?;
        let date = parse_date(date_raw)
            .ok_or_else(|| table.bad(line, format!("invalid date \"{date_raw}\"")))?;

        let subject = table.field(row, line, "subject")?;
        if subject.is_empty() {
            return Err(table.bad(line, "empty subject".into()));
        }

        let mut minutes = [0u32; 3];
        for (slot, column) in minutes.iter_mut().zip(["est_min", "done_min", "reminders"]) {
            let raw = table.field(row, line, column)?;
            *slot = parse_minutes(raw)
                .ok_or_else(|| table.bad(line, format!("invalid {column} \"{raw}\"")))?;
        }

        let completed_raw = table.field(row, line, "completed")?;
        let completed = parse_flag(completed_raw)
            .ok_or_else(|| table.bad(line, format!("invalid completed flag \"{completed_raw}\"")))?;

        events.push(Event {
            date,
            subject: subject.to_string(),
            estimated_minutes: minutes[0],
            done_minutes: minutes[1],
            reminder_count: minutes[2],
            completed,
        });
    }

    Ok(events)
}

/// Parse deadline rows from CSV text.
pub fn parse_deadlines(content: &str, origin: &str) -> HistoryResult<Vec<Deadline>> {
    let table = Table::parse(content, origin, &DEADLINE_COLUMNS)?;
    let mut deadlines = Vec::with_capacity(table.rows.len());

    for (line, row) in &table.rows {
        let line = *line;
        let subject = table.field(row, line, "subject")?;
        if subject.is_empty() {
            return Err(table.bad(line, "empty subject".into()));
        }

        let kind: DeadlineKind = table
            .field(row, line, "type")?
            .parse()
            .map_err(|m| table.bad(line, m))?;

        let date_raw = table.field(row, line, "date")?;
        let date = parse_date(date_raw)
            .ok_or_else(|| table.bad(line, format!("invalid date \"{date_raw}\"")))?;

        let weight_raw = table.field(row, line, "weight")?;
        let weight = weight_raw
            .parse::<f64>()
            .ok()
            .filter(|w| *w >= 0.0)
            .ok_or_else(|| table.bad(line, format!("weight must be a number >= 0, got \"{weight_raw}\"")))?;

        let difficulty_raw = table.field(row, line, "difficulty")?;
        let difficulty = difficulty_raw
            .parse::<f64>()
            .ok()
            .map(|d| d as i64)
            .filter(|d| (1..=5).contains(d))
            .ok_or_else(|| {
                table.bad(line, format!("difficulty must be 1-5, got \"{difficulty_raw}\""))
            })? as u8;

        deadlines.push(Deadline {
            subject: subject.to_string(),
            kind,
            date,
            weight,
            difficulty,
        });
    }

    Ok(deadlines)
}

fn read(path: &Path) -> HistoryResult<String> {
    std::fs::read_to_string(path).map_err(|e| HistoryError::Read {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the event log.
pub fn load_events(path: &Path) -> HistoryResult<Vec<Event>> {
    let events = parse_events(&read(path)?, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), rows = events.len(), "loaded events");
    Ok(events)
}

/// Load the deadline table.
pub fn load_deadlines(path: &Path) -> HistoryResult<Vec<Deadline>> {
    let deadlines = parse_deadlines(&read(path)?, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), rows = deadlines.len(), "loaded deadlines");
    Ok(deadlines)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn write_err(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::Write {
        path: path.display().to_string(),
        source,
    }
}

/// Append one deadline row, writing the header first if the file is new.
pub fn append_deadline(path: &Path, deadline: &Deadline) -> HistoryResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    let is_new = !path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| write_err(path, e))?;

    let mut row = String::new();
    if is_new {
        row.push_str(&DEADLINE_COLUMNS.join(","));
        row.push('\n');
    }
    row.push_str(&format!(
        "{},{},{},{:.1},{}\n",
        deadline.subject,
        deadline.kind,
        deadline.date.format("%Y-%m-%d"),
        deadline.weight,
        deadline.difficulty
    ));
    file.write_all(row.as_bytes()).map_err(|e| write_err(path, e))
}

const SAMPLE_EVENTS: &str = "date,subject,est_min,done_min,reminders,completed\n\
2025-10-13,Math,60,45,1,0\n\
2025-10-13,Physics,45,45,1,1\n\
2025-10-14,Math,60,60,2,1\n";

const SAMPLE_DEADLINES: &str = "subject,type,date,weight,difficulty\n\
Math,exam,2025-10-28,1.0,3\n\
Physics,quiz,2025-10-18,0.6,2\n";

/// Write sample `events.csv` and `deadlines.csv` where they do not exist yet.
///
/// Returns the files that were created; existing files are never touched.
pub fn seed_sample_data(paths: &ProjectPaths) -> HistoryResult<Vec<std::path::PathBuf>> {
    let mut written = Vec::new();
    for (path, content) in [
        (paths.events_csv(), SAMPLE_EVENTS),
        (paths.deadlines_csv(), SAMPLE_DEADLINES),
    ] {
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| write_err(&path, e))?;
        tracing::info!(path = %path.display(), "seeded sample data");
        written.push(path);
    }
    Ok(written)
}
