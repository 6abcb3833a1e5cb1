//! Plan parsing: engine stdout → typed decision list.
//!
//! Two grammars are accepted, tried in order:
//!
//! 1. **Structured** (text starting with `{` or `[{`): JSON, either
//!    `{"plan": [...]}` or a bare list of `{subject, decision, minutes}`
//!    objects. Anything malformed here falls through to grammar 2.
//! 2. **Bracketed list**: `[[math,shortlist,120],[physics,needs_info,60]]`,
//!    the default `writeln/1` rendering of a Prolog list of lists.
//!
//! Parsing is pure; no I/O happens here.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use super::Decision;
use crate::history::canonical_subject;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected rule engine output format:\n{raw}")]
    #[diagnostic(
        code(planner::parse::unrecognized),
        help("Expected something like: [[math,shortlist,120],[physics,needs_info,60]]")
    )]
    Unrecognized { raw: String },

    #[error("bad item in rule engine output: {item}")]
    #[diagnostic(
        code(planner::parse::bad_item),
        help("Each item must have exactly three fields: [subject,decision,minutes].")
    )]
    BadItem { item: String },

    #[error("empty {field} in rule engine output item: {item}")]
    #[diagnostic(
        code(planner::parse::empty_field),
        help("Every decision needs a non-empty subject and decision label.")
    )]
    EmptyField { field: String, item: String },

    #[error("non-numeric minutes \"{value}\" in rule engine output item: {item}")]
    #[diagnostic(
        code(planner::parse::bad_minutes),
        help(
            "Strict minutes parsing is enabled (`strict_minutes = true`). Fix the rule \
             file so minutes are non-negative numbers, or disable strict parsing to \
             read them as 0."
        )
    )]
    BadMinutes { value: String, item: String },
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// What to do with a minutes field that is not a non-negative number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinutesPolicy {
    /// Read it as 0 and log a warning. This can silently drop a requested
    /// allocation, so it is never applied without a trace in the log.
    #[default]
    Lenient,
    /// Fail the parse with [`ParseError::BadMinutes`].
    Strict,
}

impl MinutesPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }

    fn apply(self, value: &str, item: &str) -> ParseResult<u32> {
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc().min(f64::from(u32::MAX)) as u32),
            _ => self.reject(value, item),
        }
    }

    fn reject(self, value: &str, item: &str) -> ParseResult<u32> {
        match self {
            Self::Lenient => {
                tracing::warn!(value, item, "minutes are not a non-negative number, using 0");
                Ok(0)
            }
            Self::Strict => Err(ParseError::BadMinutes {
                value: value.to_string(),
                item: item.to_string(),
            }),
        }
    }
}

/// Parse engine output with lenient minutes handling.
pub fn parse_plan(raw: &str) -> ParseResult<Vec<Decision>> {
    parse_plan_with(raw, MinutesPolicy::Lenient)
}

/// Parse engine output.
pub fn parse_plan_with(raw: &str, policy: MinutesPolicy) -> ParseResult<Vec<Decision>> {
    let raw = raw.trim();

    if raw.starts_with('{') || raw.starts_with("[{") {
        match parse_structured(raw, policy) {
            Some(result) => return result,
            None => tracing::debug!("structured plan output malformed, trying bracketed list"),
        }
    }

    parse_bracketed(raw, policy)
}

fn decision(subject: &str, label: &str, minutes: u32, item: &str) -> ParseResult<Decision> {
    let subject = canonical_subject(subject);
    let label = label.trim();
    if subject.is_empty() {
        return Err(ParseError::EmptyField {
            field: "subject".into(),
            item: item.to_string(),
        });
    }
    if label.is_empty() {
        return Err(ParseError::EmptyField {
            field: "decision".into(),
            item: item.to_string(),
        });
    }
    Ok(Decision {
        subject,
        decision: label.to_string(),
        minutes,
    })
}

/// `None` means "not valid structured output"; the caller falls through.
fn parse_structured(raw: &str, policy: MinutesPolicy) -> Option<ParseResult<Vec<Decision>>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let items = match value {
        Value::Object(mut map) => match map.remove("plan")? {
            Value::Array(items) => items,
            _ => return None,
        },
        Value::Array(items) => items,
        _ => return None,
    };

    let mut plan = Vec::with_capacity(items.len());
    for item in &items {
        let obj = item.as_object()?;
        let subject = obj.get("subject")?.as_str()?;
        let label = obj.get("decision")?.as_str()?;
        let item_text = item.to_string();
        let minutes = match obj.get("minutes")? {
            Value::Number(n) => match n.as_f64() {
                Some(v) => policy.apply(&v.to_string(), &item_text),
                None => policy.reject(&n.to_string(), &item_text),
            },
            Value::String(s) => policy.apply(s, &item_text),
            other => policy.reject(&other.to_string(), &item_text),
        };
        let parsed = minutes.and_then(|m| decision(subject, label, m, &item_text));
        match parsed {
            Ok(d) => plan.push(d),
            Err(e) => return Some(Err(e)),
        }
    }
    Some(Ok(plan))
}

fn strip_quotes(token: &str) -> &str {
    token.trim_matches(|c: char| c == '\'' || c == '"')
}

fn parse_bracketed(raw: &str, policy: MinutesPolicy) -> ParseResult<Vec<Decision>> {
    let Some(inner) = raw.strip_prefix("[[").and_then(|r| r.strip_suffix("]]")) else {
        return Err(ParseError::Unrecognized {
            raw: raw.to_string(),
        });
    };
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut plan = Vec::new();
    for item in inner.split("],[") {
        let fields: Vec<&str> = item.split(',').map(str::trim).collect();
        let display = format!("[{item}]");
        let [subject, label, minutes] = fields.as_slice() else {
            return Err(ParseError::BadItem { item: display });
        };
        let minutes = policy.apply(minutes, &display)?;
        plan.push(decision(
            strip_quotes(subject),
            strip_quotes(label),
            minutes,
            &display,
        )?);
    }
    Ok(plan)
}

/// Render decisions in the bracketed-list grammar.
pub fn render_bracketed(decisions: &[Decision]) -> String {
    let items: Vec<String> = decisions
        .iter()
        .map(|d| format!("[{},{},{}]", d.subject, d.decision, d.minutes))
        .collect();
    if items.is_empty() {
        "[[]]".to_string()
    } else {
        format!("[{}]", items.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(subject: &str, decision: &str, minutes: u32) -> Decision {
        Decision {
            subject: subject.into(),
            decision: decision.into(),
            minutes,
        }
    }

    #[test]
    fn bracketed_list() {
        let plan = parse_plan("[[math,shortlist,120],[physics,needs_info,60]]").unwrap();
        assert_eq!(
            plan,
            vec![d("math", "shortlist", 120), d("physics", "needs_info", 60)]
        );
    }

    #[test]
    fn bracketed_list_tolerates_whitespace_quotes_and_floats() {
        let plan = parse_plan("  [[ 'Math' , \"shortlist\" , 90.7 ]]\n").unwrap();
        assert_eq!(plan, vec![d("math", "shortlist", 90)]);
    }

    #[test]
    fn empty_bracketed_list() {
        assert!(parse_plan("[[]]").unwrap().is_empty());
    }

    #[test]
    fn wrong_field_count_names_the_item() {
        match parse_plan("[[math,shortlist,120],[physics,60]]") {
            Err(ParseError::BadItem { item }) => assert_eq!(item, "[physics,60]"),
            other => panic!("expected BadItem, got {other:?}"),
        }
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(matches!(
            parse_plan("[['',shortlist,30]]"),
            Err(ParseError::EmptyField { .. })
        ));
    }

    #[test]
    fn unrecognized_output_echoes_text() {
        match parse_plan("Warning: goal failed") {
            Err(ParseError::Unrecognized { raw }) => assert_eq!(raw, "Warning: goal failed"),
            other => panic!("expected Unrecognized, got {other:?}"),
        }
        assert!(matches!(
            parse_plan("[math,shortlist,120]"),
            Err(ParseError::Unrecognized { .. })
        ));
    }

    // Lenient policy: a non-numeric minutes field becomes 0 instead of an
    // error, which silently drops that subject's requested time.
    #[test]
    fn lenient_non_numeric_minutes_become_zero() {
        let plan = parse_plan("[[math,shortlist,lots],[chem,shortlist,-5]]").unwrap();
        assert_eq!(plan, vec![d("math", "shortlist", 0), d("chem", "shortlist", 0)]);
    }

    #[test]
    fn strict_non_numeric_minutes_fail() {
        match parse_plan_with("[[math,shortlist,lots]]", MinutesPolicy::Strict) {
            Err(ParseError::BadMinutes { value, item }) => {
                assert_eq!(value, "lots");
                assert_eq!(item, "[math,shortlist,lots]");
            }
            other => panic!("expected BadMinutes, got {other:?}"),
        }
        assert_eq!(
            parse_plan_with("[[math,shortlist,45]]", MinutesPolicy::Strict).unwrap(),
            vec![d("math", "shortlist", 45)]
        );
    }

    #[test]
    fn structured_plan_object() {
        let raw = r#"{"plan": [{"subject": "Math", "decision": "shortlist", "minutes": 120},
                               {"subject": "physics", "decision": "needs_info", "minutes": "60"}]}"#;
        assert_eq!(
            parse_plan(raw).unwrap(),
            vec![d("math", "shortlist", 120), d("physics", "needs_info", 60)]
        );
    }

    #[test]
    fn structured_bare_list() {
        let raw = r#"[{"subject": "chem", "decision": "shortlist", "minutes": 40.9}]"#;
        assert_eq!(parse_plan(raw).unwrap(), vec![d("chem", "shortlist", 40)]);
    }

    #[test]
    fn malformed_structured_output_falls_through() {
        // Not valid JSON and not a bracketed list either.
        assert!(matches!(
            parse_plan(r#"{"plan": [oops"#),
            Err(ParseError::Unrecognized { .. })
        ));
        // A mapping without `plan` is not a plan.
        assert!(matches!(
            parse_plan(r#"{"decisions": []}"#),
            Err(ParseError::Unrecognized { .. })
        ));
    }

    #[test]
    fn bracketed_roundtrip() {
        let plan = vec![
            d("math", "shortlist", 120),
            d("physics", "needs_info", 60),
            d("chem", "defer", 0),
        ];
        let text = render_bracketed(&plan);
        assert_eq!(text, "[[math,shortlist,120],[physics,needs_info,60],[chem,defer,0]]");
        assert_eq!(parse_plan(&text).unwrap(), plan);
        assert!(parse_plan(&render_bracketed(&[])).unwrap().is_empty());
    }
}
