//! Act: greedy time-boxing of today's decisions.
//!
//! Only decisions carrying the include label are scheduled. They are taken
//! largest request first (stable on ties), each clipped to the remaining
//! daily capacity, and laid out back to back from the start time with a fixed
//! buffer between sessions. The first allocation that comes out as zero ends
//! the walk; anything after it is dropped for today, not deferred.
//!
//! Slots carry full date-times, so a day whose sessions run past 24:00 stays
//! strictly ordered; only the `HH:MM` columns of the CSV wrap to the next day.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::artifact;
use crate::config::PlannerConfig;
use crate::error::{ArtifactResult, ConfigResult};
use crate::reason::Decision;

/// CSV header of the schedule artifact.
pub const SCHEDULE_HEADER: &str = "subject,start,end,minutes";

/// One study session on today's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub minutes: u32,
}

impl ScheduleSlot {
    /// `subject,HH:MM,HH:MM,minutes`. Times past midnight render as next-day clock times.
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.subject,
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.minutes
        )
    }
}

/// Greedy scheduler settings that do not change from day to day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    /// Minutes between the end of one slot and the start of the next.
    pub buffer_min: u32,
    /// Decision label that means "study this today".
    pub include_label: String,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            buffer_min: 5,
            include_label: "shortlist".into(),
        }
    }
}

impl Scheduler {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            buffer_min: config.buffer_min,
            include_label: config.include_label.clone(),
        }
    }

    /// Lay out `decisions` within `capacity_min` minutes starting at `start`.
    pub fn schedule(
        &self,
        decisions: &[Decision],
        capacity_min: u32,
        start: NaiveDateTime,
    ) -> Vec<ScheduleSlot> {
        let mut picked: Vec<&Decision> = decisions
            .iter()
            .filter(|d| d.decision == self.include_label)
            .collect();
        // `sort_by` is stable: equal requests keep their input order.
        picked.sort_by(|a, b| b.minutes.cmp(&a.minutes));

        let mut slots = Vec::new();
        let mut remaining = capacity_min;
        let mut cursor = start;

        for decision in picked {
            let allocation = decision.minutes.min(remaining);
            if allocation == 0 {
                break;
            }
            let end = cursor + TimeDelta::minutes(i64::from(allocation));
            slots.push(ScheduleSlot {
                subject: decision.subject.clone(),
                start: cursor,
                end,
                minutes: allocation,
            });
            cursor = end + TimeDelta::minutes(i64::from(self.buffer_min));
            remaining -= allocation;
        }

        tracing::debug!(
            candidates = decisions.len(),
            slots = slots.len(),
            allocated = capacity_min - remaining,
            capacity_min,
            "schedule built"
        );
        slots
    }
}

/// Schedule `day` with every setting taken from config.
pub fn build_schedule(
    decisions: &[Decision],
    config: &PlannerConfig,
    day: NaiveDate,
) -> ConfigResult<Vec<ScheduleSlot>> {
    let capacity = config.daily_capacity()?;
    let start = day.and_time(config.start()?);
    Ok(Scheduler::from_config(config).schedule(decisions, capacity, start))
}

/// Schedule artifact contents: header plus one row per slot.
pub fn render_csv(slots: &[ScheduleSlot]) -> String {
    let mut out = String::from(SCHEDULE_HEADER);
    out.push('\n');
    for slot in slots {
        out.push_str(&slot.csv_row());
        out.push('\n');
    }
    out
}

/// Replace the schedule artifact.
pub fn write_schedule(path: &Path, slots: &[ScheduleSlot]) -> ArtifactResult<()> {
    artifact::write_atomic(path, render_csv(slots).as_bytes())
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

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn excluded_labels_are_dropped_and_oversized_request_is_clipped() {
        let plan = vec![d("math", "shortlist", 120), d("physics", "needs_info", 60)];
        let slots = Scheduler::default().schedule(&plan, 90, hm(17, 0));
        assert_eq!(
            slots,
            vec![ScheduleSlot {
                subject: "math".into(),
                start: hm(17, 0),
                end: hm(18, 30),
                minutes: 90,
            }]
        );
    }

    #[test]
    fn largest_request_goes_first_with_buffer() {
        let plan = vec![d("math", "shortlist", 30), d("chem", "shortlist", 40)];
        let slots = Scheduler::default().schedule(&plan, 100, hm(17, 0));
        let rows: Vec<String> = slots.iter().map(ScheduleSlot::csv_row).collect();
        assert_eq!(rows, vec!["chem,17:00,17:40,40", "math,17:45,18:15,30"]);
        assert_eq!(slots.iter().map(|s| s.minutes).sum::<u32>(), 70);
    }

    #[test]
    fn ties_keep_input_order() {
        let plan = vec![
            d("bio", "shortlist", 30),
            d("art", "shortlist", 30),
            d("geo", "shortlist", 30),
        ];
        let slots = Scheduler::default().schedule(&plan, 500, hm(9, 0));
        let order: Vec<&str> = slots.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(order, vec!["bio", "art", "geo"]);
    }

    #[test]
    fn capacity_exhaustion_stops_the_walk() {
        let plan = vec![
            d("math", "shortlist", 60),
            d("chem", "shortlist", 50),
            d("bio", "shortlist", 10),
        ];
        let slots = Scheduler::default().schedule(&plan, 100, hm(8, 0));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].subject, "chem");
        assert_eq!(slots[1].minutes, 40);
    }

    #[test]
    fn degenerate_inputs_give_empty_schedule() {
        let sched = Scheduler::default();
        assert!(sched.schedule(&[], 240, hm(17, 0)).is_empty());
        assert!(sched.schedule(&[d("math", "shortlist", 60)], 0, hm(17, 0)).is_empty());
        assert!(sched.schedule(&[d("math", "defer", 60)], 240, hm(17, 0)).is_empty());
    }

    #[test]
    fn custom_label_and_buffer() {
        let sched = Scheduler {
            buffer_min: 15,
            include_label: "today".into(),
        };
        let plan = vec![d("math", "today", 30), d("chem", "shortlist", 90), d("bio", "today", 20)];
        let slots = sched.schedule(&plan, 240, hm(10, 0));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].start, hm(10, 45));
    }

    #[test]
    fn schedule_is_idempotent() {
        let plan = vec![d("math", "shortlist", 45), d("chem", "shortlist", 45)];
        let sched = Scheduler::default();
        assert_eq!(
            sched.schedule(&plan, 80, hm(17, 0)),
            sched.schedule(&plan, 80, hm(17, 0))
        );
    }

    #[test]
    fn build_schedule_reads_config() {
        let cfg = PlannerConfig {
            daily_capacity_min: Some(90),
            ..Default::default()
        };
        let slots = build_schedule(&[d("math", "shortlist", 120)], &cfg, day()).unwrap();
        assert_eq!(slots[0].start, hm(17, 0));
        assert_eq!(slots[0].minutes, 90);
    }

    #[test]
    fn sessions_past_midnight_stay_ordered() {
        let plan = vec![d("math", "shortlist", 120), d("chem", "shortlist", 100)];
        let slots = Scheduler::default().schedule(&plan, 240, hm(23, 0));

        assert_eq!(slots.len(), 2);
        for slot in &slots {
            assert!(slot.start < slot.end, "{} ends before it starts", slot.subject);
        }
        assert!(slots[0].end < slots[1].start);
        let next_day = day().succ_opt().unwrap();
        assert_eq!(slots[1].start, next_day.and_hms_opt(1, 5, 0).unwrap());

        let rows: Vec<String> = slots.iter().map(ScheduleSlot::csv_row).collect();
        assert_eq!(rows, vec!["math,23:00,01:00,120", "chem,01:05,02:45,100"]);
    }

    #[test]
    fn csv_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("todays_plan.csv");
        let slots = Scheduler::default().schedule(&[d("math", "shortlist", 30)], 60, hm(7, 5));
        write_schedule(&path, &slots).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "subject,start,end,minutes\nmath,07:05,07:35,30\n"
        );

        write_schedule(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "subject,start,end,minutes\n");
    }
}
