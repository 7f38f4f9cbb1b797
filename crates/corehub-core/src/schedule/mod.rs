//! Scheduling: TeamMeet requests, OPS schedules and counselor follow-ups.
//!
//! Every event occupies a slot in its owners' day calendars. Slots are
//! claimed atomically in the store, so two requests for overlapping times
//! cannot both succeed; the loser gets `Conflict`.

pub mod followup;
pub mod model;
pub mod ops;
pub mod teammeet;

use crate::error::{CoreError, CoreResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use corehub_redis::queries::calendar::{self, SlotEntry};
use corehub_redis::RedisPool as DbPool;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MAX_DURATION_MINUTES: u32 = 720;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Whether `[a_start, a_end)` and `[b_start, b_end)` share any minute.
pub fn overlaps(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && a_end > b_start
}

/// A validated event time on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

impl TimeSlot {
    /// Parse `YYYY-MM-DD` and `HH:MM` (seconds tolerated). The event must
    /// finish by midnight.
    pub fn parse(date: &str, start_time: &str, duration_minutes: u32) -> CoreResult<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| CoreError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;
        let start_time = start_time.trim();
        let start = NaiveTime::parse_from_str(start_time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(start_time, "%H:%M:%S"))
            .map_err(|_| CoreError::validation(format!("Invalid start time '{}', expected HH:MM", start_time)))?;
        if duration_minutes == 0 || duration_minutes > MAX_DURATION_MINUTES {
            return Err(CoreError::validation(format!(
                "Duration must be between 1 and {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        let slot = Self { date, start, duration_minutes };
        if slot.end_minute() > MINUTES_PER_DAY {
            return Err(CoreError::validation("Events must end on the day they start"));
        }
        Ok(slot)
    }

    pub fn start_minute(&self) -> u32 {
        self.start.num_seconds_from_midnight() / 60
    }

    pub fn end_minute(&self) -> u32 {
        self.start_minute() + self.duration_minutes
    }

    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn start_label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start)
    }
}

fn minute_label(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// The independent calendars kept per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    TeamMeet,
    Ops,
    FollowUp,
}

impl CalendarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamMeet => "teammeet",
            Self::Ops => "ops",
            Self::FollowUp => "followup",
        }
    }
}

/// Claim `slot` for every participant or fail with `Conflict`.
pub(crate) async fn claim(
    pool: &DbPool,
    kind: CalendarKind,
    participants: &[&str],
    slot: &TimeSlot,
    event_id: &str,
    ignore_event: Option<&str>,
) -> CoreResult<()> {
    let conflict = calendar::claim_slot(
        pool,
        kind.as_str(),
        participants,
        &slot.date_key(),
        event_id,
        slot.start_minute(),
        slot.end_minute(),
        ignore_event,
    )
    .await?;

    match conflict {
        Some(existing) => Err(CoreError::Conflict(format!(
            "The requested time overlaps an existing booking ({}) on {} at {}",
            existing,
            slot.date_key(),
            slot.start_label()
        ))),
        None => Ok(()),
    }
}

pub(crate) async fn release(
    pool: &DbPool,
    kind: CalendarKind,
    participants: &[&str],
    slot: &TimeSlot,
    event_id: &str,
) -> CoreResult<()> {
    calendar::release_slot(pool, kind.as_str(), participants, &slot.date_key(), event_id, slot.end_minute())
        .await?;
    Ok(())
}

/// Release on a failure path, where the original error is what matters.
pub(crate) async fn release_quietly(
    pool: &DbPool,
    kind: CalendarKind,
    participants: &[&str],
    slot: &TimeSlot,
    event_id: &str,
) {
    if let Err(e) = release(pool, kind, participants, slot, event_id).await {
        warn!(event_id, calendar = kind.as_str(), error = %e, "Failed to release calendar slot");
    }
}

/// Input of the check-availability endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    /// The other participant (TeamMeet) or the calendar owner when an admin asks.
    #[serde(default)]
    pub participant_id: Option<String>,
    /// An event to leave out, e.g. the one being rescheduled.
    #[serde(default)]
    pub ignore_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedSlot {
    pub participant_id: String,
    pub event_id: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<BookedSlot>,
}

/// Entries of one calendar day that overlap `slot`.
pub fn conflicts_in<'a>(
    entries: &'a [SlotEntry],
    slot: &TimeSlot,
    ignore_event: Option<&str>,
) -> Vec<&'a SlotEntry> {
    entries
        .iter()
        .filter(|e| ignore_event != Some(e.event_id.as_str()))
        .filter(|e| overlaps(slot.start_minute(), slot.end_minute(), e.start_minute, e.end_minute))
        .collect()
}

/// Read-only availability check across participants.
pub(crate) async fn availability(
    pool: &DbPool,
    kind: CalendarKind,
    participants: &[&str],
    slot: &TimeSlot,
    ignore_event: Option<&str>,
) -> CoreResult<Availability> {
    let date = slot.date_key();
    let mut conflicts = Vec::new();
    for participant in participants {
        let entries = calendar::day_entries(pool, kind.as_str(), participant, &date).await?;
        conflicts.extend(conflicts_in(&entries, slot, ignore_event).into_iter().map(|e| BookedSlot {
            participant_id: participant.to_string(),
            event_id: e.event_id.clone(),
            start_time: minute_label(e.start_minute),
            end_time: minute_label(e.end_minute),
        }));
    }
    Ok(Availability { available: conflicts.is_empty(), conflicts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, start: u32, end: u32) -> SlotEntry {
        SlotEntry { event_id: id.into(), start_minute: start, end_minute: end }
    }

    #[test]
    fn test_half_hour_slots_overlap() {
        let first = TimeSlot::parse("2026-03-02", "10:00", 30).unwrap();
        let second = TimeSlot::parse("2026-03-02", "10:15", 30).unwrap();
        assert!(overlaps(
            second.start_minute(),
            second.end_minute(),
            first.start_minute(),
            first.end_minute()
        ));
    }

    #[test]
    fn test_back_to_back_slots_do_not_overlap() {
        assert!(!overlaps(600, 630, 630, 660));
        assert!(!overlaps(630, 660, 600, 630));
        assert!(overlaps(600, 700, 620, 640));
    }

    #[test]
    fn test_parse_slot() {
        let slot = TimeSlot::parse("2026-03-02", "09:30:00", 45).unwrap();
        assert_eq!(slot.start_minute(), 570);
        assert_eq!(slot.end_minute(), 615);
        assert_eq!(slot.date_key(), "2026-03-02");
        assert_eq!(slot.start_label(), "09:30");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(TimeSlot::parse("02/03/2026", "10:00", 30).is_err());
        assert!(TimeSlot::parse("2026-03-02", "25:00", 30).is_err());
        assert!(TimeSlot::parse("2026-03-02", "10:00", 0).is_err());
        assert!(TimeSlot::parse("2026-03-02", "10:00", 721).is_err());
        assert!(TimeSlot::parse("2026-03-02", "23:30", 60).is_err());
        assert!(TimeSlot::parse("2026-03-02", "23:00", 60).is_ok());
    }

    #[test]
    fn test_conflicts_in_respects_ignore() {
        let slot = TimeSlot::parse("2026-03-02", "10:15", 30).unwrap();
        let entries = vec![entry("a", 600, 630), entry("b", 630, 660), entry("c", 700, 720)];
        let ids: Vec<_> = conflicts_in(&entries, &slot, None).iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let ids: Vec<_> = conflicts_in(&entries, &slot, Some("a")).iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_minute_label() {
        assert_eq!(minute_label(0), "00:00");
        assert_eq!(minute_label(615), "10:15");
        assert_eq!(minute_label(1440), "24:00");
    }
}
