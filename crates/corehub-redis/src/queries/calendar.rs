//! Per-participant day calendars with atomic slot claims.
//!
//! A calendar is a sorted set `core:cal:{kind}:{participant}:{date}` whose
//! members are `"{event_id}|{end_minute}"` scored by the start minute. Claims
//! run as one Lua script so the overlap check and the insert cannot interleave
//! with a competing request.

use crate::client::{RedisPool, RedisResult};
use redis::AsyncCommands;
use std::sync::LazyLock;

/// Checks every calendar in KEYS and inserts the slot into all of them only
/// when none overlaps. Returns the conflicting event id, or nil on success.
const CLAIM_SCRIPT: &str = r#"
local start = tonumber(ARGV[2])
local finish = tonumber(ARGV[3])
for _, key in ipairs(KEYS) do
  local entries = redis.call('ZRANGE', key, 0, -1, 'WITHSCORES')
  for j = 1, #entries, 2 do
    local id, stop = string.match(entries[j], '^(.*)|(%d+)$')
    local begin = tonumber(entries[j + 1])
    if id ~= ARGV[4] and start < tonumber(stop) and finish > begin then
      return id
    end
  end
end
for _, key in ipairs(KEYS) do
  redis.call('ZADD', key, start, ARGV[1] .. '|' .. ARGV[3])
end
return false
"#;

static CLAIM: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(CLAIM_SCRIPT));

/// A booked slot read back from a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub event_id: String,
    pub start_minute: u32,
    pub end_minute: u32,
}

pub fn calendar_key(kind: &str, participant: &str, date: &str) -> String {
    format!("core:cal:{}:{}:{}", kind, participant, date)
}

fn member(event_id: &str, end_minute: u32) -> String {
    format!("{}|{}", event_id, end_minute)
}

fn parse_member(raw: &str, start: f64) -> Option<SlotEntry> {
    let (id, end) = raw.rsplit_once('|')?;
    Some(SlotEntry {
        event_id: id.to_string(),
        start_minute: start as u32,
        end_minute: end.parse().ok()?,
    })
}

/// Atomically claim `[start, end)` on every participant's calendar for `date`.
///
/// `ignore_event` lets a reschedule skip its own existing entry. Returns the id
/// of the first conflicting event, or `None` when the slot was claimed.
#[allow(clippy::too_many_arguments)]
pub async fn claim_slot(
    pool: &RedisPool,
    kind: &str,
    participants: &[&str],
    date: &str,
    event_id: &str,
    start_minute: u32,
    end_minute: u32,
    ignore_event: Option<&str>,
) -> RedisResult<Option<String>> {
    let mut conn = pool.clone();
    let mut invocation = CLAIM.prepare_invoke();
    for participant in participants {
        invocation.key(calendar_key(kind, participant, date));
    }
    invocation
        .arg(event_id)
        .arg(start_minute)
        .arg(end_minute)
        .arg(ignore_event.unwrap_or(""));

    let conflict: Option<String> = invocation.invoke_async(&mut conn).await?;
    tracing::debug!(kind, date, event_id, ?conflict, "Calendar claim evaluated");
    Ok(conflict)
}

/// Release a previously claimed slot from every participant's calendar.
pub async fn release_slot(
    pool: &RedisPool,
    kind: &str,
    participants: &[&str],
    date: &str,
    event_id: &str,
    end_minute: u32,
) -> RedisResult<()> {
    let mut conn = pool.clone();
    for participant in participants {
        conn.zrem::<_, _, ()>(calendar_key(kind, participant, date), member(event_id, end_minute))
            .await?;
    }
    Ok(())
}

/// Booked slots of one participant on one day, ordered by start.
pub async fn day_entries(
    pool: &RedisPool,
    kind: &str,
    participant: &str,
    date: &str,
) -> RedisResult<Vec<SlotEntry>> {
    let mut conn = pool.clone();
    let raw: Vec<(String, f64)> = conn
        .zrange_withscores(calendar_key(kind, participant, date), 0, -1)
        .await?;
    Ok(raw
        .iter()
        .filter_map(|(m, score)| parse_member(m, *score))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_round_trip() {
        let raw = member("evt-1", 630);
        let entry = parse_member(&raw, 600.0).unwrap();
        assert_eq!(
            entry,
            SlotEntry { event_id: "evt-1".into(), start_minute: 600, end_minute: 630 }
        );
    }

    #[test]
    fn test_member_with_pipe_in_id() {
        let entry = parse_member("a|b|45", 15.0).unwrap();
        assert_eq!(entry.event_id, "a|b");
        assert_eq!(entry.end_minute, 45);
    }

    #[test]
    fn test_calendar_key_layout() {
        assert_eq!(calendar_key("ops", "u1", "2026-03-01"), "core:cal:ops:u1:2026-03-01");
    }
}
