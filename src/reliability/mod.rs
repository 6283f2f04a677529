//! Uptime timeline from a station's status change log.
//!
//! The event log is a step function: a status holds until the next event.
//! The window `[now - window, now)` is cut into fixed slots; a slot takes the
//! status of the last event inside it, otherwise the last event before it,
//! otherwise it is offline.

use crate::models::{ReliabilityEvent, UptimeSlot};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

pub const ONLINE_STATUS: &str = "Online";

/// Upper bounds accepted by config validation.
pub const MAX_WINDOW_HOURS: u32 = 24 * 366;
pub const MAX_SLOT_COUNT: u32 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub window_hours: u32,
    pub slot_count: u32,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            slot_count: 48,
        }
    }
}

impl ReliabilityConfig {
    /// `None` when the hour count doesn't fit a duration.
    pub fn window(&self) -> Option<Duration> {
        Duration::try_hours(i64::from(self.window_hours))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeTimeline {
    pub slots: Vec<UptimeSlot>,
    pub online_slots: u32,
    pub total_slots: u32,
    pub uptime_percent: u8,
}

impl UptimeTimeline {
    fn empty() -> Self {
        Self {
            slots: Vec::new(),
            online_slots: 0,
            total_slots: 0,
            uptime_percent: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ParsedEvent<'a> {
    at: DateTime<Utc>,
    status: &'a str,
}

impl ParsedEvent<'_> {
    fn online(&self) -> bool {
        self.status == ONLINE_STATUS
    }
}

/// RFC 3339, or an ISO local timestamp without offset read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses and sorts a copy of the log. Unparsable timestamps are dropped.
fn parse_events(events: &[ReliabilityEvent]) -> Vec<ParsedEvent<'_>> {
    let mut parsed: Vec<ParsedEvent> = events
        .iter()
        .filter_map(|event| match parse_timestamp(&event.timestamp) {
            Some(at) => Some(ParsedEvent {
                at,
                status: event.status.as_str(),
            }),
            None => {
                tracing::debug!(timestamp = %event.timestamp, "dropping reliability event with bad timestamp");
                None
            }
        })
        .collect();

    // stable, so same-instant events keep their input order
    parsed.sort_by_key(|event| event.at);
    parsed
}

/// Last event strictly before `before`, if any.
fn event_before<'e, 'a>(events: &'e [ParsedEvent<'a>], before: DateTime<Utc>) -> Option<&'e ParsedEvent<'a>> {
    let idx = events.partition_point(|event| event.at < before);
    idx.checked_sub(1).map(|last| &events[last])
}

/// Start of the window and its length in ms, `None` if either overflows.
fn window_span(now: DateTime<Utc>, config: &ReliabilityConfig) -> Option<(DateTime<Utc>, i64)> {
    let window = config.window()?;
    let window_start = now.checked_sub_signed(window)?;
    let window_ms = window.num_milliseconds();
    // slot bounds multiply by the slot index
    window_ms.checked_mul(i64::from(config.slot_count))?;
    Some((window_start, window_ms))
}

pub fn calculate_uptime(
    events: &[ReliabilityEvent],
    now: DateTime<Utc>,
    config: &ReliabilityConfig,
) -> UptimeTimeline {
    let total_slots = config.slot_count;
    if total_slots == 0 {
        return UptimeTimeline::empty();
    }

    let Some((window_start, window_ms)) = window_span(now, config) else {
        tracing::warn!(
            window_hours = config.window_hours,
            slot_count = total_slots,
            "reliability window out of range"
        );
        return UptimeTimeline::empty();
    };

    let parsed = parse_events(events);

    let slot_bound = |i: u32| window_start + Duration::milliseconds(window_ms * i64::from(i) / i64::from(total_slots));

    let slots: Vec<UptimeSlot> = (0..total_slots)
        .map(|i| {
            let slot_start = slot_bound(i);
            let slot_end = slot_bound(i + 1);

            // The last event before slot_end is either inside [slot_start, slot_end)
            // or the last known state carried forward from before slot_start.
            let is_online = event_before(&parsed, slot_end).is_some_and(|event| event.online());

            UptimeSlot {
                slot_start,
                is_online,
            }
        })
        .collect();

    let online_slots = slots.iter().filter(|slot| slot.is_online).count() as u32;
    let uptime_percent = (100.0 * f64::from(online_slots) / f64::from(total_slots)).round() as u8;

    UptimeTimeline {
        slots,
        online_slots,
        total_slots,
        uptime_percent,
    }
}

/// Status in effect at `now`: the latest parsed event at or before it.
pub fn last_known_status(events: &[ReliabilityEvent], now: DateTime<Utc>) -> Option<String> {
    let parsed = parse_events(events);
    let idx = parsed.partition_point(|event| event.at <= now);
    idx.checked_sub(1).map(|last| parsed[last].status.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
    }

    fn event(at: DateTime<Utc>, status: &str) -> ReliabilityEvent {
        ReliabilityEvent {
            timestamp: at.to_rfc3339(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_empty_log_is_all_offline() {
        let timeline = calculate_uptime(&[], midnight(), &ReliabilityConfig::default());
        assert_eq!(timeline.slots.len(), 48);
        assert!(timeline.slots.iter().all(|slot| !slot.is_online));
        assert_eq!(timeline.uptime_percent, 0);
    }

    #[test]
    fn test_backward_fill_across_day() {
        let day_start = midnight() - Duration::hours(24);
        let events = vec![
            event(day_start + Duration::hours(10), "Offline"),
            event(day_start, "Online"),
        ];

        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());

        assert_eq!(timeline.slots[0].slot_start, day_start);
        for (i, slot) in timeline.slots.iter().enumerate() {
            assert_eq!(slot.is_online, i < 20, "slot {}", i);
        }
        assert_eq!(timeline.online_slots, 20);
        assert_eq!(timeline.uptime_percent, 42);
    }

    #[test]
    fn test_event_on_boundary_belongs_to_following_slot() {
        let day_start = midnight() - Duration::hours(24);
        let boundary = day_start + Duration::minutes(30);
        let events = vec![event(boundary, "Online")];

        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert!(!timeline.slots[0].is_online);
        assert!(timeline.slots[1].is_online);
        assert_eq!(timeline.online_slots, 47);
    }

    #[test]
    fn test_last_event_in_slot_wins() {
        let day_start = midnight() - Duration::hours(24);
        let events = vec![
            event(day_start + Duration::minutes(5), "Online"),
            event(day_start + Duration::minutes(20), "Offline"),
            event(day_start + Duration::minutes(10), "Online"),
        ];

        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert!(!timeline.slots[0].is_online);
        assert_eq!(timeline.uptime_percent, 0);
    }

    #[test]
    fn test_events_before_window_carry_in() {
        let events = vec![event(midnight() - Duration::days(3), "Online")];
        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert_eq!(timeline.uptime_percent, 100);
    }

    #[test]
    fn test_only_exact_online_counts() {
        let events = vec![event(midnight() - Duration::days(3), "online")];
        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert_eq!(timeline.uptime_percent, 0);
    }

    #[test]
    fn test_bad_timestamps_are_dropped() {
        let events = vec![
            ReliabilityEvent {
                timestamp: "not a time".to_string(),
                status: "Online".to_string(),
            },
            ReliabilityEvent {
                timestamp: String::new(),
                status: "Online".to_string(),
            },
        ];
        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert_eq!(timeline, calculate_uptime(&[], midnight(), &ReliabilityConfig::default()));
    }

    #[test]
    fn test_calculation_is_repeatable_and_leaves_input_alone() {
        let day_start = midnight() - Duration::hours(24);
        let events = vec![
            event(day_start + Duration::hours(3), "Online"),
            event(day_start + Duration::hours(1), "Offline"),
            event(day_start + Duration::hours(17), "Maintenance"),
        ];
        let before = events.clone();

        let first = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        let second = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());

        assert_eq!(first, second);
        assert_eq!(events, before);
        assert_eq!(first.online_slots, 28);
    }

    #[test]
    fn test_custom_resolution() {
        let config = ReliabilityConfig {
            window_hours: 1,
            slot_count: 4,
        };
        let events = vec![event(midnight() - Duration::minutes(30), "Online")];
        let timeline = calculate_uptime(&events, midnight(), &config);

        let states: Vec<bool> = timeline.slots.iter().map(|slot| slot.is_online).collect();
        assert_eq!(states, vec![false, false, true, true]);
        assert_eq!(timeline.uptime_percent, 50);
    }

    #[test]
    fn test_last_known_status_ignores_future_events() {
        let events = vec![
            event(midnight() - Duration::hours(2), "Online"),
            event(midnight() + Duration::hours(1), "Offline"),
        ];
        assert_eq!(last_known_status(&events, midnight()), Some("Online".to_string()));
        assert_eq!(last_known_status(&[], midnight()), None);
    }

    #[test]
    fn test_window_out_of_range_gives_empty_timeline() {
        let config = ReliabilityConfig {
            window_hours: 3_000_000_000,
            slot_count: 48,
        };
        let events = vec![event(midnight() - Duration::hours(1), "Online")];

        let timeline = calculate_uptime(&events, midnight(), &config);
        assert!(timeline.slots.is_empty());
        assert_eq!(timeline.total_slots, 0);
        assert_eq!(timeline.uptime_percent, 0);
    }

    #[test]
    fn test_timestamp_without_offset_is_read_as_utc() {
        let day_start = midnight() - Duration::hours(24);
        let events = vec![
            ReliabilityEvent {
                timestamp: "2024-05-01T00:00:00".to_string(),
                status: "Online".to_string(),
            },
            ReliabilityEvent {
                timestamp: "2024-05-01T12:00:00.250".to_string(),
                status: "Offline".to_string(),
            },
        ];

        let timeline = calculate_uptime(&events, midnight(), &ReliabilityConfig::default());
        assert_eq!(timeline.slots[0].slot_start, day_start);
        assert_eq!(timeline.online_slots, 24);
        assert_eq!(timeline.uptime_percent, 50);
        assert_eq!(last_known_status(&events, midnight()), Some("Offline".to_string()));
    }
}
