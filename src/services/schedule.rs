//! Active / upcoming classification of recurring daily event windows.
//!
//! Everything here is a pure function of `(now, events)`: no clock reads, no I/O
//! and no state carried between calls. The poller re-runs [`classify`] from
//! scratch on every tick.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::{
    EventDefinition, MinuteSpan, TimeOfDay, WallClockMinutes, WindowError, WindowSpec,
    MINUTES_PER_DAY,
};

/// Number of upcoming windows shown before the "+N more" hint.
pub const DEFAULT_UPCOMING_LIMIT: usize = 9;

/// A parsed daily window. `end < start` means the window runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Where a window sits relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Active {
        remaining: u16,
    },
    Upcoming {
        /// Start in minutes from today's midnight, folded into tomorrow when
        /// today's start has already passed.
        start_adjusted: u16,
        starts_in: u16,
    },
    Elapsed,
}

impl DailyWindow {
    pub fn parse(spec: &WindowSpec) -> Result<Self, WindowError> {
        Ok(Self {
            start: spec.start.parse()?,
            end: spec.end.parse()?,
        })
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end.minutes() < self.start.minutes()
    }

    pub fn placement(&self, now: WallClockMinutes) -> Placement {
        let now = now.get();
        let start = self.start.minutes();
        let end = self.end.minutes();
        let end_adjusted = if self.crosses_midnight() {
            end + MINUTES_PER_DAY
        } else {
            end
        };

        // Both bounds inclusive.
        if start <= now && now <= end_adjusted {
            return Placement::Active {
                remaining: end_adjusted - now,
            };
        }

        // After midnight, inside a window that opened yesterday.
        if self.crosses_midnight() && now + MINUTES_PER_DAY <= end_adjusted {
            return Placement::Active {
                remaining: end_adjusted - (now + MINUTES_PER_DAY),
            };
        }

        let start_adjusted = if now > start {
            start + MINUTES_PER_DAY
        } else {
            start
        };
        if start_adjusted > now {
            Placement::Upcoming {
                start_adjusted,
                starts_in: start_adjusted - now,
            }
        } else {
            Placement::Elapsed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventStatus {
    Active { remaining: MinuteSpan },
    Upcoming { starts_in: MinuteSpan },
}

/// One `(event, window)` pair resolved against the current time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEvent {
    pub name: String,
    #[serde(rename = "map")]
    pub map_name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub crosses_midnight: bool,
    #[serde(flatten)]
    pub status: EventStatus,
}

impl ClassifiedEvent {
    fn new(event: &EventDefinition, window: DailyWindow, status: EventStatus) -> Self {
        Self {
            name: event.name.clone(),
            map_name: event.map_name.clone(),
            start: window.start,
            end: window.end,
            crosses_midnight: window.crosses_midnight(),
            status,
        }
    }
}

/// A window that could not be classified. Only that window is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowFailure {
    pub event: String,
    pub window_index: usize,
    pub start: String,
    pub end: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: WindowError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Active windows in feed order (event order, then window order).
    pub active: Vec<ClassifiedEvent>,
    /// Nearest upcoming windows, soonest first.
    pub upcoming: Vec<ClassifiedEvent>,
    /// How many upcoming windows were cut off by the limit.
    pub upcoming_overflow: usize,
    pub failures: Vec<WindowFailure>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.upcoming.is_empty()
    }
}

/// Split every event window into active and upcoming relative to `now`.
///
/// Upcoming windows are stable-sorted by adjusted start time and cut to
/// `upcoming_limit`; the number cut is reported as `upcoming_overflow`.
/// Malformed windows end up in `failures` and do not affect the rest.
pub fn classify(
    now: WallClockMinutes,
    events: &[EventDefinition],
    upcoming_limit: usize,
) -> Classification {
    let mut active = Vec::new();
    let mut upcoming: Vec<(u16, ClassifiedEvent)> = Vec::new();
    let mut failures = Vec::new();

    for event in events {
        for (window_index, spec) in event.daily_windows.iter().enumerate() {
            let window = match DailyWindow::parse(spec) {
                Ok(window) => window,
                Err(error) => {
                    failures.push(WindowFailure {
                        event: event.name.clone(),
                        window_index,
                        start: spec.start.clone(),
                        end: spec.end.clone(),
                        error,
                    });
                    continue;
                }
            };

            match window.placement(now) {
                Placement::Active { remaining } => active.push(ClassifiedEvent::new(
                    event,
                    window,
                    EventStatus::Active {
                        remaining: MinuteSpan::new(remaining),
                    },
                )),
                Placement::Upcoming {
                    start_adjusted,
                    starts_in,
                } => upcoming.push((
                    start_adjusted,
                    ClassifiedEvent::new(
                        event,
                        window,
                        EventStatus::Upcoming {
                            starts_in: MinuteSpan::new(starts_in),
                        },
                    ),
                )),
                Placement::Elapsed => {}
            }
        }
    }

    // sort_by_key is stable: equal starts keep feed order
    upcoming.sort_by_key(|(start_adjusted, _)| *start_adjusted);
    let upcoming_overflow = upcoming.len().saturating_sub(upcoming_limit);

    Classification {
        active,
        upcoming: upcoming
            .into_iter()
            .take(upcoming_limit)
            .map(|(_, event)| event)
            .collect(),
        upcoming_overflow,
        failures,
    }
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8) -> WallClockMinutes {
        WallClockMinutes::from_hm(hour, minute).unwrap()
    }

    fn event(name: &str, windows: &[(&str, &str)]) -> EventDefinition {
        EventDefinition {
            name: name.to_string(),
            map_name: "dam".to_string(),
            daily_windows: windows
                .iter()
                .map(|(start, end)| WindowSpec::new(*start, *end))
                .collect(),
        }
    }

    fn remaining(e: &ClassifiedEvent) -> u16 {
        match e.status {
            EventStatus::Active { remaining } => remaining.total_minutes(),
            EventStatus::Upcoming { .. } => panic!("{} is not active", e.name),
        }
    }

    fn starts_in(e: &ClassifiedEvent) -> u16 {
        match e.status {
            EventStatus::Upcoming { starts_in } => starts_in.total_minutes(),
            EventStatus::Active { .. } => panic!("{} is not upcoming", e.name),
        }
    }

    #[test]
    fn rollover_window_active_after_midnight() {
        let events = [event("Night Raid", &[("23:30", "00:30")])];
        let result = classify(at(0, 15), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(result.active.len(), 1);
        assert!(result.upcoming.is_empty());
        assert_eq!(remaining(&result.active[0]), 15);
        assert!(result.active[0].crosses_midnight);
    }

    #[test]
    fn rollover_window_active_before_midnight() {
        let events = [event("Night Raid", &[("23:30", "00:30")])];
        let result = classify(at(23, 45), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(remaining(&result.active[0]), 45);
    }

    #[test]
    fn rollover_window_upcoming_during_the_day() {
        let events = [event("Night Raid", &[("23:30", "00:30")])];
        let result = classify(at(12, 0), &events, DEFAULT_UPCOMING_LIMIT);

        assert!(result.active.is_empty());
        assert_eq!(starts_in(&result.upcoming[0]), 11 * 60 + 30);
    }

    #[test]
    fn plain_window_active_upcoming_and_folded() {
        let events = [event("Harvester", &[("10:00", "11:00")])];

        let during = classify(at(10, 30), &events, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(remaining(&during.active[0]), 30);

        let before = classify(at(9, 0), &events, DEFAULT_UPCOMING_LIMIT);
        assert!(before.active.is_empty());
        assert_eq!(starts_in(&before.upcoming[0]), 60);

        // Elapsed today: reappears as tomorrow's occurrence.
        let after = classify(at(12, 0), &events, DEFAULT_UPCOMING_LIMIT);
        assert!(after.active.is_empty());
        assert_eq!(after.upcoming.len(), 1);
        assert_eq!(starts_in(&after.upcoming[0]), 22 * 60);
    }

    #[test]
    fn bounds_are_inclusive() {
        let events = [event("Harvester", &[("10:00", "11:00")])];

        let opening = classify(at(10, 0), &events, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(remaining(&opening.active[0]), 60);

        let closing = classify(at(11, 0), &events, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(remaining(&closing.active[0]), 0);

        let gone = classify(at(11, 1), &events, DEFAULT_UPCOMING_LIMIT);
        assert!(gone.active.is_empty());
    }

    #[test]
    fn end_of_day_marker() {
        let events = [event("Late Shift", &[("22:00", "24:00")])];
        let result = classify(at(23, 59), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(remaining(&result.active[0]), 1);
        assert!(!result.active[0].crosses_midnight);
    }

    #[test]
    fn upcoming_sorted_by_start_and_stable_on_ties() {
        let events = [
            event("C", &[("15:00", "16:00")]),
            event("A", &[("13:00", "14:00")]),
            event("B1", &[("14:00", "15:00")]),
            event("B2", &[("14:00", "14:30")]),
            // Already passed today, so it lands at the end as tomorrow's 08:00.
            event("D", &[("08:00", "09:00")]),
        ];
        let result = classify(at(12, 0), &events, DEFAULT_UPCOMING_LIMIT);

        let names: Vec<_> = result.upcoming.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "B1", "B2", "C", "D"]);

        let waits: Vec<_> = result.upcoming.iter().map(starts_in).collect();
        assert!(waits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn active_keeps_feed_order() {
        let events = [
            event("Second Window", &[("11:00", "13:00"), ("09:00", "12:30")]),
            event("Early", &[("08:00", "12:05")]),
        ];
        let result = classify(at(12, 0), &events, DEFAULT_UPCOMING_LIMIT);

        let order: Vec<_> = result
            .active
            .iter()
            .map(|e| (e.name.as_str(), e.start.to_string()))
            .collect();
        assert_eq!(
            order,
            [
                ("Second Window", "11:00".to_string()),
                ("Second Window", "09:00".to_string()),
                ("Early", "08:00".to_string()),
            ]
        );
    }

    #[test]
    fn upcoming_truncated_with_overflow_count() {
        let events: Vec<_> = (0..15)
            .map(|i| {
                let start = format!("{:02}:00", 8 + i);
                let end = format!("{:02}:30", 8 + i);
                event(&format!("Event {i}"), &[(start.as_str(), end.as_str())])
            })
            .collect();
        let result = classify(at(7, 0), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(result.upcoming.len(), 9);
        assert_eq!(result.upcoming_overflow, 6);
        assert_eq!(result.upcoming[0].name, "Event 0");
        assert_eq!(result.upcoming[8].name, "Event 8");
    }

    #[test]
    fn no_overflow_under_limit() {
        let events = [event("Solo", &[("10:00", "11:00")])];
        let result = classify(at(7, 0), &events, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(result.upcoming_overflow, 0);
    }

    #[test]
    fn classification_is_idempotent() {
        let events = [
            event("Night Raid", &[("23:30", "00:30"), ("bad", "01:00")]),
            event("Harvester", &[("10:00", "11:00"), ("14:00", "15:00")]),
        ];
        let first = classify(at(10, 30), &events, DEFAULT_UPCOMING_LIMIT);
        let second = classify(at(10, 30), &events, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn malformed_window_is_isolated() {
        let mut events: Vec<_> = (0..9)
            .map(|i| {
                let start = format!("{:02}:00", 10 + i);
                let end = format!("{:02}:45", 10 + i);
                event(&format!("Event {i}"), &[(start.as_str(), end.as_str())])
            })
            .collect();
        events.insert(4, event("Broken", &[("ab:cd", "11:00")]));

        let result = classify(at(9, 0), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(result.active.len() + result.upcoming.len(), 9);
        assert_eq!(result.upcoming_overflow, 0);
        assert_eq!(result.failures.len(), 1);

        let failure = &result.failures[0];
        assert_eq!(failure.event, "Broken");
        assert_eq!(failure.window_index, 0);
        assert_eq!(failure.error, WindowError::InvalidFormat("ab:cd".to_string()));
    }

    #[test]
    fn bad_window_does_not_hide_siblings() {
        let events = [event("Mixed", &[("10:00", "11:00"), ("10:00", "99:00")])];
        let result = classify(at(10, 30), &events, DEFAULT_UPCOMING_LIMIT);

        assert_eq!(result.active.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].window_index, 1);
    }

    #[test]
    fn empty_feed_is_not_an_error() {
        let result = classify(at(10, 0), &[], DEFAULT_UPCOMING_LIMIT);
        assert!(result.is_empty());
        assert!(result.failures.is_empty());
    }

    #[test]
    fn serializes_status_inline() {
        let events = [event("Harvester", &[("10:00", "11:00")])];
        let result = classify(at(10, 30), &events, DEFAULT_UPCOMING_LIMIT);
        let json = serde_json::to_value(&result.active[0]).unwrap();

        assert_eq!(json["status"], "active");
        assert_eq!(json["map"], "dam");
        assert_eq!(json["start"], "10:00");
        assert_eq!(json["remaining"]["total_minutes"], 30);
        assert_eq!(json["remaining"]["label"], "30m");
    }
}
