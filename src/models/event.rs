use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Top-level shape of the event-timer feed: `{ "data": [ ... ] }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventFeed {
    #[serde(default)]
    pub data: Vec<EventDefinition>,
}

#[derive(Deserialize)]
struct RawFeed {
    #[serde(default)]
    data: Vec<Value>,
}

impl EventFeed {
    /// Decode a feed document one event at a time.
    ///
    /// Only a document that is not `{ "data": [...] }` is an error. An entry
    /// that is not an event object is logged and skipped; bad windows inside
    /// an event are kept for the classifier to report.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawFeed = serde_json::from_slice(bytes)?;

        let mut data = Vec::with_capacity(raw.data.len());
        for (index, entry) in raw.data.into_iter().enumerate() {
            match serde_json::from_value::<EventDefinition>(entry) {
                Ok(event) => data.push(event),
                Err(e) => tracing::warn!("Skipping malformed event #{} in feed: {}", index, e),
            }
        }

        Ok(Self { data })
    }
}

/// A named event that recurs daily in one or more windows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventDefinition {
    #[serde(default)]
    pub name: String,
    /// Identifier of the map the event runs on.
    #[serde(rename = "map", default)]
    pub map_name: String,
    /// Daily windows as received. Times stay unparsed here so that one bad
    /// entry can be reported without rejecting the whole feed.
    #[serde(rename = "times", default, deserialize_with = "null_as_empty")]
    pub daily_windows: Vec<WindowSpec>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<WindowSpec>, D::Error> {
    Ok(Option::<Vec<WindowSpec>>::deserialize(d)?.unwrap_or_default())
}

/// Raw `{ "start": "HH:MM", "end": "HH:MM" }` pair.
///
/// Decoding never fails: a non-string time keeps its JSON text and a missing
/// one is empty, so time-of-day parsing rejects it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSpec {
    pub start: String,
    pub end: String,
}

impl<'de> Deserialize<'de> for WindowSpec {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let window = Value::deserialize(d)?;
        Ok(Self {
            start: field_text(&window, "start"),
            end: field_text(&window, "end"),
        })
    }
}

fn field_text(window: &Value, field: &str) -> String {
    match window.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl WindowSpec {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidFormat(String),

    #[error("time of day {0:?} is out of range")]
    OutOfRange(String),
}

/// A time of day with minute resolution.
///
/// `24:00` is accepted as the end-of-day marker and converts to minute 1440.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        let valid = (hour < 24 && minute < 60) || (hour == 24 && minute == 0);
        valid.then_some(Self { hour, minute })
    }

    /// Minutes since midnight, `0..=1440`.
    pub fn minutes(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (h, m) = trimmed
            .split_once(':')
            .ok_or_else(|| WindowError::InvalidFormat(s.to_string()))?;

        // Only plain digits: "+1", "1.5" and friends are rejected.
        let numeric = |part: &str| {
            !part.is_empty() && part.len() <= 2 && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !numeric(h) || m.len() != 2 || !numeric(m) {
            return Err(WindowError::InvalidFormat(s.to_string()));
        }

        let hour: u8 = h
            .parse()
            .map_err(|_| WindowError::InvalidFormat(s.to_string()))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| WindowError::InvalidFormat(s.to_string()))?;

        TimeOfDay::new(hour, minute).ok_or_else(|| WindowError::OutOfRange(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Current wall-clock time as minutes since local midnight (`0..=1439`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WallClockMinutes(u16);

impl WallClockMinutes {
    pub fn new(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Self::new(u16::from(hour) * 60 + u16::from(minute))
    }

    pub fn from_time<T: chrono::Timelike>(time: &T) -> Self {
        // hour() < 24 and minute() < 60 always hold for chrono times
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for WallClockMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// A span of whole minutes, shown as hours and minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteSpan(u16);

impl MinuteSpan {
    pub fn new(minutes: u16) -> Self {
        Self(minutes)
    }

    pub fn total_minutes(&self) -> u16 {
        self.0
    }

    pub fn hours(&self) -> u16 {
        self.0 / 60
    }

    pub fn minutes(&self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for MinuteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hours(), self.minutes()) {
            (0, m) => write!(f, "{}m", m),
            (h, 0) => write!(f, "{}h", h),
            (h, m) => write!(f, "{}h {}m", h, m),
        }
    }
}

impl Serialize for MinuteSpan {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("MinuteSpan", 4)?;
        s.serialize_field("total_minutes", &self.total_minutes())?;
        s.serialize_field("hours", &self.hours())?;
        s.serialize_field("minutes", &self.minutes())?;
        s.serialize_field("label", &self.to_string())?;
        s.end()
    }
}
