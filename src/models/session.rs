//! Session model: a scheduled talk inside an event.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{EventKey, SessionKey};

pub const DEFAULT_HIGHLIGHTS: &str = "Default";
pub const DEFAULT_LOCATION: &str = "Default";

/// Placeholder date for sessions created without one.
pub fn default_session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}

/// A session of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub websafe_key: SessionKey,
    pub websafe_conference_key: EventKey,
    pub name: String,
    pub highlights: String,
    pub location: String,
    pub typeof_session: Vec<String>,
    pub speakers: Vec<String>,
    pub start_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub max_attendees: i32,
    pub seats_available: i32,
}

/// Request body for creating a session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub highlights: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub typeof_session: Vec<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub max_attendees: Option<i32>,
}

/// Parse `HH:MM`, also accepting `HH:MM:SS`.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serde adapter for times on the wire and in the store: `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).ok_or_else(|| D::Error::custom(format!("invalid time: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error, Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::super::parse_hhmm(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time: {}", raw))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_hhmm("19:00:00"), NaiveTime::from_hms_opt(19, 0, 0));
        assert_eq!(parse_hhmm("7pm"), None);
    }

    #[test]
    fn test_create_request_accepts_short_times() {
        let request: CreateSessionRequest = serde_json::from_str(
            r#"{"name": "Intro", "startTime": "10:15", "speakers": ["Ada"]}"#,
        )
        .unwrap();
        assert_eq!(request.start_time, NaiveTime::from_hms_opt(10, 15, 0));
        assert!(request.end_time.is_none());
        assert_eq!(request.speakers, vec!["Ada"]);
    }
}
