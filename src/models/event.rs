//! Event (conference) model.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::EventKey;

pub const DEFAULT_CITY: &str = "Default City";
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// A capacity-limited event users register attendance for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub websafe_key: EventKey,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub organizer_user_id: String,
    pub topics: Vec<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Month of the start date, 0 when there is none.
    pub month: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub max_attendees: i32,
    pub seats_available: i32,
    /// Filled in on read paths from the organizer's profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_display_name: Option<String>,
}

/// Request body for creating a new event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_attendees: Option<i32>,
}

impl CreateEventRequest {
    /// Topics with the default list substituted for a missing or empty one.
    pub fn topics_or_default(&self) -> Vec<String> {
        match &self.topics {
            Some(topics) if !topics.is_empty() => topics.clone(),
            _ => DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn city_or_default(&self) -> String {
        self.city
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CITY)
            .to_string()
    }
}

/// Request body for updating an existing event; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_attendees: Option<i32>,
}

/// Month number used by the month filter; 0 when the event has no start date.
pub fn month_of(start_date: Option<NaiveDate>) -> i32 {
    start_date.map(|d| d.month() as i32).unwrap_or(0)
}

/// Seats after a capacity change, shifted by the same delta and kept in `[0, new_max]`.
pub fn rebalance_seats(seats_available: i32, old_max: i32, new_max: i32) -> i32 {
    (seats_available + (new_max - old_max)).clamp(0, new_max.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_of() {
        assert_eq!(month_of(NaiveDate::from_ymd_opt(2026, 6, 3)), 6);
        assert_eq!(month_of(None), 0);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let request = CreateEventRequest {
            name: "RustConf".to_string(),
            topics: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(request.topics_or_default(), vec!["Default", "Topic"]);
        assert_eq!(request.city_or_default(), DEFAULT_CITY);
    }

    #[test]
    fn test_rebalance_seats() {
        // 10 seats, 4 taken -> capacity raised to 20 keeps 4 taken
        assert_eq!(rebalance_seats(6, 10, 20), 16);
        // capacity lowered below the taken count bottoms out at zero
        assert_eq!(rebalance_seats(6, 10, 3), 0);
        assert_eq!(rebalance_seats(10, 10, 10), 10);
    }
}
