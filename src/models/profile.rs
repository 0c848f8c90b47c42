//! Participant profile model.

use serde::{Deserialize, Serialize};

use super::{EventKey, SessionKey};

/// Apparel size preference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

impl TeeShirtSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeeShirtSize::NotSpecified => "NOT_SPECIFIED",
            TeeShirtSize::XsM => "XS_M",
            TeeShirtSize::XsW => "XS_W",
            TeeShirtSize::SM => "S_M",
            TeeShirtSize::SW => "S_W",
            TeeShirtSize::MM => "M_M",
            TeeShirtSize::MW => "M_W",
            TeeShirtSize::LM => "L_M",
            TeeShirtSize::LW => "L_W",
            TeeShirtSize::XlM => "XL_M",
            TeeShirtSize::XlW => "XL_W",
            TeeShirtSize::XxlM => "XXL_M",
            TeeShirtSize::XxlW => "XXL_W",
            TeeShirtSize::XxxlM => "XXXL_M",
            TeeShirtSize::XxxlW => "XXXL_W",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_SPECIFIED" => Some(TeeShirtSize::NotSpecified),
            "XS_M" => Some(TeeShirtSize::XsM),
            "XS_W" => Some(TeeShirtSize::XsW),
            "S_M" => Some(TeeShirtSize::SM),
            "S_W" => Some(TeeShirtSize::SW),
            "M_M" => Some(TeeShirtSize::MM),
            "M_W" => Some(TeeShirtSize::MW),
            "L_M" => Some(TeeShirtSize::LM),
            "L_W" => Some(TeeShirtSize::LW),
            "XL_M" => Some(TeeShirtSize::XlM),
            "XL_W" => Some(TeeShirtSize::XlW),
            "XXL_M" => Some(TeeShirtSize::XxlM),
            "XXL_W" => Some(TeeShirtSize::XxlW),
            "XXXL_M" => Some(TeeShirtSize::XxxlM),
            "XXXL_W" => Some(TeeShirtSize::XxxlW),
            _ => None,
        }
    }
}

/// One profile per authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    /// Events the user registered for, in registration order.
    pub conference_keys_to_attend: Vec<EventKey>,
    /// Wishlisted sessions; never contains duplicates.
    pub session_wishlist_keys: Vec<SessionKey>,
}

/// Request body for saving the user-editable profile fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tee_shirt_size: Option<TeeShirtSize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_as_str() {
        for size in [
            TeeShirtSize::NotSpecified,
            TeeShirtSize::XsW,
            TeeShirtSize::MM,
            TeeShirtSize::XxxlM,
        ] {
            let json = serde_json::to_string(&size).unwrap();
            assert_eq!(json, format!("\"{}\"", size.as_str()));
            assert_eq!(TeeShirtSize::parse(size.as_str()), Some(size));
        }
    }

    #[test]
    fn test_unknown_size() {
        assert_eq!(TeeShirtSize::parse("XXXXL_M"), None);
    }
}
