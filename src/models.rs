use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ValidationError;

pub const DEADLINE_SENTINEL: &str = "No deadline provided";
pub const EMPTY_DESCRIPTION: &str = "No description available";

/// Stable identity of a program, derived from its content rather than its
/// position in the feed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramKey(String);

impl ProgramKey {
    pub fn from_content(title: &str, link: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.trim().as_bytes());
        hasher.update(b"::");
        hasher.update(link.trim().as_bytes());
        let bytes = hasher.finalize();
        let hex = format!("{bytes:x}");
        Self(hex[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One program from the YSWS feed after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub key: ProgramKey,
    pub title: String,
    pub link: String,
    /// Description HTML exactly as it appeared in the feed.
    pub raw_description: String,
    pub description: String,
    pub deadline: String,
    pub discussion_link: String,
    /// Snapshot taken at ingestion time; never refreshed by the countdown.
    pub is_passed: bool,
}

impl FeedItem {
    pub fn has_deadline(&self) -> bool {
        self.deadline != DEADLINE_SENTINEL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    /// City with blank strings treated as absent.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// One hackathon from the directory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: Location,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    Ended,
    InPerson,
    Online,
}

impl EventStatus {
    pub fn label(self) -> &'static str {
        match self {
            EventStatus::Ended => "Ended",
            EventStatus::InPerson => "In-person",
            EventStatus::Online => "Online",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub name: String,
    #[serde(default)]
    pub total_seconds: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub percent: f64,
}

/// Coding-time summary returned by Hackatime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub username: String,
    #[serde(default)]
    pub total_seconds: f64,
    #[serde(default)]
    pub human_readable_total: String,
    #[serde(default)]
    pub human_readable_daily_average: String,
    #[serde(default)]
    pub languages: Vec<LanguageStat>,
}

/// Identifier of a Hackatime user, validated before it is stored or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(String);

impl UserId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@');
        if trimmed.len() > 64 || !trimmed.chars().all(allowed) {
            return Err(ValidationError::InvalidUserId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses the `YYYY-MM-DD` start date accepted by the stats endpoint.
pub fn parse_start_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(input.trim().to_string()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(i64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(s) => s,
        Repr::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_key_ignores_position_and_whitespace() {
        let a = ProgramKey::from_content("Sprig", "https://sprig.hackclub.com");
        let b = ProgramKey::from_content(" Sprig ", "https://sprig.hackclub.com\n");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);

        let other = ProgramKey::from_content("Sprig", "https://other.example");
        assert_ne!(a, other);
    }

    #[test]
    fn user_id_validation() {
        assert_eq!(UserId::parse("   "), Err(ValidationError::EmptyUserId));
        assert!(matches!(
            UserId::parse("abc/def"),
            Err(ValidationError::InvalidUserId(_))
        ));
        assert!(matches!(
            UserId::parse("has space"),
            Err(ValidationError::InvalidUserId(_))
        ));
        assert_eq!(UserId::parse(" U0123ABC ").unwrap().as_str(), "U0123ABC");
    }

    #[test]
    fn start_date_must_be_iso() {
        assert_eq!(
            parse_start_date("2025-02-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert_eq!(
            parse_start_date("02/01/2025"),
            Err(ValidationError::InvalidDate("02/01/2025".to_string()))
        );
    }

    #[test]
    fn event_item_accepts_numeric_id_and_missing_location() {
        let json = r#"{
            "id": 42,
            "name": "Hack Day",
            "starts_at": "2025-03-01T09:00:00Z",
            "ends_at": "2025-03-02T18:00:00Z"
        }"#;
        let event: EventItem = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "42");
        assert_eq!(event.location.city(), None);
        assert_eq!(event.website, None);

        let json = r#"{
            "id": "hkt_1",
            "name": "Null Location",
            "starts_at": "2025-03-01T09:00:00Z",
            "ends_at": "2025-03-02T18:00:00Z",
            "location": null
        }"#;
        let event: EventItem = serde_json::from_str(json).unwrap();
        assert_eq!(event.location, Location::default());
    }

    #[test]
    fn blank_city_counts_as_absent() {
        let location = Location {
            city: Some("  ".to_string()),
            country: Some("DE".to_string()),
        };
        assert_eq!(location.city(), None);
        assert_eq!(location.country(), Some("DE"));
    }
}
