use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::FeedParseError;
use crate::models::{EventItem, EventStatus, FeedItem, ProgramKey, DEADLINE_SENTINEL};
use crate::parser::{parse_description, RawItem};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
    "%m/%d/%Y",
];

fn ordinal_regex() -> &'static Regex {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    ORDINAL.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("ordinal pattern is valid")
    })
}

/// Interprets a free-form deadline. Values without a time of day are taken
/// as midnight UTC; values without an offset are taken as UTC.
pub fn parse_deadline(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() || text == DEADLINE_SENTINEL {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = ordinal_regex().replace_all(text, "$1");
    let cleaned = cleaned
        .split_whitespace()
        .filter(|word| !word.eq_ignore_ascii_case("at"))
        .collect::<Vec<_>>()
        .join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Whether a deadline lies before `now`. Unparseable deadlines, including the
/// sentinel, are never passed.
pub fn is_deadline_passed(deadline: &str, now: DateTime<Utc>) -> bool {
    parse_deadline(deadline).is_some_and(|at| at < now)
}

/// Turns raw feed items into programs, fixing `is_passed` against `now`.
/// The first item whose description cannot be read fails the whole batch.
pub fn ingest_programs(raw: Vec<RawItem>, now: DateTime<Utc>) -> Result<Vec<FeedItem>, FeedParseError> {
    raw.into_iter()
        .map(|item| {
            let parsed = parse_description(&item.description).map_err(|err| FeedParseError::Html {
                item: item.title.clone(),
                reason: err.to_string(),
            })?;
            let is_passed = is_deadline_passed(&parsed.deadline, now);
            Ok(FeedItem {
                key: ProgramKey::from_content(&item.title, &item.link),
                title: item.title,
                link: item.link,
                raw_description: item.description,
                description: parsed.description,
                deadline: parsed.deadline,
                discussion_link: parsed.discussion_link,
                is_passed,
            })
        })
        .collect()
}

/// Programs grouped for display: upcoming first, then passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramBoard {
    pub upcoming: Vec<FeedItem>,
    pub passed: Vec<FeedItem>,
}

impl ProgramBoard {
    pub fn ordered(&self) -> impl Iterator<Item = &FeedItem> {
        self.upcoming.iter().chain(self.passed.iter())
    }

    pub fn get(&self, index: usize) -> Option<&FeedItem> {
        self.ordered().nth(index)
    }

    pub fn len(&self) -> usize {
        self.upcoming.len() + self.passed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable partition on the ingestion-time `is_passed` flag.
pub fn partition_programs(items: Vec<FeedItem>) -> ProgramBoard {
    let (passed, upcoming): (Vec<FeedItem>, Vec<FeedItem>) =
        items.into_iter().partition(|item| item.is_passed);
    ProgramBoard { upcoming, passed }
}

/// Status of a hackathon at `now`. Pure; callers recompute it on every render.
pub fn classify_status(
    now: DateTime<Utc>,
    _starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    city: Option<&str>,
) -> EventStatus {
    if ends_at < now {
        EventStatus::Ended
    } else if city.is_some_and(|c| !c.trim().is_empty()) {
        EventStatus::InPerson
    } else {
        EventStatus::Online
    }
}

pub fn event_status(event: &EventItem, now: DateTime<Utc>) -> EventStatus {
    classify_status(now, event.starts_at, event.ends_at, event.location.city())
}

/// Case-insensitive substring match on the event's city. An empty query keeps
/// everything; events without a city only survive an empty query.
pub fn filter_by_city<'a>(events: &'a [EventItem], query: &str) -> Vec<&'a EventItem> {
    let query = query.trim().to_lowercase();
    events
        .iter()
        .filter(|event| {
            query.is_empty()
                || event
                    .location
                    .city()
                    .is_some_and(|city| city.to_lowercase().contains(&query))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn program(title: &str, is_passed: bool) -> FeedItem {
        FeedItem {
            key: ProgramKey::from_content(title, "https://example.com"),
            title: title.to_string(),
            link: "https://example.com".to_string(),
            raw_description: String::new(),
            description: String::new(),
            deadline: DEADLINE_SENTINEL.to_string(),
            discussion_link: String::new(),
            is_passed,
        }
    }

    fn event(name: &str, city: Option<&str>) -> EventItem {
        EventItem {
            id: name.to_lowercase(),
            name: name.to_string(),
            starts_at: utc(2025, 6, 1),
            ends_at: utc(2025, 6, 2),
            location: Location {
                city: city.map(String::from),
                country: None,
            },
            logo_url: None,
            website: None,
        }
    }

    #[test]
    fn parses_common_deadline_shapes() {
        assert_eq!(parse_deadline("2025-01-01"), Some(utc(2025, 1, 1)));
        assert_eq!(parse_deadline("March 31, 2025"), Some(utc(2025, 3, 31)));
        assert_eq!(parse_deadline("Mar 31 2025"), Some(utc(2025, 3, 31)));
        assert_eq!(parse_deadline("1st June 2025"), Some(utc(2025, 6, 1)));
        assert_eq!(parse_deadline("June 2nd, 2025"), Some(utc(2025, 6, 2)));
        assert_eq!(parse_deadline("03/31/2025"), Some(utc(2025, 3, 31)));
        assert_eq!(
            parse_deadline("2025-01-01T12:30:00-05:00"),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 17, 30, 0).unwrap())
        );
        assert_eq!(
            parse_deadline("March 31, 2025 at 11:59 PM"),
            Some(Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 0).unwrap())
        );
        assert_eq!(parse_deadline("whenever"), None);
        assert_eq!(parse_deadline(DEADLINE_SENTINEL), None);
    }

    #[test]
    fn sentinel_is_never_passed() {
        for now in [utc(1970, 1, 1), utc(2025, 1, 1), utc(2999, 12, 31)] {
            assert!(!is_deadline_passed(DEADLINE_SENTINEL, now));
        }
    }

    #[test]
    fn unparseable_deadline_fails_open() {
        assert!(!is_deadline_passed("until funds run out", utc(2999, 1, 1)));
    }

    #[test]
    fn deadline_comparison() {
        let now = utc(2025, 2, 1);
        assert!(is_deadline_passed("2025-01-01", now));
        assert!(!is_deadline_passed("2025-03-01", now));
    }

    #[test]
    fn ingest_computes_keys_and_passed_flag() {
        let raw = vec![
            RawItem {
                title: "Old".to_string(),
                link: "https://old.example".to_string(),
                description: "<p><strong>Deadline:</strong> 2024-01-01</p>".to_string(),
            },
            RawItem {
                title: "Open".to_string(),
                link: "https://open.example".to_string(),
                description: "<p>No date here</p>".to_string(),
            },
        ];
        let items = ingest_programs(raw, utc(2025, 1, 1)).unwrap();
        assert!(items[0].is_passed);
        assert_eq!(items[0].deadline, "2024-01-01");
        assert!(!items[1].is_passed);
        assert!(!items[1].has_deadline());
        assert_eq!(items[1].key, ProgramKey::from_content("Open", "https://open.example"));
    }

    #[test]
    fn sloppy_description_html_keeps_the_batch() {
        let raw = vec![
            RawItem {
                title: "Fine".to_string(),
                link: "https://fine.example".to_string(),
                description: "<p>ok</p>".to_string(),
            },
            RawItem {
                title: "Sloppy".to_string(),
                link: "https://sloppy.example".to_string(),
                description: "<p>x<y and z</p><p><a href=https://s.example/?a=1>chat</a><p><b>Deadline:</b> 2030-01-01"
                    .to_string(),
            },
        ];
        let items = ingest_programs(raw, utc(2025, 1, 1)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].deadline, "2030-01-01");
        assert_eq!(items[1].discussion_link, "https://s.example/?a=1");
        assert!(!items[1].is_passed);
    }

    #[test]
    fn partition_is_stable() {
        let items = vec![
            program("A", false),
            program("X", true),
            program("B", false),
            program("Y", true),
            program("C", false),
        ];
        let board = partition_programs(items);
        let titles: Vec<_> = board.ordered().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C", "X", "Y"]);
        assert_eq!(board.len(), 5);
        assert_eq!(board.get(3).map(|p| p.title.as_str()), Some("X"));
    }

    #[test]
    fn classify_status_rules() {
        let now = utc(2025, 6, 10);
        let start = now - Duration::days(3);
        assert_eq!(
            classify_status(now, start, now - Duration::days(1), Some("Berlin")),
            EventStatus::Ended
        );
        assert_eq!(
            classify_status(now, start, now + Duration::days(1), Some("Berlin")),
            EventStatus::InPerson
        );
        assert_eq!(
            classify_status(now, start, now + Duration::days(1), None),
            EventStatus::Online
        );
        assert_eq!(
            classify_status(now, start, now + Duration::days(1), Some("")),
            EventStatus::Online
        );
    }

    #[test]
    fn classify_status_is_pure() {
        let now = utc(2025, 6, 10);
        let ends = now + Duration::hours(5);
        let first = classify_status(now, now, ends, Some("Austin"));
        for _ in 0..10 {
            assert_eq!(classify_status(now, now, ends, Some("Austin")), first);
        }
    }

    #[test]
    fn city_filter() {
        let events = vec![
            event("Bay Hacks", Some("San Francisco")),
            event("Spree", Some("Berlin")),
            event("Remote Jam", None),
        ];

        assert_eq!(filter_by_city(&events, "").len(), 3);

        let matched: Vec<_> = filter_by_city(&events, "San")
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(matched, ["Bay Hacks"]);

        let matched: Vec<_> = filter_by_city(&events, "sAN fr")
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(matched, ["Bay Hacks"]);
    }
}
