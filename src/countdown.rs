use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::classify::{parse_deadline, ProgramBoard};
use crate::models::ProgramKey;

pub const TICK: std::time::Duration = std::time::Duration::from_secs(1);

/// Remaining-time strings keyed by program. Recomputed, never stored.
pub type Countdowns = BTreeMap<ProgramKey, String>;

/// Formats a positive remaining duration; `None` once nothing remains.
pub fn format_remaining(remaining: Duration) -> Option<String> {
    if remaining <= Duration::zero() {
        return None;
    }
    let total = remaining.num_seconds();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    Some(if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    })
}

/// Deadlines of the upcoming programs that have a date we can count towards.
pub fn countdown_targets(board: &ProgramBoard) -> Vec<(ProgramKey, DateTime<Utc>)> {
    board
        .upcoming
        .iter()
        .filter_map(|item| parse_deadline(&item.deadline).map(|at| (item.key.clone(), at)))
        .collect()
}

pub fn project(targets: &[(ProgramKey, DateTime<Utc>)], now: DateTime<Utc>) -> Countdowns {
    targets
        .iter()
        .filter_map(|(key, deadline)| format_remaining(*deadline - now).map(|text| (key.clone(), text)))
        .collect()
}

/// Periodic task that republishes the countdown projection once per tick.
/// Dropping the ticker stops the task.
pub struct CountdownTicker {
    handle: Option<JoinHandle<()>>,
    rx: watch::Receiver<Countdowns>,
}

impl CountdownTicker {
    /// Must be called from within a tokio runtime.
    pub fn start(targets: Vec<(ProgramKey, DateTime<Utc>)>) -> Self {
        let (tx, rx) = watch::channel(project(&targets, Utc::now()));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            loop {
                interval.tick().await;
                if tx.send(project(&targets, Utc::now())).is_err() {
                    debug!("countdown receiver gone, stopping ticker");
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
            rx,
        }
    }

    pub fn latest(&self) -> Countdowns {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Countdowns> {
        self.rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Aborts the task and waits for it to wind down.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::partition_programs;
    use crate::models::{FeedItem, DEADLINE_SENTINEL};
    use chrono::TimeZone;

    fn item(title: &str, deadline: &str, is_passed: bool) -> FeedItem {
        FeedItem {
            key: ProgramKey::from_content(title, "https://example.com"),
            title: title.to_string(),
            link: "https://example.com".to_string(),
            raw_description: String::new(),
            description: String::new(),
            deadline: deadline.to_string(),
            discussion_link: String::new(),
            is_passed,
        }
    }

    #[test]
    fn formats_by_magnitude() {
        assert_eq!(format_remaining(Duration::milliseconds(90_000)).as_deref(), Some("1m 30s"));
        assert_eq!(
            format_remaining(Duration::milliseconds(3_700_000)).as_deref(),
            Some("1h 1m 40s")
        );
        assert_eq!(
            format_remaining(Duration::seconds(86_400 + 3_600 + 61)).as_deref(),
            Some("1d 1h 1m 1s")
        );
        assert_eq!(format_remaining(Duration::seconds(59)).as_deref(), Some("0m 59s"));
    }

    #[test]
    fn non_positive_remaining_means_no_countdown() {
        assert_eq!(format_remaining(Duration::zero()), None);
        assert_eq!(format_remaining(Duration::seconds(-5)), None);
        assert_eq!(format_remaining(Duration::milliseconds(400)).as_deref(), Some("0m 0s"));
    }

    #[test]
    fn projection_skips_sentinel_passed_and_expired() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let board = partition_programs(vec![
            item("soon", "2025-01-02", false),
            item("none", DEADLINE_SENTINEL, false),
            item("gone", "2024-12-01", true),
            item("vague", "rolling", false),
        ]);
        let targets = countdown_targets(&board);
        assert_eq!(targets.len(), 1);

        let countdowns = project(&targets, now);
        assert_eq!(countdowns.len(), 1);
        assert_eq!(
            countdowns.get(&ProgramKey::from_content("soon", "https://example.com")).map(String::as_str),
            Some("1d 0h 0m 0s")
        );

        let later = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        assert!(project(&targets, later).is_empty());
    }

    #[test]
    fn projection_leaves_passed_flag_alone() {
        let board = partition_programs(vec![item("soon", "2025-01-02", false)]);
        let targets = countdown_targets(&board);
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(project(&targets, after).is_empty());
        assert!(!board.upcoming[0].is_passed);
    }

    #[tokio::test]
    async fn ticker_publishes_and_stops() {
        let key = ProgramKey::from_content("far", "https://example.com");
        let deadline = Utc::now() + Duration::days(30);
        let ticker = CountdownTicker::start(vec![(key.clone(), deadline)]);
        assert!(ticker.latest().contains_key(&key));

        let mut rx = ticker.subscribe();
        rx.changed().await.expect("ticker should publish");
        assert!(rx.borrow().get(&key).is_some_and(|text| text.starts_with("29d") || text.starts_with("30d")));

        assert!(ticker.is_running());
        ticker.stop().await;
        let drained = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(drained.is_ok(), "sender should be gone once the ticker stops");
    }

    #[tokio::test]
    async fn dropping_the_ticker_aborts_its_task() {
        let key = ProgramKey::from_content("far", "https://example.com");
        let ticker = CountdownTicker::start(vec![(key, Utc::now() + Duration::days(1))]);
        let mut rx = ticker.subscribe();

        drop(ticker);
        let drained = tokio::time::timeout(std::time::Duration::from_secs(3), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(drained.is_ok(), "dropping the ticker should end its task");
    }
}
