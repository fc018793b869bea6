//! Phase history viewer
//!
//! History is fetched when the viewer is opened for a phase and cached
//! until it is closed. Responses for a viewer that has been closed or moved
//! to another phase are discarded.

use chrono::{DateTime, Utc};
use phaseview_core::domain::state::State;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::Action;
use crate::repository::{HistoryRepository, user_message};
use crate::sync::{SyncSequencer, Ticket};

/// Digests are shown truncated to this many characters
const SHORT_DIGEST_LEN: usize = 30;

/// Answer to a history fetch
#[derive(Debug)]
pub struct HistoryOutcome {
    pub ticket: Ticket,
    pub result: Result<Vec<State>, String>,
}

/// What happened to a history outcome
#[derive(Debug, PartialEq, Eq)]
pub enum HistoryUpdate {
    /// History loaded with this many entries
    Loaded(usize),
    Failed(String),
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryStatus {
    Loading,
    Loaded(Vec<State>),
    Failed(String),
}

struct HistoryView {
    pipeline: String,
    phase: String,
    status: HistoryStatus,
}

/// One history entry prepared for display
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub index: usize,
    pub version: Uuid,
    pub digest: Option<String>,
    /// Relative to now, e.g. "5 minutes ago"
    pub recorded: String,
    /// Absolute time in UTC
    pub recorded_utc: String,
    /// Annotations sorted by key
    pub annotations: Vec<(String, String)>,
    /// Commit link, only for GitHub-hosted commits
    pub commit_url: Option<String>,
    pub is_current: bool,
    pub can_rollback: bool,
}

pub struct HistoryViewer {
    repository: Arc<dyn HistoryRepository>,
    sequencer: SyncSequencer,
    view: Option<HistoryView>,
    in_flight: Option<JoinHandle<()>>,
    outcomes: mpsc::UnboundedSender<HistoryOutcome>,
}

impl HistoryViewer {
    pub fn new(
        repository: Arc<dyn HistoryRepository>,
        outcomes: mpsc::UnboundedSender<HistoryOutcome>,
    ) -> Self {
        Self {
            repository,
            sequencer: SyncSequencer::new(),
            view: None,
            in_flight: None,
            outcomes,
        }
    }

    /// Opens the viewer on a phase
    ///
    /// Reopening the phase already shown keeps its cached history unless
    /// the last fetch failed. Returns whether a fetch was started.
    pub fn open(&mut self, pipeline: &str, phase: &str) -> bool {
        let cached = self.view.as_ref().is_some_and(|view| {
            view.pipeline == pipeline
                && view.phase == phase
                && !matches!(view.status, HistoryStatus::Failed(_))
        });
        if cached {
            return false;
        }

        self.reset();
        let ticket = self.sequencer.issue();
        let repository = Arc::clone(&self.repository);
        let outcomes = self.outcomes.clone();
        let (p, f) = (pipeline.to_string(), phase.to_string());

        debug!("Fetching history of {}/{}", pipeline, phase);
        self.in_flight = Some(tokio::spawn(async move {
            let result = repository
                .phase_history(&p, &f)
                .await
                .map_err(|e| user_message(&e));
            let _ = outcomes.send(HistoryOutcome { ticket, result });
        }));

        self.view = Some(HistoryView {
            pipeline: pipeline.to_string(),
            phase: phase.to_string(),
            status: HistoryStatus::Loading,
        });
        true
    }

    /// Closes the viewer and drops its cache
    pub fn close(&mut self) {
        self.reset();
    }

    /// Applies a fetch outcome if it belongs to the open view
    pub fn load(&mut self, outcome: HistoryOutcome) -> HistoryUpdate {
        let Some(view) = self.view.as_mut() else {
            return HistoryUpdate::Discarded;
        };
        if !self.sequencer.accept(outcome.ticket) {
            debug!("Discarding stale history (seq {})", outcome.ticket.seq);
            return HistoryUpdate::Discarded;
        }

        self.in_flight = None;
        match outcome.result {
            Ok(states) => {
                let count = states.len();
                view.status = HistoryStatus::Loaded(states);
                HistoryUpdate::Loaded(count)
            }
            Err(message) => {
                warn!("History fetch failed: {}", message);
                view.status = HistoryStatus::Failed(message.clone());
                HistoryUpdate::Failed(message)
            }
        }
    }

    /// Pipeline and phase the viewer is open on
    pub fn target(&self) -> Option<(&str, &str)> {
        self.view
            .as_ref()
            .map(|v| (v.pipeline.as_str(), v.phase.as_str()))
    }

    pub fn is_open_on(&self, pipeline: &str, phase: &str) -> bool {
        self.target() == Some((pipeline, phase))
    }

    pub fn status(&self) -> Option<&HistoryStatus> {
        self.view.as_ref().map(|v| &v.status)
    }

    fn states(&self) -> &[State] {
        match self.status() {
            Some(HistoryStatus::Loaded(states)) => states,
            _ => &[],
        }
    }

    /// The recorded state at `index`, newest first
    pub fn state(&self, index: usize) -> Option<&State> {
        self.states().get(index)
    }

    /// Loaded entries prepared for display
    pub fn entries(&self, now: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.states()
            .iter()
            .enumerate()
            .map(|(index, state)| entry(index, state, now))
            .collect()
    }

    /// Rollback to the entry at `index`
    ///
    /// `None` for the current entry (index 0) and for indices past the end.
    pub fn rollback_action(&self, index: usize) -> Option<Action> {
        if index == 0 {
            return None;
        }
        let (pipeline, phase) = self.target()?;
        let state = self.state(index)?;

        Some(Action::Rollback {
            pipeline: pipeline.to_string(),
            phase: phase.to_string(),
            index,
            version: state.version,
            digest: state.digest.clone(),
        })
    }

    fn reset(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.sequencer.retarget();
        self.view = None;
    }
}

fn entry(index: usize, state: &State, now: DateTime<Utc>) -> HistoryEntry {
    let mut annotations: Vec<(String, String)> = state
        .annotations
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    annotations.sort();

    HistoryEntry {
        index,
        version: state.version,
        digest: state
            .digest
            .as_ref()
            .map(|d| d.chars().take(SHORT_DIGEST_LEN).collect()),
        recorded: relative_time(state.recorded_at, now),
        recorded_utc: utc_string(state.recorded_at),
        annotations,
        commit_url: state
            .commit_url()
            .filter(|url| url.starts_with("https://github.com"))
            .map(str::to_string),
        is_current: index == 0,
        can_rollback: index > 0,
    }
}

/// Formats a timestamp like an HTTP date, e.g. "Wed, 01 May 2024 12:00:00 GMT"
pub fn utc_string(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Describes the distance between two instants in words
///
/// "5 minutes ago", "about 2 hours ago", "in 3 days".
pub fn relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - time).num_seconds();
    let distance = distance_in_words(seconds.unsigned_abs());

    if seconds >= 0 {
        format!("{} ago", distance)
    } else {
        format!("in {}", distance)
    }
}

fn distance_in_words(seconds: u64) -> String {
    const MINUTES_IN_DAY: u64 = 1440;
    const MINUTES_IN_MONTH: u64 = 43_200;

    let minutes = (seconds + 30) / 60;

    match minutes {
        _ if seconds < 30 => "less than a minute".to_string(),
        0..=1 => "1 minute".to_string(),
        2..=44 => format!("{} minutes", minutes),
        45..=89 => "about 1 hour".to_string(),
        90..=1439 => format!("about {} hours", (minutes + 30) / 60),
        1440..=2519 => "1 day".to_string(),
        2520..=43_199 => format!("{} days", (minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY),
        43_200..=86_399 => {
            let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
            format!("about {} month{}", months, if months == 1 { "" } else { "s" })
        }
        _ => {
            let months = minutes / MINUTES_IN_MONTH;
            if months < 12 {
                return format!("{} months", months);
            }
            let (years, rest) = (months / 12, months % 12);
            let plural = |n: u64| if n == 1 { "" } else { "s" };
            match rest {
                0..=2 => format!("about {} year{}", years, plural(years)),
                3..=8 => format!("over {} year{}", years, plural(years)),
                _ => format!("almost {} years", years + 1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use phaseview_core::domain::annotations;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedHistory {
        states: Vec<State>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HistoryRepository for FixedHistory {
        async fn phase_history(&self, _: &str, _: &str) -> Result<Vec<State>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.states.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    fn state(digest: &str, minutes_ago: i64) -> State {
        State {
            version: Uuid::new_v4(),
            digest: Some(digest.to_string()),
            recorded_at: now() - Duration::minutes(minutes_ago),
            annotations: HashMap::new(),
            resource: None,
        }
    }

    fn setup(
        states: Vec<State>,
    ) -> (
        Arc<FixedHistory>,
        HistoryViewer,
        mpsc::UnboundedReceiver<HistoryOutcome>,
    ) {
        let repository = Arc::new(FixedHistory {
            states,
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let viewer = HistoryViewer::new(repository.clone(), tx);
        (repository, viewer, rx)
    }

    #[tokio::test]
    async fn test_open_fetches_once_and_caches() {
        let (repository, mut viewer, mut rx) =
            setup(vec![state("sha256:2", 5), state("sha256:1", 120)]);

        assert_eq!(viewer.status(), None);
        assert!(viewer.open("payments", "B"));
        assert_eq!(viewer.status(), Some(&HistoryStatus::Loading));

        let outcome = rx.recv().await.unwrap();
        assert_eq!(viewer.load(outcome), HistoryUpdate::Loaded(2));

        assert!(!viewer.open("payments", "B"));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);

        viewer.close();
        assert_eq!(viewer.target(), None);
        assert!(viewer.open("payments", "B"));
    }

    #[tokio::test]
    async fn test_entries_for_display() {
        let long = format!("sha256:{}", "a".repeat(64));
        let mut current = state(&long, 5);
        current.annotations.insert(
            annotations::GIT_COMMIT_URL.to_string(),
            "https://github.com/acme/app/commit/abc".to_string(),
        );
        let mut previous = state("sha256:1", 120);
        previous.annotations.insert(
            annotations::GIT_COMMIT_URL.to_string(),
            "https://gitlab.com/acme/app/-/commit/def".to_string(),
        );

        let (_repository, mut viewer, mut rx) = setup(vec![current, previous]);
        viewer.open("payments", "B");
        viewer.load(rx.recv().await.unwrap());

        let entries = viewer.entries(now());
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].digest.as_deref().map(str::len), Some(30));
        assert_eq!(entries[0].recorded, "5 minutes ago");
        assert_eq!(entries[0].recorded_utc, "Thu, 02 May 2024 11:55:00 GMT");
        assert_eq!(
            entries[0].commit_url.as_deref(),
            Some("https://github.com/acme/app/commit/abc")
        );
        assert!(entries[0].is_current);
        assert!(!entries[0].can_rollback);

        assert_eq!(entries[1].recorded, "about 2 hours ago");
        assert_eq!(entries[1].commit_url, None);
        assert_eq!(entries[1].annotations.len(), 1);
        assert!(entries[1].can_rollback);
    }

    #[tokio::test]
    async fn test_rollback_never_offered_for_current() {
        let (_repository, mut viewer, mut rx) =
            setup(vec![state("sha256:2", 5), state("sha256:1", 120)]);
        viewer.open("payments", "B");
        viewer.load(rx.recv().await.unwrap());

        assert_eq!(viewer.rollback_action(0), None);
        assert_eq!(viewer.rollback_action(2), None);

        match viewer.rollback_action(1) {
            Some(Action::Rollback {
                pipeline,
                phase,
                index,
                version,
                digest,
            }) => {
                assert_eq!((pipeline.as_str(), phase.as_str(), index), ("payments", "B", 1));
                assert_eq!(version, viewer.state(1).unwrap().version);
                assert_eq!(digest.as_deref(), Some("sha256:1"));
            }
            other => panic!("Expected rollback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_history_is_valid() {
        let (_repository, mut viewer, mut rx) = setup(Vec::new());
        viewer.open("payments", "A");

        assert_eq!(viewer.load(rx.recv().await.unwrap()), HistoryUpdate::Loaded(0));
        assert!(viewer.entries(now()).is_empty());
        assert_eq!(viewer.rollback_action(1), None);
    }

    #[tokio::test]
    async fn test_response_for_other_phase_is_discarded() {
        let (_repository, mut viewer, mut rx) = setup(vec![state("sha256:2", 5)]);

        viewer.open("payments", "A");
        let stale = HistoryOutcome {
            ticket: Ticket {
                generation: 1,
                seq: 1,
            },
            result: Ok(vec![state("sha256:9", 1)]),
        };
        viewer.open("payments", "B");

        assert_eq!(viewer.load(stale), HistoryUpdate::Discarded);
        assert_eq!(viewer.status(), Some(&HistoryStatus::Loading));

        let fresh = rx.recv().await.unwrap();
        assert_eq!(viewer.load(fresh), HistoryUpdate::Loaded(1));

        viewer.close();
        let late = HistoryOutcome {
            ticket: Ticket {
                generation: 2,
                seq: 2,
            },
            result: Ok(Vec::new()),
        };
        assert_eq!(viewer.load(late), HistoryUpdate::Discarded);
    }

    #[test]
    fn test_relative_time() {
        let at = |seconds: i64| relative_time(now() - Duration::seconds(seconds), now());

        assert_eq!(at(10), "less than a minute ago");
        assert_eq!(at(60), "1 minute ago");
        assert_eq!(at(5 * 60), "5 minutes ago");
        assert_eq!(at(60 * 60), "about 1 hour ago");
        assert_eq!(at(5 * 3600), "about 5 hours ago");
        assert_eq!(at(30 * 3600), "1 day ago");
        assert_eq!(at(3 * 86_400), "3 days ago");
        assert_eq!(at(40 * 86_400), "about 1 month ago");
        assert_eq!(at(100 * 86_400), "3 months ago");
        assert_eq!(at(400 * 86_400), "about 1 year ago");
        assert_eq!(at(-120), "in 2 minutes");
    }
}
