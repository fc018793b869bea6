//! Live sync controller
//!
//! Polls the engine for the viewed pipelines. Fetches run as independent
//! tasks and report back through a channel, so a hung request never delays
//! the next tick.

use phaseview_core::domain::pipeline::Pipeline;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::sequencer::{SyncSequencer, Ticket};
use crate::repository::{PipelineRepository, user_message};

/// Fetches allowed to run at once; ticks beyond this are skipped
pub const MAX_IN_FLIGHT: usize = 4;

/// What the console is looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewTarget {
    /// Every pipeline, each in its own group
    All,
    /// A single pipeline by name
    Pipeline(String),
}

impl fmt::Display for ViewTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewTarget::All => write!(f, "all pipelines"),
            ViewTarget::Pipeline(name) => write!(f, "pipeline {}", name),
        }
    }
}

/// Result of one fetch, stamped with the ticket it was issued under
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: Ticket,
    pub result: Result<Vec<Pipeline>, String>,
}

/// What the caller should do with a fetch outcome
#[derive(Debug, PartialEq)]
pub enum SyncUpdate {
    /// Fresh pipelines to reconcile into the store
    Applied(Vec<Pipeline>),
    /// The fetch failed; polling continues
    Failed(String),
    /// The outcome is stale and must not be applied
    Discarded,
}

/// Polling controller for the viewed pipelines
pub struct LiveSync {
    repository: Arc<dyn PipelineRepository>,
    target: Option<ViewTarget>,
    sequencer: SyncSequencer,
    in_flight: JoinSet<()>,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
}

impl LiveSync {
    /// Creates a stopped controller reporting to `outcomes`
    pub fn new(
        repository: Arc<dyn PipelineRepository>,
        outcomes: mpsc::UnboundedSender<FetchOutcome>,
    ) -> Self {
        Self {
            repository,
            target: None,
            sequencer: SyncSequencer::new(),
            in_flight: JoinSet::new(),
            outcomes,
        }
    }

    pub fn target(&self) -> Option<&ViewTarget> {
        self.target.as_ref()
    }

    /// Switches the view, dropping everything fetched for the old one
    pub fn set_view(&mut self, target: ViewTarget) {
        info!("Viewing {}", target);
        self.invalidate();
        self.target = Some(target);
    }

    /// Stops polling; outstanding fetches are aborted and their results ignored
    pub fn stop(&mut self) {
        debug!("Stopping live sync");
        self.invalidate();
        self.target = None;
    }

    /// Starts one fetch of the current view
    ///
    /// Does not wait for fetches started by earlier ticks, but skips the
    /// tick while [`MAX_IN_FLIGHT`] of them are still running. Returns the
    /// ticket of the new fetch, or `None` when stopped or skipped.
    pub fn tick(&mut self) -> Option<Ticket> {
        let target = self.target.clone()?;

        // Reap finished tasks so the set only holds live fetches
        while self.in_flight.try_join_next().is_some() {}

        if self.in_flight.len() >= MAX_IN_FLIGHT {
            warn!(
                "Skipping fetch of {}: {} fetches still running",
                target,
                self.in_flight.len()
            );
            return None;
        }

        let ticket = self.sequencer.issue();
        let repository = Arc::clone(&self.repository);
        let outcomes = self.outcomes.clone();

        debug!(
            "Fetching {} (seq {}, {} in flight)",
            target,
            ticket.seq,
            self.in_flight.len()
        );

        self.in_flight.spawn(async move {
            let result = match &target {
                ViewTarget::All => repository.list_pipelines().await,
                ViewTarget::Pipeline(name) => {
                    repository.get_pipeline(name).await.map(|p| vec![p])
                }
            };

            let result = result.map_err(|e| user_message(&e));
            // The receiver only goes away on shutdown
            let _ = outcomes.send(FetchOutcome { ticket, result });
        });

        Some(ticket)
    }

    /// Decides whether an outcome may be applied
    pub fn accept(&mut self, outcome: FetchOutcome) -> SyncUpdate {
        match outcome.result {
            Ok(pipelines) => {
                if self.sequencer.accept(outcome.ticket) {
                    SyncUpdate::Applied(pipelines)
                } else {
                    debug!("Discarding stale fetch (seq {})", outcome.ticket.seq);
                    SyncUpdate::Discarded
                }
            }
            Err(message) => {
                if self.sequencer.is_fresh(outcome.ticket) {
                    warn!("Fetch failed: {}", message);
                    SyncUpdate::Failed(message)
                } else {
                    debug!("Discarding stale failure (seq {})", outcome.ticket.seq);
                    SyncUpdate::Discarded
                }
            }
        }
    }

    /// Number of fetches still running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn invalidate(&mut self) {
        self.sequencer.retarget();
        self.in_flight.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use phaseview_core::domain::phase::Phase;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Repository whose fetches complete when the test says so
    #[derive(Default)]
    struct GatedRepository {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<Vec<Pipeline>>>>>,
    }

    impl GatedRepository {
        fn gate(&self) -> oneshot::Sender<Result<Vec<Pipeline>>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        async fn next(&self) -> Result<Vec<Pipeline>> {
            let gate = self.gates.lock().unwrap().pop_front().unwrap();
            gate.await.unwrap_or_else(|_| Ok(Vec::new()))
        }
    }

    #[async_trait]
    impl PipelineRepository for GatedRepository {
        async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
            self.next().await
        }

        async fn get_pipeline(&self, name: &str) -> Result<Pipeline> {
            let mut pipelines = self.next().await?;
            assert_eq!(pipelines[0].name, name);
            Ok(pipelines.remove(0))
        }
    }

    fn payments(digest: &str) -> Vec<Pipeline> {
        vec![Pipeline::new("payments").with_phase(Phase::new("A").with_digest(digest))]
    }

    fn setup() -> (
        Arc<GatedRepository>,
        LiveSync,
        mpsc::UnboundedReceiver<FetchOutcome>,
    ) {
        let repository = Arc::new(GatedRepository::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let sync = LiveSync::new(repository.clone(), tx);
        (repository, sync, rx)
    }

    #[tokio::test]
    async fn test_stopped_controller_does_not_fetch() {
        let (_repository, mut sync, _rx) = setup();
        assert_eq!(sync.tick(), None);
        assert_eq!(sync.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_keep_newest() {
        let (repository, mut sync, mut rx) = setup();
        sync.set_view(ViewTarget::All);

        let first = repository.gate();
        let second = repository.gate();
        sync.tick().unwrap();
        sync.tick().unwrap();

        // Tick 2 answers first
        second.send(Ok(payments("sha256:2"))).unwrap();
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.ticket.seq, 2);
        assert_eq!(sync.accept(outcome), SyncUpdate::Applied(payments("sha256:2")));

        first.send(Ok(payments("sha256:1"))).unwrap();
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.ticket.seq, 1);
        assert_eq!(sync.accept(outcome), SyncUpdate::Discarded);
    }

    #[tokio::test]
    async fn test_failed_tick_is_reported_and_polling_continues() {
        let (repository, mut sync, mut rx) = setup();
        sync.set_view(ViewTarget::Pipeline("payments".to_string()));

        let failing = repository.gate();
        sync.tick().unwrap();
        failing.send(Err(anyhow::anyhow!("engine unavailable"))).unwrap();
        let outcome = rx.recv().await.unwrap();
        assert_eq!(
            sync.accept(outcome),
            SyncUpdate::Failed("engine unavailable".to_string())
        );

        let next = repository.gate();
        sync.tick().unwrap();
        next.send(Ok(payments("sha256:1"))).unwrap();
        let outcome = rx.recv().await.unwrap();
        assert!(matches!(sync.accept(outcome), SyncUpdate::Applied(_)));
    }

    #[tokio::test]
    async fn test_view_change_discards_old_results() {
        let (repository, mut sync, _rx) = setup();
        sync.set_view(ViewTarget::Pipeline("payments".to_string()));

        let _gate = repository.gate();
        let stale = sync.tick().unwrap();
        sync.set_view(ViewTarget::Pipeline("checkout".to_string()));

        // A result that was already queued before the switch
        let update = sync.accept(FetchOutcome {
            ticket: stale,
            result: Ok(payments("sha256:1")),
        });
        assert_eq!(update, SyncUpdate::Discarded);

        let update = sync.accept(FetchOutcome {
            ticket: stale,
            result: Err("timeout".to_string()),
        });
        assert_eq!(update, SyncUpdate::Discarded);
    }

    #[tokio::test]
    async fn test_hung_fetches_cap_new_ticks() {
        let (repository, mut sync, mut rx) = setup();
        sync.set_view(ViewTarget::All);

        let mut gates: Vec<_> = (0..MAX_IN_FLIGHT).map(|_| repository.gate()).collect();
        for _ in 0..MAX_IN_FLIGHT {
            sync.tick().unwrap();
        }
        assert_eq!(sync.tick(), None);
        assert_eq!(sync.in_flight(), MAX_IN_FLIGHT);

        // One answer frees a slot
        gates.remove(0).send(Ok(payments("sha256:1"))).unwrap();
        rx.recv().await.unwrap();
        tokio::task::yield_now().await;

        let _next = repository.gate();
        let ticket = sync.tick().unwrap();
        assert_eq!(ticket.seq, MAX_IN_FLIGHT as u64 + 1);
        assert_eq!(sync.in_flight(), MAX_IN_FLIGHT);
    }

    #[tokio::test]
    async fn test_stop_aborts_in_flight_fetches() {
        let (repository, mut sync, mut rx) = setup();
        sync.set_view(ViewTarget::All);

        let gate = repository.gate();
        sync.tick().unwrap();
        sync.stop();
        assert_eq!(sync.tick(), None);

        // The aborted task never reports back
        let _ = gate.send(Ok(payments("sha256:1")));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
