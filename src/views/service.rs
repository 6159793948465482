use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{GateScope, ViewConfig};
use crate::database::manager::DatabaseError;
use crate::database::models::portfolio::Portfolio;
use crate::database::store::PortfolioStore;

use super::clock::Clock;
use super::gate::RecencyGate;
use super::identity::ViewerIdentity;
use super::ledger::ViewerLedger;
use super::ownership::is_owner_exempt;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Portfolio not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Why a read did or did not count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDecision {
    OwnerExempt,
    CoolingDown,
    Count,
}

/// What happened to a dispatched increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Counted(i64),
    /// The atomic update matched nothing: another read won the window, or the row is gone.
    Skipped,
    Failed,
    TimedOut,
}

/// Result of a portfolio read.
///
/// `portfolio.views` is the count as loaded, before this read's increment.
/// `recording` is the detached increment task; dropping it does not cancel it.
#[derive(Debug)]
pub struct FetchedPortfolio {
    pub portfolio: Portfolio,
    pub decision: ViewDecision,
    pub recording: Option<JoinHandle<RecordOutcome>>,
}

/// Serves portfolio reads and decides whether each one bumps the view counter.
#[derive(Clone)]
pub struct ViewAccounting {
    store: Arc<dyn PortfolioStore>,
    clock: Arc<dyn Clock>,
    gate: RecencyGate,
    write_timeout: StdDuration,
    ledger: Option<Arc<ViewerLedger>>,
}

impl ViewAccounting {
    pub fn new(store: Arc<dyn PortfolioStore>, clock: Arc<dyn Clock>, config: &ViewConfig) -> Self {
        let gate = RecencyGate::default();
        let ledger = match config.gate_scope {
            GateScope::Resource => None,
            GateScope::Viewer => Some(Arc::new(ViewerLedger::new(gate.window(), config.ledger_capacity))),
        };

        Self {
            store,
            clock,
            gate,
            write_timeout: StdDuration::from_millis(config.write_timeout_ms),
            ledger,
        }
    }

    pub fn gate_scope(&self) -> GateScope {
        if self.ledger.is_some() {
            GateScope::Viewer
        } else {
            GateScope::Resource
        }
    }

    /// Load a portfolio for `viewer` and count the view when it qualifies.
    ///
    /// Only the load can fail. Counting runs on its own task and never
    /// delays or fails the returned content.
    pub async fn fetch(&self, id: &str, viewer: &ViewerIdentity) -> Result<FetchedPortfolio, ViewError> {
        let portfolio = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| ViewError::NotFound(id.to_string()))?;

        let owner = is_owner_exempt(viewer, &portfolio.owner_id);
        if !portfolio.published && !owner {
            return Err(ViewError::NotFound(id.to_string()));
        }

        let now = self.clock.now();
        let decision = self.decide(&portfolio, viewer, owner, now).await;
        debug!("Portfolio {} read by {}: {:?}", portfolio.id, viewer, decision);

        let recording = match decision {
            ViewDecision::Count => Some(self.dispatch(&portfolio.id, viewer, now)),
            ViewDecision::OwnerExempt | ViewDecision::CoolingDown => None,
        };

        Ok(FetchedPortfolio {
            portfolio,
            decision,
            recording,
        })
    }

    async fn decide(
        &self,
        portfolio: &Portfolio,
        viewer: &ViewerIdentity,
        owner: bool,
        now: DateTime<Utc>,
    ) -> ViewDecision {
        if owner {
            return ViewDecision::OwnerExempt;
        }

        match &self.ledger {
            Some(ledger) => {
                if ledger.admit(&portfolio.id, viewer, now).await {
                    ViewDecision::Count
                } else {
                    ViewDecision::CoolingDown
                }
            }
            None => {
                if self.gate.is_closed(portfolio.view_counted_at, now) {
                    ViewDecision::CoolingDown
                } else {
                    ViewDecision::Count
                }
            }
        }
    }

    /// Spawn the increment. Resource scope repeats the gate inside the atomic
    /// update; viewer scope was already gated by the ledger.
    fn dispatch(&self, id: &str, viewer: &ViewerIdentity, now: DateTime<Utc>) -> JoinHandle<RecordOutcome> {
        let store = self.store.clone();
        let ledger = self.ledger.clone();
        let timeout = self.write_timeout;
        let id = id.to_string();
        let viewer = viewer.clone();
        let idle_before = match ledger {
            Some(_) => None,
            None => Some(self.gate.idle_cutoff(now)),
        };

        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, store.increment_views(&id, now, idle_before)).await {
                Ok(Ok(Some(views))) => {
                    debug!("Portfolio {} view counted ({} total)", id, views);
                    RecordOutcome::Counted(views)
                }
                Ok(Ok(None)) => {
                    debug!("Portfolio {} view not counted: gate closed by a concurrent read", id);
                    RecordOutcome::Skipped
                }
                Ok(Err(e)) => {
                    warn!("Failed to record view for portfolio {}: {}", id, e);
                    RecordOutcome::Failed
                }
                Err(_) => {
                    warn!("Recording view for portfolio {} timed out after {:?}", id, timeout);
                    RecordOutcome::TimedOut
                }
            };

            // A timed-out write may still have committed, so its admission stands
            if let (Some(ledger), RecordOutcome::Failed | RecordOutcome::Skipped) = (ledger, outcome) {
                ledger.forget(&id, &viewer).await;
            }

            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryPortfolioStore;
    use crate::database::models::portfolio::{NewPortfolio, PortfolioChanges};
    use crate::views::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::Duration;
    use futures::future::join_all;

    struct Fixture {
        store: Arc<MemoryPortfolioStore>,
        clock: Arc<ManualClock>,
        views: ViewAccounting,
        now: DateTime<Utc>,
    }

    fn portfolio(views: i64, view_counted_at: Option<DateTime<Utc>>, published: bool) -> Portfolio {
        let created = Utc::now() - Duration::days(1);
        Portfolio {
            id: "p1".to_string(),
            owner_id: "u1".to_string(),
            owner_name: None,
            title: "Bridge".to_string(),
            description: "A bridge".to_string(),
            content: "Steel".to_string(),
            images: vec!["a.png".to_string()],
            tags: vec!["civil".to_string()],
            views,
            published,
            created_at: created,
            updated_at: created,
            view_counted_at,
        }
    }

    async fn fixture(scope: GateScope, seed: impl FnOnce(DateTime<Utc>) -> Portfolio) -> Fixture {
        let now = Utc::now();
        let store = Arc::new(MemoryPortfolioStore::new());
        store.put(seed(now)).await;
        let clock = Arc::new(ManualClock::new(now));
        let config = ViewConfig {
            gate_scope: scope,
            ..ViewConfig::default()
        };
        let views = ViewAccounting::new(store.clone(), clock.clone(), &config);
        Fixture { store, clock, views, now }
    }

    async fn read(f: &Fixture, viewer: &ViewerIdentity) -> FetchedPortfolio {
        let mut fetched = f.views.fetch("p1", viewer).await.unwrap();
        if let Some(task) = fetched.recording.take() {
            task.await.unwrap();
        }
        fetched
    }

    async fn stored(f: &Fixture) -> Portfolio {
        f.store.find("p1").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn anonymous_reads_count_once_then_cool_down() {
        let f = fixture(GateScope::Resource, |now| portfolio(10, Some(now - Duration::minutes(10)), true)).await;

        let first = read(&f, &ViewerIdentity::anonymous("10.0.0.1")).await;
        assert_eq!(first.decision, ViewDecision::Count);
        assert_eq!(first.portfolio.views, 10);
        let after_first = stored(&f).await;
        assert_eq!(after_first.views, 11);
        assert_eq!(after_first.view_counted_at, Some(f.now));

        let second = read(&f, &ViewerIdentity::anonymous("10.0.0.2")).await;
        assert_eq!(second.decision, ViewDecision::CoolingDown);
        assert_eq!(stored(&f).await.views, 11);
    }

    #[tokio::test]
    async fn owner_reads_never_count() {
        let f = fixture(GateScope::Resource, |_| portfolio(4, None, true)).await;
        let owner = ViewerIdentity::authenticated("u1");

        for _ in 0..5 {
            let fetched = read(&f, &owner).await;
            assert_eq!(fetched.decision, ViewDecision::OwnerExempt);
            assert!(fetched.recording.is_none());
            f.clock.advance(Duration::minutes(10));
        }
        assert_eq!(stored(&f).await.views, 4);
    }

    #[tokio::test]
    async fn reads_inside_window_count_at_most_once() {
        let f = fixture(GateScope::Resource, |now| portfolio(7, Some(now - Duration::minutes(6)), true)).await;

        for i in 0..20 {
            read(&f, &ViewerIdentity::anonymous(format!("10.0.0.{}", i))).await;
            f.clock.advance(Duration::seconds(10));
        }
        assert_eq!(stored(&f).await.views, 8);
    }

    #[tokio::test]
    async fn read_after_window_counts_and_advances_timestamp() {
        let f = fixture(GateScope::Resource, |now| portfolio(3, Some(now), true)).await;
        let viewer = ViewerIdentity::authenticated("u2");

        assert_eq!(read(&f, &viewer).await.decision, ViewDecision::CoolingDown);

        f.clock.advance(Duration::minutes(5) + Duration::milliseconds(1));
        let later = f.clock.now();
        assert_eq!(read(&f, &viewer).await.decision, ViewDecision::Count);

        let p = stored(&f).await;
        assert_eq!(p.views, 4);
        assert_eq!(p.view_counted_at, Some(later));
    }

    #[tokio::test]
    async fn concurrent_qualifying_reads_in_one_window_count_once() {
        let f = fixture(GateScope::Resource, |_| portfolio(0, None, true)).await;

        let reads = (0..16).map(|i| {
            let views = f.views.clone();
            async move {
                views
                    .fetch("p1", &ViewerIdentity::anonymous(format!("10.0.1.{}", i)))
                    .await
                    .unwrap()
            }
        });
        let mut outcomes = Vec::new();
        for fetched in join_all(reads).await {
            if let Some(task) = fetched.recording {
                outcomes.push(task.await.unwrap());
            }
        }

        let counted = outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Counted(_)))
            .count();
        assert_eq!(counted, 1);
        assert_eq!(stored(&f).await.views, 1);
    }

    #[tokio::test]
    async fn unpublished_is_hidden_from_everyone_but_the_owner() {
        let f = fixture(GateScope::Resource, |_| portfolio(2, None, false)).await;

        for viewer in [
            ViewerIdentity::anonymous("anonymous"),
            ViewerIdentity::anonymous("u1"),
            ViewerIdentity::authenticated("u2"),
        ] {
            assert!(matches!(f.views.fetch("p1", &viewer).await, Err(ViewError::NotFound(_))));
        }

        let owner = read(&f, &ViewerIdentity::authenticated("u1")).await;
        assert_eq!(owner.decision, ViewDecision::OwnerExempt);
        assert_eq!(owner.portfolio.title, "Bridge");
        assert_eq!(stored(&f).await.views, 2);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let f = fixture(GateScope::Resource, |_| portfolio(0, None, true)).await;
        let result = f.views.fetch("missing", &ViewerIdentity::anonymous("x")).await;
        assert!(matches!(result, Err(ViewError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn content_edit_does_not_move_the_gate() {
        let f = fixture(GateScope::Resource, |now| portfolio(0, Some(now - Duration::minutes(10)), true)).await;

        let changes = PortfolioChanges {
            content: Some("Edited".to_string()),
            ..Default::default()
        };
        f.store.update_content("p1", changes, f.now).await.unwrap();

        let fetched = read(&f, &ViewerIdentity::anonymous("10.0.0.1")).await;
        assert_eq!(fetched.decision, ViewDecision::Count);
        assert_eq!(stored(&f).await.views, 1);
    }

    #[tokio::test]
    async fn viewer_scope_counts_each_distinct_viewer_once() {
        let f = fixture(GateScope::Viewer, |now| portfolio(0, Some(now), true)).await;
        assert_eq!(f.views.gate_scope(), GateScope::Viewer);
        let a = ViewerIdentity::anonymous("10.0.0.1");
        let b = ViewerIdentity::authenticated("u2");

        assert_eq!(read(&f, &a).await.decision, ViewDecision::Count);
        assert_eq!(read(&f, &b).await.decision, ViewDecision::Count);
        assert_eq!(read(&f, &a).await.decision, ViewDecision::CoolingDown);
        assert_eq!(stored(&f).await.views, 2);

        f.clock.advance(Duration::minutes(5));
        assert_eq!(read(&f, &a).await.decision, ViewDecision::Count);
        assert_eq!(stored(&f).await.views, 3);
    }

    #[tokio::test]
    async fn viewer_scope_still_exempts_owner() {
        let f = fixture(GateScope::Viewer, |_| portfolio(0, None, true)).await;
        let owner = read(&f, &ViewerIdentity::authenticated("u1")).await;
        assert_eq!(owner.decision, ViewDecision::OwnerExempt);
        assert_eq!(stored(&f).await.views, 0);
    }

    #[derive(Clone, Copy)]
    enum CounterFault {
        Fail,
        Hang,
        /// Applies the increment, then acknowledges after the write budget
        SlowAck,
    }

    /// Store whose reads work but whose counter writes misbehave.
    struct BrokenCounter {
        inner: MemoryPortfolioStore,
        fault: CounterFault,
    }

    #[async_trait]
    impl PortfolioStore for BrokenCounter {
        async fn ping(&self) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn find(&self, id: &str) -> Result<Option<Portfolio>, DatabaseError> {
            self.inner.find(id).await
        }

        async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Portfolio>, DatabaseError> {
            self.inner.list_published(limit, offset).await
        }

        async fn insert(&self, new: NewPortfolio, now: DateTime<Utc>) -> Result<Portfolio, DatabaseError> {
            self.inner.insert(new, now).await
        }

        async fn update_content(
            &self,
            id: &str,
            changes: PortfolioChanges,
            now: DateTime<Utc>,
        ) -> Result<Option<Portfolio>, DatabaseError> {
            self.inner.update_content(id, changes, now).await
        }

        async fn increment_views(
            &self,
            id: &str,
            now: DateTime<Utc>,
            idle_before: Option<DateTime<Utc>>,
        ) -> Result<Option<i64>, DatabaseError> {
            match self.fault {
                CounterFault::Fail => Err(DatabaseError::Unavailable("counter offline".to_string())),
                CounterFault::Hang => std::future::pending().await,
                CounterFault::SlowAck => {
                    let views = self.inner.increment_views(id, now, idle_before).await?;
                    tokio::time::sleep(StdDuration::from_millis(200)).await;
                    Ok(views)
                }
            }
        }
    }

    async fn broken(fault: CounterFault, scope: GateScope) -> (ViewAccounting, Arc<BrokenCounter>) {
        let inner = MemoryPortfolioStore::new();
        inner.put(portfolio(5, None, true)).await;
        let config = ViewConfig {
            gate_scope: scope,
            write_timeout_ms: 50,
            ..ViewConfig::default()
        };
        let store = Arc::new(BrokenCounter { inner, fault });
        let views = ViewAccounting::new(store.clone(), Arc::new(ManualClock::new(Utc::now())), &config);
        (views, store)
    }

    #[tokio::test]
    async fn failed_counter_write_still_serves_content() {
        let (views, _) = broken(CounterFault::Fail, GateScope::Resource).await;
        let fetched = views.fetch("p1", &ViewerIdentity::anonymous("x")).await.unwrap();
        assert_eq!(fetched.portfolio.views, 5);
        assert_eq!(fetched.recording.unwrap().await.unwrap(), RecordOutcome::Failed);
    }

    #[tokio::test]
    async fn hanging_counter_write_times_out_without_blocking_the_read() {
        let (views, _) = broken(CounterFault::Hang, GateScope::Resource).await;
        let fetched = tokio::time::timeout(
            StdDuration::from_secs(1),
            views.fetch("p1", &ViewerIdentity::anonymous("x")),
        )
        .await
        .expect("read must not wait for the counter")
        .unwrap();
        assert_eq!(fetched.portfolio.title, "Bridge");
        assert_eq!(fetched.recording.unwrap().await.unwrap(), RecordOutcome::TimedOut);
    }

    #[tokio::test]
    async fn failed_write_releases_viewer_ledger_entry() {
        let (views, _) = broken(CounterFault::Fail, GateScope::Viewer).await;
        let viewer = ViewerIdentity::anonymous("x");
        for _ in 0..2 {
            let fetched = views.fetch("p1", &viewer).await.unwrap();
            assert_eq!(fetched.decision, ViewDecision::Count);
            fetched.recording.unwrap().await.unwrap();
        }
    }

    #[tokio::test]
    async fn timed_out_write_keeps_viewer_ledger_entry() {
        let (views, store) = broken(CounterFault::SlowAck, GateScope::Viewer).await;
        let viewer = ViewerIdentity::anonymous("10.0.0.9");

        let first = views.fetch("p1", &viewer).await.unwrap();
        assert_eq!(first.decision, ViewDecision::Count);
        assert_eq!(first.recording.unwrap().await.unwrap(), RecordOutcome::TimedOut);

        for _ in 0..2 {
            let again = views.fetch("p1", &viewer).await.unwrap();
            assert_eq!(again.decision, ViewDecision::CoolingDown);
            assert!(again.recording.is_none());
        }

        // The slow write still landed exactly once
        tokio::time::sleep(StdDuration::from_millis(250)).await;
        assert_eq!(store.inner.find("p1").await.unwrap().unwrap().views, 6);
    }
}
