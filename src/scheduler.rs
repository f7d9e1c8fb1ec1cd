//! Periodic drift scheduler
//!
//! One task fires a tick every interval. Ticks run inline on that task, so
//! they never overlap: a tick that outlasts the interval delays the next one
//! and any fires missed meanwhile are skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::RngCore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::{
    broadcaster::{Broadcaster, DriftPayload},
    drift,
    errors::BottleDriftError,
    models::{Bottle, BottleStatus},
    store::BottleStore,
};

/// Production tick cadence
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub eligible: usize,
    pub drifted: usize,
    pub failed: usize,
}

/// Work done on each tick: drift every eligible bottle, persist, broadcast
pub struct DriftTicker<S> {
    store: Arc<S>,
    broadcaster: Broadcaster,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl<S: BottleStore> DriftTicker<S> {
    pub fn new(store: Arc<S>, broadcaster: Broadcaster, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            store,
            broadcaster,
            rng: Mutex::new(rng),
        }
    }

    /// Run a single tick. Failures for one bottle are logged and do not
    /// stop the others.
    pub async fn tick(&self) -> TickSummary {
        let bottles = match self.store.list_eligible_for_drift().await {
            Ok(bottles) => bottles,
            Err(e) => {
                error!("Failed to list drifting bottles: {}", e);
                return TickSummary::default();
            }
        };

        let mut summary = TickSummary {
            eligible: bottles.len(),
            ..Default::default()
        };

        for bottle in &bottles {
            match self.drift_one(bottle).await {
                Ok(()) => summary.drifted += 1,
                Err(e) => {
                    warn!("Failed to drift bottle {}: {}", bottle.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Drift tick done: {} eligible, {} drifted, {} failed",
            summary.eligible, summary.drifted, summary.failed
        );
        summary
    }

    async fn drift_one(&self, bottle: &Bottle) -> Result<(), BottleDriftError> {
        let event = {
            let mut rng = self.rng.lock();
            drift::advance(bottle, &mut **rng)
        };

        self.store
            .record_drift_event(event.bottle_id, event.lat, event.lng)
            .await?;
        let updated = self
            .store
            .update_position(event.bottle_id, event.lat, event.lng, BottleStatus::Drifting)
            .await?;

        self.broadcaster
            .broadcast_drift(&DriftPayload::new(&event, &updated));
        Ok(())
    }
}

/// Drives a [`DriftTicker`] on a fixed interval. Starts stopped.
pub struct Scheduler<S> {
    ticker: Arc<DriftTicker<S>>,
    interval: Duration,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl<S: BottleStore> Scheduler<S> {
    pub fn new(ticker: DriftTicker<S>, interval: Duration) -> Self {
        Self {
            ticker: Arc::new(ticker),
            interval,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Arm the timer. The first tick fires one interval after start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), BottleDriftError> {
        if self.running.is_some() {
            return Err(BottleDriftError::SchedulerAlreadyRunning);
        }
        if self.interval.is_zero() {
            return Err(BottleDriftError::ConfigurationError {
                message: "Drift tick interval must be greater than zero".to_string(),
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(self.ticker.clone(), self.interval, stop_rx));
        self.running = Some((stop_tx, handle));

        info!("Drift scheduler started, tick every {:?}", self.interval);
        Ok(())
    }

    /// Disarm the timer, letting an in-flight tick finish first
    pub async fn stop(&mut self) {
        let Some((stop_tx, handle)) = self.running.take() else {
            return;
        };
        let _ = stop_tx.send(true);
        if let Err(e) = handle.await {
            error!("Drift scheduler task failed: {}", e);
        }
        info!("Drift scheduler stopped");
    }
}

async fn run<S: BottleStore>(
    ticker: Arc<DriftTicker<S>>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // Stop wins over a fire that came due during a long tick
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = interval.tick() => {
                let started = Instant::now();
                ticker.tick().await;
                let elapsed = started.elapsed();
                if elapsed > period {
                    warn!(
                        "Drift tick took {:?}, longer than the {:?} interval; skipping missed ticks",
                        elapsed, period
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::tests::bottle_at;
    use crate::hub::Hub;
    use crate::models::BottleId;
    use crate::store::memory::MemoryStore;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::Value;

    fn ticker(store: Arc<MemoryStore>, hub: Arc<Hub>) -> DriftTicker<MemoryStore> {
        DriftTicker::new(
            store,
            Broadcaster::new(hub),
            Box::new(StdRng::seed_from_u64(11)),
        )
    }

    #[tokio::test]
    async fn failing_bottle_does_not_abort_tick() {
        let store = Arc::new(MemoryStore::with_bottles(vec![
            bottle_at(1, 30.0, -40.0),
            bottle_at(2, 0.0, 0.0),
            bottle_at(3, -20.0, 170.0),
        ]));
        store.fail_writes_for(BottleId::from(2));

        let hub = Arc::new(Hub::default());
        let mut sub = hub.register();

        let summary = ticker(store.clone(), hub).tick().await;
        assert_eq!(
            summary,
            TickSummary {
                eligible: 3,
                drifted: 2,
                failed: 1
            }
        );

        let mut ids = Vec::new();
        while let Ok(msg) = sub.rx.try_recv() {
            let value: Value = serde_json::from_slice(&msg).unwrap();
            assert_eq!(value["type"], "bottle_drift");
            ids.push(value["payload"]["bottle_id"].as_i64().unwrap());
        }
        assert_eq!(ids, vec![1, 3]);

        assert_eq!(store.events().len(), 2);
        assert_eq!(store.bottle(BottleId::from(1)).unwrap().hops, 1);
        assert_eq!(store.bottle(BottleId::from(2)).unwrap().hops, 0);
    }

    #[tokio::test]
    async fn broadcast_carries_persisted_position() {
        let store = Arc::new(MemoryStore::with_bottles(vec![bottle_at(5, 0.0, 0.0)]));
        let hub = Arc::new(Hub::default());
        let mut sub = hub.register();

        ticker(store.clone(), hub).tick().await;

        let stored = store.bottle(BottleId::from(5)).unwrap();
        let value: Value = serde_json::from_slice(&sub.rx.try_recv().unwrap()).unwrap();
        let lat = value["payload"]["lat"].as_f64().unwrap();
        let lng = value["payload"]["lng"].as_f64().unwrap();
        assert!((lat - stored.current_lat).abs() < 1e-12);
        assert!((lng - stored.current_lng).abs() < 1e-12);
        assert_eq!(value["payload"]["hops"], 1);
        assert_eq!(value["payload"]["bottle_style"], 3);
        assert!(stored.current_lat > 0.0);
    }

    #[tokio::test]
    async fn only_drifting_bottles_are_ticked() {
        let mut discovered = bottle_at(2, 10.0, 10.0);
        discovered.status = BottleStatus::Discovered;
        let mut later = bottle_at(3, 10.0, 10.0);
        later.scheduled_release = chrono::Utc::now() + chrono::Duration::hours(1);

        let store = Arc::new(MemoryStore::with_bottles(vec![
            bottle_at(1, 10.0, 10.0),
            discovered,
            later,
        ]));
        let summary = ticker(store.clone(), Arc::new(Hub::default())).tick().await;

        assert_eq!(summary.eligible, 1);
        assert_eq!(summary.drifted, 1);
        assert_eq!(store.bottle(BottleId::from(2)).unwrap().hops, 0);
        assert_eq!(store.bottle(BottleId::from(3)).unwrap().hops, 0);
    }

    #[tokio::test]
    async fn scheduler_fires_repeatedly_and_stops() {
        let store = Arc::new(MemoryStore::with_bottles(vec![bottle_at(1, 30.0, -40.0)]));
        let hub = Arc::new(Hub::default());
        let mut scheduler = Scheduler::new(ticker(store.clone(), hub), Duration::from_millis(20));

        assert!(!scheduler.is_running());
        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(
            scheduler.start(),
            Err(BottleDriftError::SchedulerAlreadyRunning)
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());

        let hops = store.bottle(BottleId::from(1)).unwrap().hops;
        assert!(hops >= 2, "only {hops} ticks");

        // No more ticks after stop
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.bottle(BottleId::from(1)).unwrap().hops, hops);
    }

    /// Store whose listing step outlasts the scheduler interval
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    impl BottleStore for SlowStore {
        async fn list_eligible_for_drift(&self) -> Result<Vec<Bottle>, BottleDriftError> {
            tokio::time::sleep(self.delay).await;
            self.inner.list_eligible_for_drift().await
        }

        async fn get_bottle(&self, id: BottleId) -> Result<Bottle, BottleDriftError> {
            self.inner.get_bottle(id).await
        }

        async fn create_bottle(
            &self,
            bottle: &crate::models::NewBottle,
        ) -> Result<Bottle, BottleDriftError> {
            self.inner.create_bottle(bottle).await
        }

        async fn record_event(
            &self,
            id: BottleId,
            kind: crate::models::EventKind,
            lat: f64,
            lng: f64,
        ) -> Result<crate::models::BottleEvent, BottleDriftError> {
            self.inner.record_event(id, kind, lat, lng).await
        }

        async fn list_events(
            &self,
            id: BottleId,
        ) -> Result<Vec<crate::models::BottleEvent>, BottleDriftError> {
            self.inner.list_events(id).await
        }

        async fn update_position(
            &self,
            id: BottleId,
            lat: f64,
            lng: f64,
            status: BottleStatus,
        ) -> Result<Bottle, BottleDriftError> {
            self.inner.update_position(id, lat, lng, status).await
        }

        async fn update_status(
            &self,
            id: BottleId,
            status: BottleStatus,
        ) -> Result<Bottle, BottleDriftError> {
            self.inner.update_status(id, status).await
        }
    }

    #[tokio::test]
    async fn stop_mid_tick_finishes_only_that_tick() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::with_bottles(vec![bottle_at(1, 30.0, -40.0)]),
            delay: Duration::from_millis(200),
        });
        let ticker = DriftTicker::new(
            store.clone(),
            Broadcaster::new(Arc::new(Hub::default())),
            Box::new(StdRng::seed_from_u64(11)),
        );
        let mut scheduler = Scheduler::new(ticker, Duration::from_millis(20));

        scheduler.start().unwrap();
        // First fire at 20ms, still listing at 60ms
        tokio::time::sleep(Duration::from_millis(60)).await;
        scheduler.stop().await;

        // The in-flight tick completed before stop returned
        assert_eq!(store.inner.bottle(BottleId::from(1)).unwrap().hops, 1);
        assert_eq!(store.inner.events().len(), 1);

        // Fires that came due during the long tick never run
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.inner.bottle(BottleId::from(1)).unwrap().hops, 1);
        assert_eq!(store.inner.events().len(), 1);
    }

    #[tokio::test]
    async fn overrunning_ticks_do_not_overlap() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::with_bottles(vec![bottle_at(1, 30.0, -40.0)]),
            delay: Duration::from_millis(50),
        });
        let ticker = DriftTicker::new(
            store.clone(),
            Broadcaster::new(Arc::new(Hub::default())),
            Box::new(StdRng::seed_from_u64(3)),
        );
        let mut scheduler = Scheduler::new(ticker, Duration::from_millis(10));

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.stop().await;

        // Each tick spends at least 50ms listing, so at most one tick per 50ms
        // fits; a backlog of missed fires is skipped, not replayed
        let hops = store.inner.bottle(BottleId::from(1)).unwrap().hops;
        assert!(hops >= 2, "only {hops} ticks");
        assert!(hops <= 7, "{hops} ticks in 300ms");
        assert_eq!(store.inner.events().len(), hops as usize);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let mut scheduler = Scheduler::new(ticker(store, Arc::new(Hub::default())), Duration::ZERO);
        assert!(matches!(
            scheduler.start(),
            Err(BottleDriftError::ConfigurationError { .. })
        ));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn stop_before_start_is_noop() {
        let store = Arc::new(MemoryStore::default());
        let mut scheduler = Scheduler::new(
            ticker(store, Arc::new(Hub::default())),
            DEFAULT_TICK_INTERVAL,
        );
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
