//! Sampling clock Implementation

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Marks whether an exchange is outstanding.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if an exchange is already outstanding
    pub fn try_acquire(&self) -> Option<InFlightToken> {
        self.flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightToken {
                flag: self.flag.clone(),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Held for the lifetime of one exchange; frees the slot on drop
#[derive(Debug)]
pub struct InFlightToken {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Clock counters
#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks: AtomicU64,
    skipped: AtomicU64,
    launched: AtomicU64,
}

impl SchedulerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Ticks dropped because an exchange was still outstanding
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Exchanges started
    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::SeqCst)
    }
}

/// Fixed-interval clock that starts at most one exchange at a time.
///
/// The first tick fires one interval after `begin`. Ticks that land while
/// an exchange is outstanding are dropped, never queued.
#[derive(Debug, Default)]
pub struct SampleScheduler {
    in_flight: InFlightGuard,
    stats: Arc<SchedulerStats>,
    clock: Option<JoinHandle<()>>,
}

impl SampleScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `interval`, calling `on_tick` for each exchange.
    ///
    /// An already-running clock is replaced. Must be called inside a tokio runtime.
    pub fn begin<F, Fut>(&mut self, interval: Duration, on_tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.end();

        let guard = self.in_flight.clone();
        let stats = self.stats.clone();
        info!("Sampling clock started at {:?} interval", interval);

        self.clock = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                stats.ticks.fetch_add(1, Ordering::SeqCst);
                metrics::counter!("monitor_ticks_total").increment(1);

                let Some(token) = guard.try_acquire() else {
                    debug!("Tick skipped: exchange still in flight");
                    stats.skipped.fetch_add(1, Ordering::SeqCst);
                    metrics::counter!("monitor_ticks_skipped_total").increment(1);
                    continue;
                };

                stats.launched.fetch_add(1, Ordering::SeqCst);
                let exchange = on_tick();
                tokio::spawn(async move {
                    exchange.await;
                    drop(token);
                });
            }
        }));
    }

    /// Stop the clock. Outstanding exchanges run to completion.
    pub fn end(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
            info!("Sampling clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock.as_ref().is_some_and(|clock| !clock.is_finished())
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_in_flight()
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        self.stats.clone()
    }
}

impl Drop for SampleScheduler {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_guard_is_exclusive() {
        let guard = InFlightGuard::new();
        let token = guard.try_acquire().unwrap();
        assert!(guard.is_in_flight());
        assert!(guard.clone().try_acquire().is_none());

        drop(token);
        assert!(!guard.is_in_flight());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let mut scheduler = SampleScheduler::new();
        let stats = scheduler.stats();
        scheduler.begin(Duration::from_millis(500), || async {});
        settle().await;

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(stats.ticks(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(stats.ticks(), 1);
        assert_eq!(stats.launched(), 1);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        settle().await;
        assert_eq!(stats.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_exchange_skips_ticks() {
        let mut scheduler = SampleScheduler::new();
        let stats = scheduler.stats();
        let running = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));

        let (r, p) = (running.clone(), peak.clone());
        scheduler.begin(Duration::from_millis(100), move || {
            let (running, peak) = (r.clone(), p.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(350)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        settle().await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(stats.ticks(), 10);
        assert!(stats.skipped() > 0);
        assert_eq!(stats.ticks(), stats.launched() + stats.skipped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_stops_ticks() {
        let mut scheduler = SampleScheduler::new();
        let stats = scheduler.stats();
        scheduler.begin(Duration::from_millis(100), || async {});

        tokio::time::sleep(Duration::from_millis(250)).await;
        settle().await;
        assert!(scheduler.is_running());
        scheduler.end();
        assert!(!scheduler.is_running());

        let ticks = stats.ticks();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        settle().await;
        assert_eq!(stats.ticks(), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_replaces_clock() {
        let mut scheduler = SampleScheduler::new();
        let stats = scheduler.stats();
        scheduler.begin(Duration::from_millis(100), || async {});
        scheduler.begin(Duration::from_millis(100), || async {});

        tokio::time::sleep(Duration::from_millis(550)).await;
        settle().await;
        assert_eq!(stats.ticks(), 5);
    }
}
