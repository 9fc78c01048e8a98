//! Scheduler - Periodic Tick Driver with Busy Guard
//!
//! ## Responsibilities
//!
//! - Fire a tick every period while started
//! - Skip a tick entirely while the previous tick's job is outstanding
//! - Cancel future ticks on stop (an in-flight job runs to completion)
//!
//! The busy guard is a single-slot token owned by the scheduler, not by a
//! session, so at most one job is outstanding even across stop/start.

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Default tick period
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5);

/// Single-slot busy token; releases the guard on drop
struct BusyToken {
    busy: Arc<AtomicBool>,
}

impl BusyToken {
    fn try_acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy: busy.clone() })
    }
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct TickCounters {
    fired: AtomicU64,
    skipped: AtomicU64,
}

/// Scheduler counters snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub period_secs: u64,
    pub running: bool,
    pub busy: bool,
    pub ticks_fired: u64,
    pub ticks_skipped: u64,
}

/// Scheduler instance
pub struct Scheduler {
    period: Duration,
    busy: Arc<AtomicBool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<TickCounters>,
}

impl Scheduler {
    /// Create new Scheduler
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            busy: Arc::new(AtomicBool::new(false)),
            ticker: Mutex::new(None),
            counters: Arc::new(TickCounters::default()),
        }
    }

    /// Start ticking. The first tick fires one period from now.
    ///
    /// Returns false if already running.
    pub async fn start<F, Fut>(&self, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            tracing::warn!("Scheduler already running");
            return false;
        }

        let period = self.period;
        let busy = self.busy.clone();
        let counters = self.counters.clone();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                counters.fired.fetch_add(1, Ordering::Relaxed);

                match BusyToken::try_acquire(&busy) {
                    Some(token) => {
                        let fut = job();
                        tokio::spawn(async move {
                            let _token = token;
                            fut.await;
                        });
                    }
                    None => {
                        counters.skipped.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("Previous tick still in flight, skipping");
                    }
                }
            }
        });

        *ticker = Some(handle);
        tracing::info!(period_secs = period.as_secs(), "Scheduler started");
        true
    }

    /// Cancel future ticks. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let mut ticker = self.ticker.lock().await;
        match ticker.take() {
            Some(handle) => {
                handle.abort();
                tracing::info!(busy = self.is_busy(), "Scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a tick job is outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Get counters snapshot
    pub async fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            period_secs: self.period.as_secs(),
            running: self.is_running().await,
            busy: self.is_busy(),
            ticks_fired: self.counters.fired.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }
}
