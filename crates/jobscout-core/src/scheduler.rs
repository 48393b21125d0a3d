use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::cycle::{CycleOutcome, CycleReporter};

/// Source of scheduling ticks.
pub trait Ticker: Send {
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Fixed-period ticker. The first tick fires immediately; ticks missed
/// while a cycle runs are dropped rather than replayed.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Anything that can run one crawl cycle.
pub trait CycleRunner: Send + Sync {
    fn run_cycle<R: CycleReporter>(
        &self,
        reporter: &R,
    ) -> impl Future<Output = CycleOutcome> + Send;
}

/// Triggers a crawl cycle on every tick until cancelled.
pub struct Scheduler<R>
where
    R: CycleRunner,
{
    runner: R,
    enabled: bool,
    interval: Duration,
}

impl<R> Scheduler<R>
where
    R: CycleRunner,
{
    pub fn new(runner: R, config: &SyncConfig) -> Self {
        Self {
            runner,
            enabled: config.enabled,
            interval: config.interval,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drive cycles from `ticker` until `cancel_token` fires.
    ///
    /// Cycles run inline, so a slow cycle delays the next tick instead of
    /// overlapping with it. A cycle in progress is allowed to finish before
    /// the loop exits. Returns the number of cycles run.
    pub async fn run<T, CR>(
        &self,
        mut ticker: T,
        cancel_token: CancellationToken,
        reporter: &CR,
    ) -> u64
    where
        T: Ticker,
        CR: CycleReporter,
    {
        if !self.enabled {
            tracing::info!("Jobs discovery disabled, scheduler not started");
            return 0;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                () = ticker.tick() => {}
            }

            self.runner.run_cycle(reporter).await;
            cycles += 1;
        }

        tracing::info!(cycles, "Scheduler stopped");
        cycles
    }

    /// Start the scheduler on a background task with an [`IntervalTicker`].
    ///
    /// Returns `None` without spawning anything when the feature flag is off.
    pub fn spawn<CR>(self, cancel_token: CancellationToken, reporter: CR) -> Option<JoinHandle<u64>>
    where
        R: 'static,
        CR: CycleReporter + 'static,
    {
        if !self.enabled {
            tracing::info!("Jobs discovery disabled, scheduler not started");
            return None;
        }

        Some(tokio::spawn(async move {
            let ticker = IntervalTicker::new(self.interval);
            self.run(ticker, cancel_token, &reporter).await
        }))
    }
}
