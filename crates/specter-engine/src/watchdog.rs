//! Server-health watchdog.
//!
//! Samples the host's rolling performance figure on a fixed period and,
//! when it falls below the configured floor, posts a blanket eviction to
//! the simulation thread. Sessions are the sheddable load; removing all
//! of them at once gives the server headroom back immediately.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use specter_host::bridge::HostBridge;
use specter_settings::types::WatchdogSettings;

use crate::tasks::{SimTask, TaskSender};

const TRIP_COUNTER: &str = "specter_watchdog_trips_total";

/// Periodic performance sampler that sheds every session under load.
pub struct PerformanceWatchdog {
    settings: WatchdogSettings,
    bridge: Arc<dyn HostBridge>,
    tasks: TaskSender,
    cancel: CancellationToken,
}

impl PerformanceWatchdog {
    /// A watchdog wired to the host and the simulation task queue.
    #[must_use]
    pub fn new(
        settings: WatchdogSettings,
        bridge: Arc<dyn HostBridge>,
        tasks: TaskSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            bridge,
            tasks,
            cancel,
        }
    }

    /// Run the sampling loop on the ambient runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        if !self.settings.enabled() {
            debug!("performance watchdog disabled, floor is zero");
            return;
        }

        let mut interval = time::interval(Duration::from_secs(self.settings.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // real sample happens one full period in.
        let _ = interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("performance watchdog stopped");
                    return;
                }
                _ = interval.tick() => self.sample(),
            }
        }
    }

    /// Take one sample and post a blanket eviction if under the floor.
    pub fn sample(&self) {
        let tps = self.bridge.health_sample();
        if tps >= self.settings.floor_tps {
            return;
        }
        warn!(
            tps,
            floor = self.settings.floor_tps,
            "host below performance floor, evicting all sessions"
        );
        counter!(TRIP_COUNTER).increment(1);
        self.tasks.send(SimTask::EvictAll {
            reason: "low tps".into(),
            notice: Some(format!(
                "[specter] server at {tps:.1} tps, removing all sessions"
            )),
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use specter_host::sim::SimHost;

    use crate::tasks::task_queue;

    fn settings(floor_tps: f64, interval_secs: u64) -> WatchdogSettings {
        WatchdogSettings {
            floor_tps,
            interval_secs,
        }
    }

    fn watchdog(
        host: &Arc<SimHost>,
        floor_tps: f64,
    ) -> (PerformanceWatchdog, crate::tasks::TaskReceiver) {
        let (tx, rx) = task_queue();
        let watchdog = PerformanceWatchdog::new(
            settings(floor_tps, 60),
            Arc::clone(host) as Arc<dyn HostBridge>,
            tx,
            CancellationToken::new(),
        );
        (watchdog, rx)
    }

    #[test]
    fn sample_below_floor_posts_a_blanket_eviction() {
        let host = Arc::new(SimHost::new());
        host.set_tps(10.0);
        let (watchdog, mut rx) = watchdog(&host, 14.0);

        watchdog.sample();

        let tasks = rx.drain();
        assert_eq!(tasks.len(), 1);
        match &tasks[0] {
            SimTask::EvictAll { reason, notice } => {
                assert_eq!(reason, "low tps");
                assert!(notice.as_deref().is_some_and(|n| n.contains("10.0 tps")));
            }
            other => panic!("unexpected task {}", other.label()),
        }
    }

    #[test]
    fn sample_at_or_above_floor_is_quiet() {
        let host = Arc::new(SimHost::new());
        host.set_tps(14.0);
        let (watchdog, mut rx) = watchdog(&host, 14.0);

        watchdog.sample();
        assert!(rx.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_floor_disables_the_loop() {
        let host = Arc::new(SimHost::new());
        let (tx, _rx) = task_queue();
        let watchdog = PerformanceWatchdog::new(
            settings(0.0, 60),
            Arc::clone(&host) as Arc<dyn HostBridge>,
            tx,
            CancellationToken::new(),
        );
        watchdog.spawn().await.expect("exits on its own");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_samples_once_per_period() {
        let host = Arc::new(SimHost::new());
        host.set_tps(5.0);

        let (tx, mut rx) = task_queue();
        let cancel = CancellationToken::new();
        let watchdog = PerformanceWatchdog::new(
            settings(14.0, 60),
            Arc::clone(&host) as Arc<dyn HostBridge>,
            tx,
            cancel.clone(),
        );
        let handle = watchdog.spawn();

        // Nothing fires before the first full period elapses.
        time::sleep(Duration::from_secs(59)).await;
        assert!(rx.drain().is_empty());

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.drain().len(), 1);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(rx.drain().len(), 2);

        cancel.cancel();
        handle.await.expect("stops on cancel");
    }
}
