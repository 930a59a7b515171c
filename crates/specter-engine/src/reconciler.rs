//! Creator-presence reconciler.
//!
//! Every few seconds, checks that each session's creator is still online
//! somewhere on the network and posts an eviction for every creator who
//! is not. The relay roster is consulted first; when it is unavailable
//! the pass degrades to the local player list. A creator the local node
//! can see is never evicted, even if a stale roster omits them. Console
//! sessions have no presence to track and are exempt.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use specter_host::bridge::HostBridge;
use specter_settings::types::ReconcilerSettings;

use crate::directory::SessionDirectory;
use crate::relay::{MessageRelay, RosterSnapshot};
use crate::tasks::{SimTask, TaskSender};

const EVICTION_COUNTER: &str = "specter_presence_evictions_total";

/// Periodic sweep evicting sessions whose creators went offline.
pub struct PresenceReconciler {
    settings: ReconcilerSettings,
    directory: Arc<SessionDirectory>,
    bridge: Arc<dyn HostBridge>,
    relay: Arc<dyn MessageRelay>,
    tasks: TaskSender,
    cancel: CancellationToken,
}

impl PresenceReconciler {
    /// A reconciler over the given directory, host, and relay.
    #[must_use]
    pub fn new(
        settings: ReconcilerSettings,
        directory: Arc<SessionDirectory>,
        bridge: Arc<dyn HostBridge>,
        relay: Arc<dyn MessageRelay>,
        tasks: TaskSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            directory,
            bridge,
            relay,
            tasks,
            cancel,
        }
    }

    /// Run the sweep loop on the ambient runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        if !self.settings.follow_quitting {
            debug!("presence reconciler disabled");
            return;
        }

        let mut interval = time::interval(Duration::from_secs(self.settings.interval_secs));
        // Delay keeps at most one sweep outstanding when a roster query
        // runs long.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let _ = interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("presence reconciler stopped");
                    return;
                }
                _ = interval.tick() => self.sweep().await,
            }
        }
    }

    /// One reconciliation pass.
    pub async fn sweep(&self) {
        let roster = match self.relay.query_roster().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                debug!(error = %err, "roster unavailable, using local presence only");
                None
            }
        };

        for creator in self.plan_evictions(roster.as_ref()) {
            counter!(EVICTION_COUNTER).increment(1);
            self.tasks.send(SimTask::EvictCreator {
                creator,
                reason: "creator offline".into(),
            });
        }
    }

    /// Every creator whose sessions should be removed this pass.
    fn plan_evictions(&self, roster: Option<&RosterSnapshot>) -> Vec<String> {
        let mut offline = Vec::new();
        for creator in self.directory.creators() {
            if creator.is_console() {
                continue;
            }
            if roster.is_some_and(|names| names.contains(&creator.name)) {
                continue;
            }
            // The local check is the final arbiter: a roster reply can lag
            // behind a join on this node.
            if self.bridge.is_online(&creator.name) {
                continue;
            }
            offline.push(creator.name);
        }
        offline
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use async_trait::async_trait;
    use specter_core::actor::Creator;
    use specter_core::ids::SessionId;
    use specter_core::location::Location;
    use specter_host::sim::SimHost;
    use specter_host::transport::NullTransport;
    use specter_store::prefs::SessionPrefs;
    use uuid::Uuid;

    use crate::naming::SequenceName;
    use crate::relay::RelayError;
    use crate::session::Session;
    use crate::tasks::{TaskReceiver, task_queue};

    struct StaticRelay(RosterSnapshot);

    #[async_trait]
    impl MessageRelay for StaticRelay {
        async fn query_roster(&self) -> Result<RosterSnapshot, RelayError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRelay;

    #[async_trait]
    impl MessageRelay for FailingRelay {
        async fn query_roster(&self) -> Result<RosterSnapshot, RelayError> {
            Err(RelayError::Timeout)
        }
    }

    fn settings() -> ReconcilerSettings {
        ReconcilerSettings {
            follow_quitting: true,
            interval_secs: 5,
        }
    }

    fn register(directory: &SessionDirectory, name: &str, creator: Creator) {
        directory.register(Session::new(
            SessionId::new(),
            SequenceName {
                name: name.to_owned(),
                creator: creator.name.clone(),
                ordinal: None,
            },
            creator,
            Location::new("world", 0.0, 64.0, 0.0),
            SessionPrefs::default(),
            None,
            Arc::new(NullTransport::new()),
        ));
    }

    fn player(name: &str) -> Creator {
        Creator::player(name, Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn reconciler(
        host: &Arc<SimHost>,
        directory: Arc<SessionDirectory>,
        relay: Arc<dyn MessageRelay>,
    ) -> (PresenceReconciler, TaskReceiver) {
        let (tx, rx) = task_queue();
        let reconciler = PresenceReconciler::new(
            settings(),
            directory,
            Arc::clone(host) as Arc<dyn HostBridge>,
            relay,
            tx,
            CancellationToken::new(),
        );
        (reconciler, rx)
    }

    fn evicted_creators(rx: &mut TaskReceiver) -> Vec<String> {
        let mut creators: Vec<String> = rx
            .drain()
            .into_iter()
            .map(|task| match task {
                SimTask::EvictCreator { creator, reason } => {
                    assert_eq!(reason, "creator offline");
                    creator
                }
                other => panic!("unexpected task {}", other.label()),
            })
            .collect();
        creators.sort();
        creators
    }

    #[tokio::test]
    async fn sweep_evicts_every_offline_creator() {
        let host = Arc::new(SimHost::new());
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", player("alice"));
        register(&directory, "ghost_2", player("bob"));

        let (reconciler, mut rx) =
            reconciler(&host, directory, Arc::new(StaticRelay(RosterSnapshot::default())));
        reconciler.sweep().await;

        assert_eq!(
            evicted_creators(&mut rx),
            vec!["alice".to_owned(), "bob".to_owned()]
        );
    }

    #[tokio::test]
    async fn roster_presence_keeps_a_creator_alive() {
        let host = Arc::new(SimHost::new());
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", player("alice"));
        register(&directory, "ghost_2", player("bob"));

        let roster = RosterSnapshot::from_names(["alice"]);
        let (reconciler, mut rx) = reconciler(&host, directory, Arc::new(StaticRelay(roster)));
        reconciler.sweep().await;

        assert_eq!(evicted_creators(&mut rx), vec!["bob".to_owned()]);
    }

    #[tokio::test]
    async fn local_join_overrides_a_stale_roster() {
        let host = Arc::new(SimHost::new());
        host.connect("alice");
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", player("alice"));

        let (reconciler, mut rx) =
            reconciler(&host, directory, Arc::new(StaticRelay(RosterSnapshot::default())));
        reconciler.sweep().await;

        assert!(evicted_creators(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn relay_failure_degrades_to_local_presence() {
        let host = Arc::new(SimHost::new());
        host.connect("alice");
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", player("alice"));
        register(&directory, "ghost_2", player("bob"));

        let (reconciler, mut rx) = reconciler(&host, directory, Arc::new(FailingRelay));
        reconciler.sweep().await;

        assert_eq!(evicted_creators(&mut rx), vec!["bob".to_owned()]);
    }

    #[tokio::test]
    async fn console_sessions_are_exempt() {
        let host = Arc::new(SimHost::new());
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", Creator::console());

        let (reconciler, mut rx) =
            reconciler(&host, directory, Arc::new(StaticRelay(RosterSnapshot::default())));
        reconciler.sweep().await;

        assert!(evicted_creators(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_sweeps_once_per_period() {
        let host = Arc::new(SimHost::new());
        let directory = Arc::new(SessionDirectory::new());
        register(&directory, "ghost_1", player("alice"));

        let (tx, mut rx) = task_queue();
        let cancel = CancellationToken::new();
        let reconciler = PresenceReconciler::new(
            settings(),
            directory,
            Arc::clone(&host) as Arc<dyn HostBridge>,
            Arc::new(StaticRelay(RosterSnapshot::default())),
            tx,
            cancel.clone(),
        );
        let handle = reconciler.spawn();

        time::sleep(Duration::from_secs(4)).await;
        assert!(rx.drain().is_empty());

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.drain().len(), 1);

        cancel.cancel();
        handle.await.expect("stops on cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_reconciler_exits_immediately() {
        let host = Arc::new(SimHost::new());
        let (tx, _rx) = task_queue();
        let reconciler = PresenceReconciler::new(
            ReconcilerSettings {
                follow_quitting: false,
                interval_secs: 5,
            },
            Arc::new(SessionDirectory::new()),
            Arc::clone(&host) as Arc<dyn HostBridge>,
            Arc::new(FailingRelay),
            tx,
            CancellationToken::new(),
        );
        reconciler.spawn().await.expect("exits on its own");
    }
}
