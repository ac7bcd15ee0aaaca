use crate::domain::model::PresenceSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Latest known presence, shared between the socket client and readers.
///
/// The store is only authoritative while a socket session is delivering
/// events into it; see [`live_snapshot`](Self::live_snapshot).
#[derive(Debug, Clone)]
pub struct PresenceStore {
    tx: Arc<watch::Sender<Option<PresenceSnapshot>>>,
    live: Arc<AtomicBool>,
}

impl PresenceStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn current(&self) -> Option<PresenceSnapshot> {
        self.tx.borrow().clone()
    }

    /// The cached snapshot, but only while a socket session keeps it fresh.
    pub fn live_snapshot(&self) -> Option<PresenceSnapshot> {
        if self.is_live() {
            self.current()
        } else {
            None
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// Stores `snapshot` if it differs from the current one. Returns whether it changed.
    pub fn update(&self, snapshot: PresenceSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&snapshot) {
                false
            } else {
                *current = Some(snapshot);
                true
            }
        })
    }

    pub fn differs_from(&self, snapshot: &PresenceSnapshot) -> bool {
        self.tx.borrow().as_ref() != Some(snapshot)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PresenceSnapshot>> {
        self.tx.subscribe()
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: &str) -> PresenceSnapshot {
        PresenceSnapshot {
            discord_status: status.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_update_notifies_only_on_change() {
        let store = PresenceStore::new();
        let mut rx = store.subscribe();

        assert!(store.update(snapshot("online")));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!store.update(snapshot("online")));
        assert!(!rx.has_changed().unwrap());

        assert!(store.update(snapshot("idle")));
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.current().unwrap().discord_status, "idle");
    }

    #[test]
    fn test_subscriber_wakes_only_for_new_value() {
        use tokio_test::{assert_pending, assert_ready_ok, task};

        let store = PresenceStore::new();
        store.update(snapshot("online"));
        let mut rx = store.subscribe();

        let mut changed = task::spawn(rx.changed());
        assert_pending!(changed.poll());

        store.update(snapshot("online"));
        assert!(!changed.is_woken());
        assert_pending!(changed.poll());

        store.update(snapshot("dnd"));
        assert!(changed.is_woken());
        assert_ready_ok!(changed.poll());
    }

    #[test]
    fn test_live_snapshot_requires_live_session() {
        let store = PresenceStore::new();
        store.update(snapshot("online"));
        assert!(store.live_snapshot().is_none());

        store.set_live(true);
        assert_eq!(store.live_snapshot().unwrap().discord_status, "online");

        store.clone().set_live(false);
        assert!(store.live_snapshot().is_none());
        assert!(store.current().is_some());
    }

    #[test]
    fn test_differs_from() {
        let store = PresenceStore::new();
        assert!(store.differs_from(&snapshot("online")));
        store.update(snapshot("online"));
        assert!(!store.differs_from(&snapshot("online")));
        assert!(store.differs_from(&snapshot("dnd")));
    }
}
