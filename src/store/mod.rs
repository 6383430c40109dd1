use crate::model::LiveSample;
use dashmap::{DashMap, DashSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::debug;

/// Keyed live-state store: entity name → latest push sample.
///
/// Invariant: every key present is a member of the subscribed set. A push
/// event for a name outside that set (late delivery after a prune, or a
/// name that was never subscribed) is dropped by `apply`, so pruned
/// entries can never be resurrected by in-flight messages.
pub struct LiveStateStore {
    /// Lock-free concurrent map for fast reads
    samples: DashMap<String, LiveSample>,

    /// Names currently subscribed on the push channel; `apply` checks
    /// membership before upserting
    subscribed: DashSet<String>,

    /// Broadcast channel for applied samples (live table, diagnostics)
    update_tx: broadcast::Sender<LiveSample>,
}

impl LiveStateStore {
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            samples: DashMap::new(),
            subscribed: DashSet::new(),
            update_tx,
        }
    }

    /// Upsert a push sample, last-write-wins.
    ///
    /// Returns false (and leaves the store untouched) when the name is
    /// not currently subscribed.
    pub fn apply(&self, sample: LiveSample) -> bool {
        if !self.subscribed.contains(&sample.name) {
            debug!(name = %sample.name, "Dropping push event for unsubscribed entity");
            return false;
        }

        self.samples.insert(sample.name.clone(), sample.clone());
        let _ = self.update_tx.send(sample);
        true
    }

    /// Replace the subscribed-membership set. Called during
    /// reconciliation, before pruning the departed names.
    pub fn set_subscribed(&self, names: HashSet<String>) {
        self.subscribed.clear();
        for name in names {
            self.subscribed.insert(name);
        }
    }

    /// Remove exactly the given keys; names not present are no-ops
    pub fn prune(&self, names: &HashSet<String>) {
        for name in names {
            if self.samples.remove(name).is_some() {
                debug!(name = %name, "Pruned live-state entry");
            }
        }
    }

    /// Latest sample for one entity (owned copy)
    pub fn get(&self, name: &str) -> Option<LiveSample> {
        self.samples.get(name).map(|s| s.clone())
    }

    /// Read-only copy of the current live state for the rendering layer.
    ///
    /// An owned map, never a live-mutable view: callers cannot corrupt
    /// store state through it.
    pub fn snapshot_view(&self) -> HashMap<String, LiveSample> {
        self.samples
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Subscribe to applied samples
    pub fn subscribe_updates(&self) -> broadcast::Receiver<LiveSample> {
        self.update_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for LiveStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, latitude: f64) -> LiveSample {
        LiveSample {
            name: name.to_string(),
            latitude,
            longitude: -123.3,
            heading: 90.0,
            measurement: 10.0,
            correlation_id: format!("v-{name}-{latitude}"),
            received_at: chrono::Utc::now(),
        }
    }

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn apply_for_never_subscribed_name_is_noop() {
        let store = LiveStateStore::new();

        assert!(!store.apply(sample("ghost", 1.0)));
        assert!(store.is_empty());
    }

    #[test]
    fn apply_upserts_subscribed_name_last_write_wins() {
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["truck-1"]));

        assert!(store.apply(sample("truck-1", 1.0)));
        assert!(store.apply(sample("truck-1", 2.0)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("truck-1").unwrap().latitude, 2.0);
    }

    #[test]
    fn prune_removes_keys_and_tolerates_missing() {
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["a", "b"]));
        store.apply(sample("a", 1.0));
        store.apply(sample("b", 1.0));

        store.prune(&names(&["a", "not-present"]));

        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
    }

    #[test]
    fn replacing_membership_gates_future_applies() {
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["a", "b"]));
        assert!(store.apply(sample("a", 1.0)));

        // Shrink membership; "a" is gated out even before any prune
        store.set_subscribed(names(&["b"]));
        assert!(!store.apply(sample("a", 2.0)));
        assert!(store.apply(sample("b", 1.0)));
        assert_eq!(store.get("a").unwrap().latitude, 1.0);
    }

    #[test]
    fn late_push_after_prune_is_dropped() {
        // Push already in transit when the prune executed
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["a", "b"]));
        store.apply(sample("a", 1.0));

        store.set_subscribed(names(&["b"]));
        store.prune(&names(&["a"]));

        assert!(!store.apply(sample("a", 2.0)));
        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn snapshot_view_is_an_owned_copy() {
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["a"]));
        store.apply(sample("a", 1.0));

        let mut view = store.snapshot_view();
        view.remove("a");
        view.insert("injected".to_string(), sample("injected", 9.0));

        // Store state unaffected by mutations of the view
        assert!(store.get("a").is_some());
        assert!(store.get("injected").is_none());
    }

    #[tokio::test]
    async fn applied_samples_are_broadcast() {
        let store = LiveStateStore::new();
        store.set_subscribed(names(&["a"]));
        let mut rx = store.subscribe_updates();

        store.apply(sample("a", 1.0));
        assert_eq!(rx.try_recv().unwrap().name, "a");

        // Dropped samples are not broadcast
        store.apply(sample("ghost", 1.0));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
