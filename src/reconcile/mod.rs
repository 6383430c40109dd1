use std::collections::HashSet;

/// Corrective actions produced by one reconciliation pass.
///
/// The two sets are always disjoint: a name is either newly observed,
/// newly gone, or unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionDelta {
    pub to_subscribe: HashSet<String>,
    pub to_unsubscribe: HashSet<String>,
}

impl SubscriptionDelta {
    pub fn is_empty(&self) -> bool {
        self.to_subscribe.is_empty() && self.to_unsubscribe.is_empty()
    }
}

/// Tracks the committed push-subscription set and diffs it against each
/// incoming snapshot's name set.
///
/// Callers issue the channel subscribe/unsubscribe calls and store pruning
/// for a delta BEFORE calling `commit`. If the transport fails mid-pass the
/// committed set is unchanged, so the next poll tick recomputes the same
/// delta and re-issues it (degraded, self-healing, never corrupt).
#[derive(Debug, Default)]
pub struct SubscriptionReconciler {
    committed: HashSet<String>,
}

impl SubscriptionReconciler {
    pub fn new() -> Self {
        Self {
            committed: HashSet::new(),
        }
    }

    /// The last-committed subscription set
    pub fn committed(&self) -> &HashSet<String> {
        &self.committed
    }

    /// Pure set difference: what to add and what to drop to move
    /// `current` to `target`. O(n), no ordering.
    pub fn diff(current: &HashSet<String>, target: &HashSet<String>) -> SubscriptionDelta {
        SubscriptionDelta {
            to_subscribe: target.difference(current).cloned().collect(),
            to_unsubscribe: current.difference(target).cloned().collect(),
        }
    }

    /// Compute the delta from the committed set to `target`.
    ///
    /// Called exactly once per snapshot arrival, with that snapshot's
    /// name set as `target`. Does not mutate the committed set.
    pub fn reconcile(&self, target: &HashSet<String>) -> SubscriptionDelta {
        Self::diff(&self.committed, target)
    }

    /// Replace the committed set with `target` after the delta's channel
    /// calls and store pruning have been issued.
    pub fn commit(&mut self, target: HashSet<String>) {
        self.committed = target;
    }
}
