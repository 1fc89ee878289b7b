use std::sync::Arc;
use std::time::Instant;

use super::classifier::EventClassifier;
use super::ledger::ChangeLedger;
use super::types::{ChangeKind, Origin, TrackedChange};
use crate::core::ServerContext;
use crate::protocol::TreeKind;

/// Applies classified changes to the trees and decides which ones become
/// RELOAD pushes.
///
/// Pipeline: classify → update tree (rescan / refresh / purge) → ledger gate
pub(super) struct ChangeProcessor {
    ctx: Arc<ServerContext>,
    classifier: EventClassifier,
    ledger: ChangeLedger,
}

impl ChangeProcessor {
    pub(super) fn new(ctx: Arc<ServerContext>) -> Self {
        let classifier = EventClassifier::new(&ctx.config);
        let ledger = ChangeLedger::new(ctx.config.serve.notify_window());
        Self {
            ctx,
            classifier,
            ledger,
        }
    }

    /// Process one raw event observed at `now`, returning the reload paths
    /// to broadcast.
    pub(super) fn process(&mut self, event: &notify::Event, now: Instant) -> Vec<String> {
        self.classifier
            .classify(event)
            .into_iter()
            .filter_map(|change| self.apply(change, now))
            .collect()
    }

    fn apply(&mut self, change: TrackedChange, now: Instant) -> Option<String> {
        if let Origin::Tree(kind) = change.origin
            && !self.update_tree(kind, &change)
        {
            return None;
        }

        if !self.ledger.should_notify(&change.key, now) {
            crate::debug!("watch"; "debounced {}: {}", change.kind.label(), change.key);
            return None;
        }

        crate::log!("watch"; "{}: {}", change.kind.label(), change.key);
        Some(change.reload_path)
    }

    /// Bring the tree in line with the change. Returns `false` when the
    /// change concerns nothing tracked (e.g. removal of an unknown path).
    fn update_tree(&self, kind: TreeKind, change: &TrackedChange) -> bool {
        let mut tracker = self.ctx.tracker.write();

        match change.kind {
            ChangeKind::Removed => {
                if tracker.tree_mut(kind).remove(&change.key).is_none() {
                    return false;
                }
                crate::debug!("watch"; "purged {} entry: {}", kind.label(), change.key);
                true
            }
            ChangeKind::Created | ChangeKind::Modified => {
                if tracker.refresh(kind, &change.key, &change.path) {
                    return true;
                }
                let added = tracker.rescan(kind);
                if !added.is_empty() {
                    crate::log!("watch"; "updated {} tree: {:?}", kind.label(), added);
                }
                tracker.tree(kind).contains(&change.key)
            }
        }
    }
}
