//! Bookkeeping for in-flight label and children requests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::NodeId;

pub type UpdateId = u64;

static NEXT_UPDATE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Label,
    Children,
}

/// Shared state of one outstanding request.
///
/// The viewer and the adapter's update handle both hold it; the adapter reads
/// the cancel flag, the viewer sets it.
#[derive(Debug)]
pub struct UpdateState {
    id: UpdateId,
    node: NodeId,
    kind: UpdateKind,
    /// Root-first chain of nodes ending with `node`.
    path: Vec<NodeId>,
    canceled: AtomicBool,
    completed: AtomicBool,
}

impl UpdateState {
    pub(crate) fn new(kind: UpdateKind, path: Vec<NodeId>) -> Self {
        let node = path.last().copied().unwrap_or_default();
        Self {
            id: NEXT_UPDATE_ID.fetch_add(1, Ordering::Relaxed),
            node,
            kind,
            path,
            canceled: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> UpdateId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Returns `true` if this call canceled the update.
    pub(crate) fn cancel(&self) -> bool {
        !self.canceled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }

    /// Whether `node` is this update's target or one of its ancestors.
    pub fn is_within(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    /// A label update replaces the previous label update of the same node. A
    /// children update replaces the previous children update of the same node
    /// and every update aimed below it, since those nodes may not survive.
    fn supersedes(&self, pending: &UpdateState) -> bool {
        if pending.node == self.node {
            return pending.kind == self.kind;
        }
        self.kind == UpdateKind::Children && pending.is_within(self.node)
    }
}

/// The pending-update ledger.
///
/// Cloning shares the same ledger. Every operation takes the lock briefly and
/// is safe to call from any thread.
#[derive(Clone, Debug, Default)]
pub struct PendingUpdates {
    entries: Arc<Mutex<Vec<Arc<UpdateState>>>>,
}

impl PendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels and evicts every entry the new update supersedes, then records
    /// it. Returns the number of entries canceled.
    pub fn schedule(&self, update: Arc<UpdateState>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|pending| {
            if update.supersedes(pending) {
                pending.cancel();
                false
            } else {
                true
            }
        });
        let canceled = before - entries.len();
        if canceled > 0 {
            log::trace!(
                "update {} on node {} superseded {canceled} pending update(s)",
                update.id,
                update.node
            );
        }
        entries.push(update);
        canceled
    }

    /// Removes the update. Returns `false` when it was no longer recorded.
    pub fn complete(&self, update: &UpdateState) -> bool {
        update.mark_completed();
        let mut entries = self.entries.lock();
        match entries.iter().position(|pending| pending.id == update.id) {
            Some(index) => {
                entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Cancels and evicts every entry aimed at `node` or below it.
    pub fn cancel_subtree(&self, node: NodeId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|pending| {
            if pending.is_within(node) {
                pending.cancel();
                false
            } else {
                true
            }
        });
        before - entries.len()
    }

    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.entries.lock().drain(..).collect();
        for pending in &drained {
            pending.cancel();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: UpdateId) -> bool {
        self.entries.lock().iter().any(|pending| pending.id == id)
    }

    /// Whether a live update of `kind` targets `node`.
    pub fn has_pending(&self, node: NodeId, kind: UpdateKind) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|pending| pending.node == node && pending.kind == kind)
    }

    pub fn has_kind(&self, kind: UpdateKind) -> bool {
        self.entries.lock().iter().any(|pending| pending.kind == kind)
    }

    /// Copies the current entries.
    pub fn snapshot(&self) -> Vec<Arc<UpdateState>> {
        self.entries.lock().clone()
    }
}

#[cfg(test)]
#[path = "tests/ledger_tests.rs"]
mod tests;
