//! Positional diff between a node's native children and a fetched child list.
//!
//! Children are matched by index only. A child that moved is treated as a
//! different element at each slot it passes through: the slot's node is
//! remapped rather than searched for elsewhere. This keeps a reconcile pass
//! linear in the number of children.

use crate::element::Element;
use crate::ledger::PendingUpdates;
use crate::registry::ElementRegistry;
use crate::update::ChildEntry;
use crate::widget::{TreeWidget, WidgetError};
use crate::NodeId;

/// Node churn produced by one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub disposed: usize,
    pub remapped: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// The node now occupying each slot of the new child list.
    pub slots: Vec<NodeId>,
    /// Every node disposed during the pass.
    pub disposed: Vec<NodeId>,
    pub stats: ReconcileStats,
}

/// Applies a fetched child list to `parent`'s native children.
pub struct Reconciler<'a, E: Element, W: TreeWidget + ?Sized> {
    pub registry: &'a mut ElementRegistry<E>,
    pub widget: &'a mut W,
    pub pending: &'a PendingUpdates,
}

impl<'a, E: Element, W: TreeWidget + ?Sized> Reconciler<'a, E, W> {
    pub fn new(
        registry: &'a mut ElementRegistry<E>,
        widget: &'a mut W,
        pending: &'a PendingUpdates,
    ) -> Self {
        Self {
            registry,
            widget,
            pending,
        }
    }

    pub fn reconcile(
        &mut self,
        parent: NodeId,
        children: &[ChildEntry<E>],
    ) -> Result<ReconcileOutcome, WidgetError> {
        let old = self.widget.children(parent)?;
        let mut outcome = ReconcileOutcome {
            slots: Vec::with_capacity(children.len()),
            ..ReconcileOutcome::default()
        };

        for (index, child) in children.iter().enumerate() {
            let node = match old.get(index) {
                Some(&node) => {
                    self.reuse(node, child, &mut outcome)?;
                    node
                }
                None => {
                    let node = self.widget.create_node(parent, Some(index))?;
                    outcome.stats.created += 1;
                    self.registry.map(child.element.clone(), node);
                    if child.has_children {
                        self.widget.create_node(node, None)?;
                        outcome.stats.created += 1;
                    }
                    node
                }
            };
            outcome.slots.push(node);
        }

        for &leftover in old.iter().skip(children.len()) {
            self.discard(leftover, &mut outcome);
        }

        outcome.stats.disposed = outcome.disposed.len();
        Ok(outcome)
    }

    fn reuse(
        &mut self,
        node: NodeId,
        child: &ChildEntry<E>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), WidgetError> {
        if self.registry.element_of(node) != Some(&child.element) {
            // Whatever was in flight for the old element is now meaningless.
            self.pending.cancel_subtree(node);
            let disposed = self.registry.unmap(node, &mut *self.widget);
            outcome.disposed.extend(disposed);
            // The new element starts collapsed, like a freshly created slot.
            self.widget.set_expanded(node, false)?;
            self.registry.map(child.element.clone(), node);
            outcome.stats.remapped += 1;
        }

        let count = self.widget.child_count(node)?;
        if !child.has_children && count > 0 {
            for grandchild in self.widget.children(node)? {
                self.discard(grandchild, outcome);
            }
            self.widget.set_expanded(node, false)?;
        } else if child.has_children && count == 0 {
            self.widget.create_node(node, None)?;
            outcome.stats.created += 1;
        }
        Ok(())
    }

    fn discard(&mut self, node: NodeId, outcome: &mut ReconcileOutcome) {
        self.pending.cancel_subtree(node);
        let disposed = self.registry.discard(node, &mut *self.widget);
        outcome.disposed.extend(disposed);
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
