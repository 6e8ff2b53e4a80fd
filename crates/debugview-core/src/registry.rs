//! Element ↔ widget node association.

use indexmap::IndexSet;

use crate::collections::map::HashMap;
use crate::element::Element;
use crate::widget::TreeWidget;
use crate::NodeId;

/// Which nodes currently show which element.
///
/// An element can be shown at several positions in the tree, so each element
/// maps to an ordered set of nodes. Nodes without an element (placeholders)
/// are not tracked. An element whose last node is unmapped is forgotten.
#[derive(Debug)]
pub struct ElementRegistry<E: Element> {
    widgets: HashMap<E, IndexSet<NodeId>>,
    elements: HashMap<NodeId, E>,
}

impl<E: Element> Default for ElementRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element> ElementRegistry<E> {
    pub fn new() -> Self {
        Self {
            widgets: HashMap::default(),
            elements: HashMap::default(),
        }
    }

    /// Associates `node` with `element`. A node already showing another
    /// element is detached from it first.
    pub fn map(&mut self, element: E, node: NodeId) {
        if let Some(previous) = self.elements.get(&node) {
            if *previous == element {
                return;
            }
            self.detach(node);
        }
        self.widgets
            .entry(element.clone())
            .or_default()
            .insert(node);
        self.elements.insert(node, element);
    }

    /// Forgets `node`'s element, then unmaps and disposes every descendant of
    /// `node`. `node` itself stays alive. Returns the disposed descendants.
    pub fn unmap<W: TreeWidget + ?Sized>(&mut self, node: NodeId, widget: &mut W) -> Vec<NodeId> {
        self.detach(node);
        let mut disposed = Vec::new();
        self.dispose_children(node, widget, &mut disposed);
        disposed
    }

    /// Unmaps `node` and disposes it along with its subtree. Returns every
    /// disposed node, `node` first.
    pub fn discard<W: TreeWidget + ?Sized>(&mut self, node: NodeId, widget: &mut W) -> Vec<NodeId> {
        let mut disposed = vec![node];
        disposed.extend(self.unmap(node, widget));
        if let Err(err) = widget.dispose_node(node) {
            log::debug!("failed to dispose node {node}: {err}");
        }
        disposed
    }

    fn dispose_children<W: TreeWidget + ?Sized>(
        &mut self,
        node: NodeId,
        widget: &mut W,
        disposed: &mut Vec<NodeId>,
    ) {
        let children = match widget.children(node) {
            Ok(children) => children,
            Err(err) => {
                log::trace!("no children to unmap under node {node}: {err}");
                return;
            }
        };
        for child in children {
            self.detach(child);
            self.dispose_children(child, widget, disposed);
            if let Err(err) = widget.dispose_node(child) {
                log::debug!("failed to dispose node {child}: {err}");
            }
            disposed.push(child);
        }
    }

    fn detach(&mut self, node: NodeId) -> Option<E> {
        let element = self.elements.remove(&node)?;
        if let Some(nodes) = self.widgets.get_mut(&element) {
            nodes.shift_remove(&node);
            if nodes.is_empty() {
                self.widgets.remove(&element);
            }
        }
        Some(element)
    }

    /// Disposes every node below the widget's root and forgets all
    /// associations, the root's included.
    pub fn unmap_all<W: TreeWidget + ?Sized>(&mut self, widget: &mut W) -> usize {
        let root = widget.root();
        let mut disposed = 0;
        if !widget.is_disposed(root) {
            if let Ok(children) = widget.children(root) {
                for child in children {
                    match widget.dispose_node(child) {
                        Ok(()) => disposed += 1,
                        Err(err) => log::debug!("failed to dispose node {child}: {err}"),
                    }
                }
            }
        }
        self.clear();
        disposed
    }

    /// Forgets every association without touching the widget.
    pub fn clear(&mut self) {
        self.widgets.clear();
        self.elements.clear();
    }

    /// Nodes currently showing `element`, in mapping order.
    pub fn widgets_for(&self, element: &E) -> Option<&IndexSet<NodeId>> {
        self.widgets.get(element)
    }

    pub fn nodes_for(&self, element: &E) -> Vec<NodeId> {
        self.widgets
            .get(element)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn element_of(&self, node: NodeId) -> Option<&E> {
        self.elements.get(&node)
    }

    pub fn contains(&self, element: &E) -> bool {
        self.widgets.contains_key(element)
    }

    /// Number of distinct elements shown.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.elements.len()
    }

    /// Checks that both directions of the mapping agree.
    pub fn is_consistent(&self) -> bool {
        let forward: usize = self.widgets.values().map(IndexSet::len).sum();
        forward == self.elements.len()
            && self.widgets.values().all(|nodes| !nodes.is_empty())
            && self.elements.iter().all(|(node, element)| {
                self.widgets
                    .get(element)
                    .is_some_and(|nodes| nodes.contains(node))
            })
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
