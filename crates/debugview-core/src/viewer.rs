//! The viewer facade.

use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use crate::element::{AdapterLookup, Element, PresentationAdapter, PresentationContext};
use crate::images::ImageCache;
use crate::ledger::{PendingUpdates, UpdateKind, UpdateState};
use crate::platform::UiScheduler;
use crate::reconcile::Reconciler;
use crate::registry::ElementRegistry;
use crate::update::{ChildEntry, ChildrenUpdate, Completion, Label, LabelUpdate, Outbox};
use crate::widget::{TreeWidget, WidgetError};
use crate::NodeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Handed to adapters in every [`PresentationContext`].
    pub context_id: String,
    /// Fetch children when the user expands a node.
    pub refresh_on_expand: bool,
    /// Levels below the root expanded as soon as their children arrive.
    pub auto_expand_level: usize,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            context_id: "debugview.tree".to_owned(),
            refresh_on_expand: true,
            auto_expand_level: 0,
        }
    }
}

impl ViewerOptions {
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    pub fn with_refresh_on_expand(mut self, refresh_on_expand: bool) -> Self {
        self.refresh_on_expand = refresh_on_expand;
        self
    }

    pub fn with_auto_expand_level(mut self, level: usize) -> Self {
        self.auto_expand_level = level;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerState {
    NoInput,
    InputSet,
    /// At least one children request is in flight.
    Refreshing,
    /// Only label requests are in flight.
    Updating,
    Disposed,
}

/// Events the host forwards from the native control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    Expanded(NodeId),
    Collapsed(NodeId),
    Disposed,
}

struct PendingExpansion<E> {
    path: Vec<E>,
    select: bool,
}

/// Keeps a [`TreeWidget`] in sync with a lazily fetched element hierarchy.
///
/// Refresh and update calls return immediately after handing requests to the
/// presentation adapters. Results are applied by [`dispatch_pending`], which
/// the host calls on the viewer's thread whenever its [`UiScheduler`] asks.
/// The viewer is neither `Send` nor `Sync`.
///
/// [`dispatch_pending`]: AsyncTreeViewer::dispatch_pending
pub struct AsyncTreeViewer<E: Element, W: TreeWidget> {
    widget: W,
    lookup: Arc<dyn AdapterLookup<E>>,
    options: ViewerOptions,
    context: PresentationContext,
    input: Option<E>,
    registry: ElementRegistry<E>,
    pending: PendingUpdates,
    images: ImageCache,
    outbox: Outbox<E>,
    inbox: flume::Receiver<Completion<E>>,
    selection: Vec<NodeId>,
    expansions: Vec<PendingExpansion<E>>,
    disposed: bool,
    _ui_thread: PhantomData<Rc<()>>,
}

impl<E: Element, W: TreeWidget> AsyncTreeViewer<E, W> {
    pub fn new(
        widget: W,
        lookup: Arc<dyn AdapterLookup<E>>,
        scheduler: Arc<dyn UiScheduler>,
    ) -> Self {
        Self::with_options(widget, lookup, scheduler, ViewerOptions::default())
    }

    pub fn with_options(
        widget: W,
        lookup: Arc<dyn AdapterLookup<E>>,
        scheduler: Arc<dyn UiScheduler>,
        options: ViewerOptions,
    ) -> Self {
        let (sender, inbox) = flume::unbounded();
        Self {
            widget,
            lookup,
            context: PresentationContext::new(options.context_id.as_str()),
            options,
            input: None,
            registry: ElementRegistry::new(),
            pending: PendingUpdates::new(),
            images: ImageCache::new(),
            outbox: Outbox::new(sender, scheduler),
            inbox,
            selection: Vec::new(),
            expansions: Vec::new(),
            disposed: false,
            _ui_thread: PhantomData,
        }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn input(&self) -> Option<&E> {
        self.input.as_ref()
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn registry(&self) -> &ElementRegistry<E> {
        &self.registry
    }

    /// The pending-update ledger. The returned handle can be cloned and used
    /// from other threads.
    pub fn pending_updates(&self) -> &PendingUpdates {
        &self.pending
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_update_count(&self) -> usize {
        self.pending.len()
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.images
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn state(&self) -> ViewerState {
        if self.disposed {
            ViewerState::Disposed
        } else if self.input.is_none() {
            ViewerState::NoInput
        } else if self.pending.has_kind(UpdateKind::Children) {
            ViewerState::Refreshing
        } else if self.pending.has_kind(UpdateKind::Label) {
            ViewerState::Updating
        } else {
            ViewerState::InputSet
        }
    }

    /// Replaces the input and rebuilds the tree from scratch.
    ///
    /// Every in-flight update is canceled first, so results still on their
    /// way for the old input are discarded when they arrive.
    pub fn set_input(&mut self, input: impl Into<Option<E>>) {
        if self.disposed {
            log::debug!("ignoring set_input on a disposed viewer");
            return;
        }
        let input = input.into();
        let canceled = self.pending.cancel_all();
        self.expansions.clear();
        self.set_selected_nodes(Vec::new());
        let disposed = self.registry.unmap_all(&mut self.widget);
        log::debug!(
            "input changed to {input:?}: canceled {canceled} update(s), disposed {disposed} node(s)"
        );
        self.input = input;
        if let Some(input) = self.input.clone() {
            self.registry.map(input, self.widget.root());
            self.refresh();
        }
    }

    /// Refreshes the whole tree starting at the input.
    pub fn refresh(&mut self) {
        if let Some(input) = self.input.clone() {
            self.refresh_element(&input);
        }
    }

    /// Refetches the label of every node showing `element`, and the children
    /// of those that are expanded.
    pub fn refresh_element(&mut self, element: &E) {
        if self.disposed {
            return;
        }
        let nodes = self.registry.nodes_for(element);
        if nodes.is_empty() {
            return;
        }
        self.update(element);
        let Some(adapter) = self.adapter_for(element) else {
            return;
        };
        for node in nodes {
            if self.is_root(node) || self.widget.is_expanded(node) {
                self.schedule_children(&adapter, element, node);
            }
        }
    }

    /// Refetches the label of every node showing `element`.
    ///
    /// The root shows the input and has no label of its own, so updating the
    /// input does nothing.
    pub fn update(&mut self, element: &E) {
        if self.disposed || self.input.as_ref() == Some(element) {
            return;
        }
        let nodes = self.registry.nodes_for(element);
        if nodes.is_empty() {
            return;
        }
        let Some(adapter) = self.adapter_for(element) else {
            return;
        };
        for node in nodes {
            self.schedule_label(&adapter, element, node);
        }
    }

    /// Adds the last element of `path` under every node showing its parent
    /// path. The path starts with the input.
    ///
    /// A populated parent gets a new node at the end, with a placeholder so it
    /// can be expanded. A collapsed parent without children just gets a
    /// placeholder; the element shows up when the parent is expanded.
    pub fn add(&mut self, path: &[E]) {
        if self.disposed {
            return;
        }
        let Some((element, parent_path)) = path.split_last() else {
            return;
        };
        for parent in self.find_nodes(parent_path) {
            if let Err(err) = self.add_child(parent, element) {
                log::debug!("failed to add {element:?} under node {parent}: {err}");
            }
        }
    }

    fn add_child(&mut self, parent: NodeId, element: &E) -> Result<(), WidgetError> {
        let children = self.widget.children(parent)?;
        if children
            .iter()
            .any(|&child| self.registry.element_of(child) == Some(element))
        {
            return Ok(());
        }
        if !self.is_root(parent) && !self.widget.is_expanded(parent) {
            if children.is_empty() {
                self.widget.create_node(parent, None)?;
            }
            return Ok(());
        }
        let node = self.widget.create_node(parent, None)?;
        self.registry.map(element.clone(), node);
        self.widget.create_node(node, None)?;
        self.refresh_node(node);
        Ok(())
    }

    /// Removes every occurrence of `element`. The input cannot be removed.
    pub fn remove(&mut self, element: &E) {
        if self.disposed {
            return;
        }
        if self.input.as_ref() == Some(element) {
            log::debug!("the input cannot be removed; use set_input instead");
            return;
        }
        let nodes = self.registry.nodes_for(element);
        self.remove_nodes(&nodes);
    }

    /// Removes the node at `path` only, leaving other occurrences of its
    /// element alone.
    pub fn remove_path(&mut self, path: &[E]) {
        if self.disposed || path.len() < 2 {
            return;
        }
        let nodes = self.find_nodes(path);
        self.remove_nodes(&nodes);
    }

    fn remove_nodes(&mut self, nodes: &[NodeId]) {
        let mut disposed = Vec::new();
        for &node in nodes {
            // an earlier removal may already have taken this node with it
            if self.is_root(node) || self.widget.is_disposed(node) {
                continue;
            }
            self.pending.cancel_subtree(node);
            disposed.extend(self.registry.discard(node, &mut self.widget));
        }
        self.forget_selected(&disposed);
    }

    /// Expands every element along `path`, fetching children as needed.
    /// Elements that have not been fetched yet are expanded once they arrive.
    pub fn expand(&mut self, path: &[E]) {
        self.queue_expansion(path, false);
    }

    /// Selects the last element of `path`, expanding its ancestors as needed.
    pub fn select(&mut self, path: &[E]) {
        self.queue_expansion(path, true);
    }

    /// Selects every node showing one of `elements`. With `reveal`, their
    /// ancestors are expanded.
    pub fn set_selection(&mut self, elements: &[E], reveal: bool) {
        if self.disposed {
            return;
        }
        let mut nodes = Vec::new();
        for element in elements {
            for node in self.registry.nodes_for(element) {
                if !self.is_root(node) && !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }
        if reveal {
            for &node in &nodes {
                let path = self.path_to(node);
                let ancestors = path.len().saturating_sub(2);
                for &ancestor in path.iter().skip(1).take(ancestors) {
                    self.expand_node(ancestor);
                }
            }
        }
        self.set_selected_nodes(nodes);
    }

    /// Selected elements, in selection order.
    pub fn selection(&self) -> Vec<E> {
        let mut elements: Vec<E> = Vec::with_capacity(self.selection.len());
        for node in &self.selection {
            if let Some(element) = self.registry.element_of(*node) {
                if !elements.contains(element) {
                    elements.push(element.clone());
                }
            }
        }
        elements
    }

    pub fn handle_event(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::Expanded(node) => {
                if self.disposed || self.widget.is_disposed(node) {
                    return;
                }
                if let Err(err) = self.widget.set_expanded(node, true) {
                    log::debug!("failed to expand node {node}: {err}");
                    return;
                }
                if self.options.refresh_on_expand {
                    self.refresh_node(node);
                }
            }
            TreeEvent::Collapsed(node) => {
                if let Err(err) = self.widget.set_expanded(node, false) {
                    log::debug!("failed to collapse node {node}: {err}");
                }
            }
            TreeEvent::Disposed => self.dispose(),
        }
    }

    /// Applies every completed update waiting in the queue. Must be called on
    /// the viewer's thread; returns the number of updates applied.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.inbox.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Releases cached images, cancels pending updates and clears the
    /// registry. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let canceled = self.pending.cancel_all();
        let released = self.images.release(&mut self.widget);
        self.registry.unmap_all(&mut self.widget);
        self.selection.clear();
        self.expansions.clear();
        let dropped = self.inbox.drain().count();
        log::debug!(
            "viewer disposed: canceled {canceled} update(s), released {released} image(s), dropped {dropped} result(s)"
        );
    }

    fn apply(&mut self, completion: Completion<E>) -> bool {
        let state = Arc::clone(completion.state());
        if self.disposed || state.is_canceled() {
            log::trace!("discarding stale update {}", state.id());
            return false;
        }
        let node = state.node();
        if self.widget.is_disposed(node) {
            log::debug!("update {} targets disposed node {node}", state.id());
            self.pending.complete(&state);
            return false;
        }
        match completion {
            Completion::Label { label, .. } => self.apply_label(node, label),
            Completion::Children { children, .. } => self.apply_children(node, &children),
        }
        self.pending.complete(&state);
        true
    }

    fn apply_label(&mut self, node: NodeId, label: Label) {
        let image = label
            .image
            .as_ref()
            .and_then(|descriptor| self.images.image_for(descriptor, &mut self.widget));
        if let Err(err) = self.widget.set_label(node, label.text.as_deref(), image) {
            log::debug!("failed to label node {node}: {err}");
        }
    }

    fn apply_children(&mut self, node: NodeId, children: &[ChildEntry<E>]) {
        let outcome = match Reconciler::new(&mut self.registry, &mut self.widget, &self.pending)
            .reconcile(node, children)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("failed to reconcile children of node {node}: {err}");
                return;
            }
        };
        log::trace!("reconciled node {node}: {:?}", outcome.stats);
        self.forget_selected(&outcome.disposed);

        let level = self.path_to(node).len();
        let auto_expand = level <= self.options.auto_expand_level;
        for (&slot, child) in outcome.slots.iter().zip(children) {
            if auto_expand && child.has_children && !self.widget.is_expanded(slot) {
                if let Err(err) = self.widget.set_expanded(slot, true) {
                    log::debug!("failed to auto-expand node {slot}: {err}");
                }
            }
            self.refresh_node(slot);
        }
        self.resume_expansions();
    }

    /// Refreshes one node: its label unless it is the root, and its children
    /// if it is the root or expanded.
    fn refresh_node(&mut self, node: NodeId) {
        let Some(element) = self.registry.element_of(node).cloned() else {
            return;
        };
        let Some(adapter) = self.adapter_for(&element) else {
            return;
        };
        let root = self.is_root(node);
        if !root {
            self.schedule_label(&adapter, &element, node);
        }
        if root || self.widget.is_expanded(node) {
            self.schedule_children(&adapter, &element, node);
        }
    }

    fn expand_node(&mut self, node: NodeId) {
        if self.is_root(node) || self.widget.is_expanded(node) {
            return;
        }
        if let Err(err) = self.widget.set_expanded(node, true) {
            log::debug!("failed to expand node {node}: {err}");
            return;
        }
        self.refresh_node(node);
    }

    fn queue_expansion(&mut self, path: &[E], select: bool) {
        if self.disposed || path.is_empty() {
            return;
        }
        if select {
            self.expansions.retain(|expansion| !expansion.select);
        }
        self.expansions.push(PendingExpansion {
            path: path.to_vec(),
            select,
        });
        self.resume_expansions();
    }

    fn resume_expansions(&mut self) {
        if self.expansions.is_empty() {
            return;
        }
        for expansion in std::mem::take(&mut self.expansions) {
            if !self.advance(&expansion) {
                self.expansions.push(expansion);
            }
        }
    }

    /// Walks as far along the expansion's path as the tree allows. Returns
    /// `true` once the expansion is finished or can never finish.
    fn advance(&mut self, expansion: &PendingExpansion<E>) -> bool {
        let path = &expansion.path;
        if self.input.as_ref() != path.first() {
            return true;
        }
        let last = path.len() - 1;
        let mut current = vec![self.widget.root()];
        for (depth, element) in path.iter().enumerate().skip(1) {
            let found = self.child_nodes(&current, element);
            if found.is_empty() {
                let fetching = current
                    .iter()
                    .any(|&node| self.pending.has_pending(node, UpdateKind::Children));
                if !fetching {
                    log::debug!("giving up on path {path:?}: {element:?} not found");
                }
                return !fetching;
            }
            current = found;
            if depth < last || !expansion.select {
                for &node in &current {
                    self.expand_node(node);
                }
            }
        }
        if expansion.select && last > 0 {
            self.set_selected_nodes(current);
        }
        true
    }

    fn find_nodes(&self, path: &[E]) -> Vec<NodeId> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        if self.input.as_ref() != Some(first) {
            return Vec::new();
        }
        let mut current = vec![self.widget.root()];
        for element in rest {
            current = self.child_nodes(&current, element);
            if current.is_empty() {
                break;
            }
        }
        current
    }

    fn child_nodes(&self, parents: &[NodeId], element: &E) -> Vec<NodeId> {
        self.registry
            .nodes_for(element)
            .into_iter()
            .filter(|&node| {
                self.widget
                    .parent(node)
                    .is_some_and(|parent| parents.contains(&parent))
            })
            .collect()
    }

    fn set_selected_nodes(&mut self, nodes: Vec<NodeId>) {
        self.selection = nodes;
        self.widget.set_selection(&self.selection);
    }

    fn forget_selected(&mut self, disposed: &[NodeId]) {
        if disposed.is_empty() {
            return;
        }
        let before = self.selection.len();
        self.selection.retain(|node| !disposed.contains(node));
        if self.selection.len() != before {
            self.widget.set_selection(&self.selection);
        }
    }

    fn adapter_for(&self, element: &E) -> Option<Arc<dyn PresentationAdapter<E>>> {
        let adapter = self.lookup.adapter_for(element);
        if adapter.is_none() {
            log::trace!("no presentation adapter for {element:?}");
        }
        adapter
    }

    fn schedule_label(
        &mut self,
        adapter: &Arc<dyn PresentationAdapter<E>>,
        element: &E,
        node: NodeId,
    ) {
        let state = Arc::new(UpdateState::new(UpdateKind::Label, self.path_to(node)));
        self.pending.schedule(Arc::clone(&state));
        adapter.retrieve_label(
            element,
            &self.context,
            LabelUpdate::new(state, self.outbox.clone()),
        );
    }

    fn schedule_children(
        &mut self,
        adapter: &Arc<dyn PresentationAdapter<E>>,
        element: &E,
        node: NodeId,
    ) {
        let state = Arc::new(UpdateState::new(UpdateKind::Children, self.path_to(node)));
        self.pending.schedule(Arc::clone(&state));
        adapter.retrieve_children(
            element,
            &self.context,
            ChildrenUpdate::new(state, self.outbox.clone()),
        );
    }

    /// Root-first chain of nodes ending with `node`.
    fn path_to(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.widget.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    fn is_root(&self, node: NodeId) -> bool {
        node == self.widget.root()
    }
}

impl<E: Element, W: TreeWidget> Drop for AsyncTreeViewer<E, W> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "tests/viewer_tests.rs"]
mod tests;
