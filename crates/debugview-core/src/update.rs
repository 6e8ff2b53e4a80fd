//! Update handles passed to presentation adapters.
//!
//! An adapter fills a handle in and calls `done`, on any thread. `done` only
//! posts the result to the viewer's queue; the viewer applies it later on its
//! own thread, after checking once more that the update was not superseded.

use std::fmt;
use std::sync::Arc;

use crate::ledger::UpdateState;
use crate::platform::UiScheduler;
use crate::widget::ImageDescriptor;
use crate::NodeId;

/// Text and image for one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Label {
    pub text: Option<String>,
    pub image: Option<ImageDescriptor>,
}

/// One child in a children update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildEntry<E> {
    pub element: E,
    /// Whether the child can be expanded further.
    pub has_children: bool,
}

impl<E> ChildEntry<E> {
    pub fn new(element: E, has_children: bool) -> Self {
        Self {
            element,
            has_children,
        }
    }
}

pub(crate) enum Completion<E> {
    Label {
        state: Arc<UpdateState>,
        label: Label,
    },
    Children {
        state: Arc<UpdateState>,
        children: Vec<ChildEntry<E>>,
    },
}

impl<E> Completion<E> {
    pub(crate) fn state(&self) -> &Arc<UpdateState> {
        match self {
            Completion::Label { state, .. } | Completion::Children { state, .. } => state,
        }
    }
}

/// Sending half of the viewer's completion queue.
pub(crate) struct Outbox<E> {
    sender: flume::Sender<Completion<E>>,
    scheduler: Arc<dyn UiScheduler>,
}

impl<E> Clone for Outbox<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<E> Outbox<E> {
    pub(crate) fn new(
        sender: flume::Sender<Completion<E>>,
        scheduler: Arc<dyn UiScheduler>,
    ) -> Self {
        Self { sender, scheduler }
    }

    fn post(&self, completion: Completion<E>) {
        let state = Arc::clone(completion.state());
        if state.is_canceled() {
            log::trace!("dropping result of canceled update {}", state.id());
            return;
        }
        if self.sender.send(completion).is_err() {
            log::trace!("viewer gone, dropping result of update {}", state.id());
            return;
        }
        self.scheduler.request_dispatch();
    }
}

/// Handle for an asynchronous label request.
pub struct LabelUpdate<E> {
    state: Arc<UpdateState>,
    outbox: Outbox<E>,
    label: Label,
}

impl<E> LabelUpdate<E> {
    pub(crate) fn new(state: Arc<UpdateState>, outbox: Outbox<E>) -> Self {
        Self {
            state,
            outbox,
            label: Label::default(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.state.node()
    }

    /// Adapters may poll this to skip work nobody will look at.
    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.label.text = Some(text.into());
    }

    pub fn set_image(&mut self, image: ImageDescriptor) {
        self.label.image = Some(image);
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn done(self) {
        self.outbox.post(Completion::Label {
            state: self.state,
            label: self.label,
        });
    }
}

impl<E> fmt::Debug for LabelUpdate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelUpdate")
            .field("id", &self.state.id())
            .field("node", &self.state.node())
            .field("canceled", &self.state.is_canceled())
            .field("label", &self.label)
            .finish()
    }
}

/// Handle for an asynchronous children request.
pub struct ChildrenUpdate<E> {
    state: Arc<UpdateState>,
    outbox: Outbox<E>,
    children: Vec<ChildEntry<E>>,
}

impl<E> ChildrenUpdate<E> {
    pub(crate) fn new(state: Arc<UpdateState>, outbox: Outbox<E>) -> Self {
        Self {
            state,
            outbox,
            children: Vec::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.state.node()
    }

    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    pub fn add_child(&mut self, element: E, has_children: bool) {
        self.children.push(ChildEntry::new(element, has_children));
    }

    /// Replaces the children gathered so far.
    pub fn set_children(&mut self, children: impl IntoIterator<Item = (E, bool)>) {
        self.children = children
            .into_iter()
            .map(|(element, has_children)| ChildEntry::new(element, has_children))
            .collect();
    }

    pub fn done(self) {
        self.outbox.post(Completion::Children {
            state: self.state,
            children: self.children,
        });
    }
}

impl<E: fmt::Debug> fmt::Debug for ChildrenUpdate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildrenUpdate")
            .field("id", &self.state.id())
            .field("node", &self.state.node())
            .field("canceled", &self.state.is_canceled())
            .field("children", &self.children)
            .finish()
    }
}
