//! Model elements and the capabilities that present them.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::update::{ChildrenUpdate, LabelUpdate};

/// A value displayed by the viewer.
///
/// Elements are compared by value: two equal elements resolve to the same
/// registry entry even when they are distinct instances.
pub trait Element: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Context handed to adapters with every request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PresentationContext {
    id: Arc<str>,
}

impl PresentationContext {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    /// Identifier of the viewer issuing the request.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Asynchronously produces the label and children of an element.
///
/// Both methods must return promptly. The update handle may be completed
/// later, from any thread, by calling its `done` method. An update that is
/// never completed stays pending until it is superseded or the viewer drops
/// its input.
pub trait PresentationAdapter<E>: Send + Sync {
    fn retrieve_label(&self, element: &E, context: &PresentationContext, update: LabelUpdate<E>);

    fn retrieve_children(
        &self,
        element: &E,
        context: &PresentationContext,
        update: ChildrenUpdate<E>,
    );
}

/// Elements that can hand out their own presentation adapter.
pub trait Adaptable: Sized {
    fn presentation_adapter(&self) -> Option<Arc<dyn PresentationAdapter<Self>>>;
}

/// Resolves the presentation adapter for an element.
pub trait AdapterLookup<E>: Send + Sync {
    fn adapter_for(&self, element: &E) -> Option<Arc<dyn PresentationAdapter<E>>>;
}

/// Lookup that asks the element itself through [`Adaptable`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CapabilityLookup;

impl<E: Adaptable> AdapterLookup<E> for CapabilityLookup {
    fn adapter_for(&self, element: &E) -> Option<Arc<dyn PresentationAdapter<E>>> {
        element.presentation_adapter()
    }
}

/// Lookup that presents every element with the same adapter.
pub struct SharedAdapter<E> {
    adapter: Arc<dyn PresentationAdapter<E>>,
}

impl<E> SharedAdapter<E> {
    pub fn new(adapter: Arc<dyn PresentationAdapter<E>>) -> Self {
        Self { adapter }
    }
}

impl<E> Clone for SharedAdapter<E> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<E> AdapterLookup<E> for SharedAdapter<E> {
    fn adapter_for(&self, _element: &E) -> Option<Arc<dyn PresentationAdapter<E>>> {
        Some(Arc::clone(&self.adapter))
    }
}
