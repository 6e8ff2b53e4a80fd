#![doc = r"Core of the asynchronous debug tree viewer."]
//!
//! [`AsyncTreeViewer`] mirrors a lazily fetched, externally owned element
//! hierarchy into a [`TreeWidget`]. Labels and children are produced by
//! [`PresentationAdapter`]s on whatever thread they like; results are queued
//! and applied on the thread that owns the viewer when the host calls
//! [`AsyncTreeViewer::dispatch_pending`].

pub mod collections;
pub mod element;
pub mod images;
pub mod ledger;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod update;
pub mod viewer;
pub mod widget;

pub use element::{
    Adaptable, AdapterLookup, CapabilityLookup, Element, PresentationAdapter,
    PresentationContext, SharedAdapter,
};
pub use images::ImageCache;
pub use ledger::{PendingUpdates, UpdateId, UpdateKind, UpdateState};
pub use platform::{PollingScheduler, UiScheduler};
pub use reconcile::ReconcileStats;
pub use registry::ElementRegistry;
pub use update::{ChildEntry, ChildrenUpdate, Label, LabelUpdate};
pub use viewer::{AsyncTreeViewer, TreeEvent, ViewerOptions, ViewerState};
pub use widget::{ImageDescriptor, ImageHandle, MemoryTree, TreeStats, TreeWidget, WidgetError};

/// Handle of a node inside a [`TreeWidget`]. The root control is a node too.
pub type NodeId = usize;
