//! The slice of a debug model the actions operate on.

use std::fmt;
use std::sync::Arc;

/// Failure reported by a debug target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebugError {
    #[error("{element} is not responding")]
    NotResponding { element: String },
    #[error("{element} has already terminated")]
    AlreadyTerminated { element: String },
    #[error("request to {element} failed: {message}")]
    RequestFailed { element: String, message: String },
}

/// Capability of elements that can be terminated.
pub trait Terminate: Send + Sync {
    fn can_terminate(&self) -> bool;

    fn is_terminated(&self) -> bool;

    fn terminate(&self) -> Result<(), DebugError>;
}

/// An element of a debug model: launch, target, process, thread or frame.
///
/// Capabilities are discovered through the `as_*` methods, which return
/// `None` unless the element supports them.
pub trait DebugElement: Send + Sync + fmt::Debug {
    fn name(&self) -> String;

    fn as_terminate(&self) -> Option<&dyn Terminate> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DebugEventKind {
    Create,
    Terminate,
    Suspend,
    Resume,
    Change,
}

/// Notification fired by a debug model when one of its elements changes.
#[derive(Clone, Debug)]
pub struct DebugEvent {
    kind: DebugEventKind,
    source: Arc<dyn DebugElement>,
}

impl DebugEvent {
    pub fn new(kind: DebugEventKind, source: Arc<dyn DebugElement>) -> Self {
        Self { kind, source }
    }

    pub fn kind(&self) -> DebugEventKind {
        self.kind
    }

    pub fn source(&self) -> &Arc<dyn DebugElement> {
        &self.source
    }
}
