//! Platform abstraction traits for the viewer's UI-affinity thread.
//!
//! The viewer never blocks and never spawns threads itself. Adapters complete
//! updates from whatever thread they like; the completed results are queued
//! and the host is asked, through [`UiScheduler`], to call
//! [`AsyncTreeViewer::dispatch_pending`](crate::AsyncTreeViewer::dispatch_pending)
//! on the thread that owns the widget.

/// Wakes the host's UI loop when queued work is waiting for it.
///
/// Implementations must be safe to call from any thread. They should not run
/// the work inline; the viewer can only be touched from the UI thread.
pub trait UiScheduler: Send + Sync {
    /// Request that the host drain the viewer's pending completions.
    fn request_dispatch(&self);
}

/// Scheduler that never wakes anyone; hosts poll `dispatch_pending` instead.
#[derive(Debug, Default)]
pub struct PollingScheduler;

impl UiScheduler for PollingScheduler {
    fn request_dispatch(&self) {}
}
