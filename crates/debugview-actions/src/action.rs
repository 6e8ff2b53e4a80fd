//! Selection-driven debug actions.
//!
//! A [`DebugActionDelegate`] says what an action does to one element and how
//! its failures are worded. [`DebugAction`] owns the selection, derives
//! enablement from it and runs the delegate over every selected element,
//! either inline or on a worker pool.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use debugview_runtime_std::WorkerHandle;
use parking_lot::RwLock;

use crate::model::{DebugElement, DebugError, DebugEvent, DebugEventKind};

pub type Selection = Vec<Arc<dyn DebugElement>>;

pub trait DebugActionDelegate: Send + Sync {
    fn is_enabled_for(&self, element: &dyn DebugElement) -> bool;

    /// Performs the action on one element. Elements the action does not
    /// apply to are skipped.
    fn do_action(&self, element: &dyn DebugElement) -> Result<(), DebugError>;

    fn is_run_in_background(&self) -> bool {
        false
    }

    /// Status line summarizing a run with failures.
    fn status_message(&self) -> &'static str;

    fn error_dialog_title(&self) -> &'static str;

    fn error_dialog_message(&self) -> &'static str;

    /// Debug events after which enablement must be recomputed.
    fn refreshes_on(&self, _kind: DebugEventKind) -> bool {
        false
    }
}

/// One element an action failed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFailure {
    pub element: String,
    pub error: DebugError,
}

/// Outcome of a run that failed on at least one element.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_message}")]
pub struct ActionFailure {
    pub status_message: String,
    pub dialog_title: String,
    pub dialog_message: String,
    pub causes: Vec<ElementFailure>,
}

pub struct DebugAction<D> {
    delegate: Arc<D>,
    selection: RwLock<Selection>,
    enabled: AtomicBool,
}

impl<D: DebugActionDelegate + 'static> DebugAction<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            delegate: Arc::new(delegate),
            selection: RwLock::new(Vec::new()),
            enabled: AtomicBool::new(false),
        }
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn selection(&self) -> Selection {
        self.selection.read().clone()
    }

    /// Enabled for a non-empty selection whose every element is enabled.
    pub fn is_enabled_for_selection(&self, selection: &[Arc<dyn DebugElement>]) -> bool {
        !selection.is_empty()
            && selection
                .iter()
                .all(|element| self.delegate.is_enabled_for(element.as_ref()))
    }

    pub fn selection_changed(&self, selection: Selection) {
        let enabled = self.is_enabled_for_selection(&selection);
        *self.selection.write() = selection;
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Recomputes enablement if `event` is one the delegate listens for.
    pub fn handle_debug_event(&self, event: &DebugEvent) {
        if !self.delegate.refreshes_on(event.kind()) {
            return;
        }
        let enabled = self.is_enabled_for_selection(&self.selection.read());
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            log::debug!(
                "action {} after {:?} of {}",
                if enabled { "enabled" } else { "disabled" },
                event.kind(),
                event.source().name()
            );
        }
    }

    /// Runs the delegate over `selection` on the calling thread.
    pub fn run(&self, selection: &[Arc<dyn DebugElement>]) -> Result<(), ActionFailure> {
        run_delegate(self.delegate.as_ref(), selection)
    }

    /// Runs the delegate over `selection` on `workers` and hands the outcome
    /// to `done` there. Returns `false` if the pool refused the job.
    pub fn run_in_background(
        &self,
        workers: &WorkerHandle,
        selection: Selection,
        done: impl FnOnce(Result<(), ActionFailure>) + Send + 'static,
    ) -> bool {
        let delegate = Arc::clone(&self.delegate);
        workers.spawn(move || done(run_delegate(delegate.as_ref(), &selection)))
    }

    /// Runs over the current selection, in the background when the delegate
    /// asks for it.
    pub fn run_selection(
        &self,
        workers: &WorkerHandle,
        done: impl FnOnce(Result<(), ActionFailure>) + Send + 'static,
    ) {
        if !self.is_enabled() {
            log::debug!("action run while disabled, ignoring");
            return;
        }
        let selection = self.selection();
        if self.delegate.is_run_in_background() {
            self.run_in_background(workers, selection, done);
        } else {
            done(self.run(&selection));
        }
    }
}

impl<D> fmt::Debug for DebugAction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugAction")
            .field("enabled", &self.enabled.load(Ordering::SeqCst))
            .field("selection", &self.selection.read().len())
            .finish()
    }
}

fn run_delegate<D: DebugActionDelegate + ?Sized>(
    delegate: &D,
    selection: &[Arc<dyn DebugElement>],
) -> Result<(), ActionFailure> {
    let mut causes = Vec::new();
    for element in selection {
        if let Err(error) = delegate.do_action(element.as_ref()) {
            log::debug!("action failed on {}: {error}", element.name());
            causes.push(ElementFailure {
                element: element.name(),
                error,
            });
        }
    }
    if causes.is_empty() {
        return Ok(());
    }
    Err(ActionFailure {
        status_message: delegate.status_message().to_owned(),
        dialog_title: delegate.error_dialog_title().to_owned(),
        dialog_message: delegate.error_dialog_message().to_owned(),
        causes,
    })
}
