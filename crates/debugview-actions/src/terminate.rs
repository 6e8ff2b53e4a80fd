use crate::action::DebugActionDelegate;
use crate::model::{DebugElement, DebugError, DebugEventKind};

/// Terminates every selected element that supports it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminateActionDelegate;

impl DebugActionDelegate for TerminateActionDelegate {
    fn is_enabled_for(&self, element: &dyn DebugElement) -> bool {
        element
            .as_terminate()
            .is_some_and(|terminate| terminate.can_terminate())
    }

    fn do_action(&self, element: &dyn DebugElement) -> Result<(), DebugError> {
        match element.as_terminate() {
            Some(terminate) => terminate.terminate(),
            None => Ok(()),
        }
    }

    fn is_run_in_background(&self) -> bool {
        true
    }

    fn status_message(&self) -> &'static str {
        "Exceptions occurred attempting to terminate."
    }

    fn error_dialog_title(&self) -> &'static str {
        "Terminate"
    }

    fn error_dialog_message(&self) -> &'static str {
        "Terminate failed."
    }

    fn refreshes_on(&self, kind: DebugEventKind) -> bool {
        matches!(kind, DebugEventKind::Terminate | DebugEventKind::Create)
    }
}
