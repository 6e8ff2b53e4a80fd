//! Debug actions and workbench label adapters for debugview: the terminate
//! action and labels for source lookup containers.

pub mod action;
pub mod model;
pub mod source_lookup;
pub mod terminate;
pub mod workbench;

pub use action::{ActionFailure, DebugAction, DebugActionDelegate, ElementFailure, Selection};
pub use model::{DebugElement, DebugError, DebugEvent, DebugEventKind, Terminate};
pub use source_lookup::{qualified_name, SourceContainer, SourceContainerWorkbenchAdapter};
pub use terminate::TerminateActionDelegate;
pub use workbench::WorkbenchAdapter;

pub mod prelude {
    pub use crate::action::{DebugAction, DebugActionDelegate, Selection};
    pub use crate::model::{DebugElement, DebugEvent, DebugEventKind, Terminate};
    pub use crate::terminate::TerminateActionDelegate;
}
