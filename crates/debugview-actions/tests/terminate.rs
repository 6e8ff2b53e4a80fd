use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use debugview_actions::{
    ActionFailure, DebugAction, DebugActionDelegate, DebugElement, DebugError, DebugEvent,
    DebugEventKind, Selection, Terminate, TerminateActionDelegate,
};
use debugview_runtime_std::{StdRuntime, StdRuntimeConfig};
use debugview_testing::init_logging;

#[derive(Debug)]
struct FakeThread {
    name: &'static str,
    terminated: AtomicBool,
    hung: bool,
    attempts: AtomicUsize,
}

impl FakeThread {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            terminated: AtomicBool::new(false),
            hung: false,
            attempts: AtomicUsize::new(0),
        })
    }

    fn hung(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            terminated: AtomicBool::new(false),
            hung: true,
            attempts: AtomicUsize::new(0),
        })
    }
}

impl Terminate for FakeThread {
    fn can_terminate(&self) -> bool {
        !self.is_terminated()
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn terminate(&self) -> Result<(), DebugError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.hung {
            return Err(DebugError::NotResponding {
                element: self.name.to_owned(),
            });
        }
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl DebugElement for FakeThread {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn as_terminate(&self) -> Option<&dyn Terminate> {
        Some(self)
    }
}

/// A stack frame: visible in the tree, but not terminable.
#[derive(Debug)]
struct FakeFrame;

impl DebugElement for FakeFrame {
    fn name(&self) -> String {
        "frame".to_owned()
    }
}

fn element(element: Arc<impl DebugElement + 'static>) -> Arc<dyn DebugElement> {
    element
}

fn action() -> DebugAction<TerminateActionDelegate> {
    init_logging();
    DebugAction::new(TerminateActionDelegate)
}

#[test]
fn enabled_only_when_every_element_can_terminate() {
    let action = action();
    let main = FakeThread::new("main");
    assert!(!action.is_enabled_for_selection(&[]));

    action.selection_changed(vec![element(main.clone())]);
    assert!(action.is_enabled());

    action.selection_changed(vec![element(main.clone()), element(Arc::new(FakeFrame))]);
    assert!(!action.is_enabled());

    main.terminated.store(true, Ordering::SeqCst);
    action.selection_changed(vec![element(main)]);
    assert!(!action.is_enabled());
}

#[test]
fn run_terminates_every_selected_element() {
    let action = action();
    let main = FakeThread::new("main");
    let worker = FakeThread::new("worker");
    let selection: Selection = vec![
        element(main.clone()),
        element(Arc::new(FakeFrame)),
        element(worker.clone()),
    ];

    assert_eq!(action.run(&selection), Ok(()));
    assert!(main.is_terminated());
    assert!(worker.is_terminated());
}

#[test]
fn failures_are_collected_with_dialog_text() {
    let action = action();
    let stuck = FakeThread::hung("stuck");
    let main = FakeThread::new("main");

    let failure: ActionFailure = action
        .run(&[element(stuck.clone()), element(main.clone())])
        .expect_err("stuck thread fails");

    assert_eq!(failure.status_message, "Exceptions occurred attempting to terminate.");
    assert_eq!(failure.dialog_title, "Terminate");
    assert_eq!(failure.dialog_message, "Terminate failed.");
    assert_eq!(failure.causes.len(), 1);
    assert_eq!(failure.causes[0].element, "stuck");
    assert_eq!(failure.to_string(), "Exceptions occurred attempting to terminate.");
    assert!(main.is_terminated(), "later elements still run");
}

#[test]
fn terminate_event_disables_action() {
    let action = action();
    let main = FakeThread::new("main");
    action.selection_changed(vec![element(main.clone())]);
    assert!(action.is_enabled());

    main.terminate().expect("terminates");
    action.handle_debug_event(&DebugEvent::new(DebugEventKind::Suspend, main.clone()));
    assert!(action.is_enabled(), "suspend events are ignored");

    action.handle_debug_event(&DebugEvent::new(DebugEventKind::Terminate, main));
    assert!(!action.is_enabled());
}

#[test]
fn runs_in_background_on_worker_pool() {
    let runtime = StdRuntime::with_config(StdRuntimeConfig::default().with_worker_threads(1))
        .expect("spawn workers");
    let action = action();
    assert!(action.delegate().is_run_in_background());
    let main = FakeThread::new("main");
    action.selection_changed(vec![element(main.clone())]);

    let (sender, receiver) = mpsc::channel();
    action.run_selection(&runtime.workers(), move |outcome| {
        let on_worker = std::thread::current()
            .name()
            .is_some_and(|name| name.starts_with("debugview-worker"));
        sender.send((outcome, on_worker)).expect("receiver alive");
    });

    let (outcome, on_worker) = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("action finished");
    assert_eq!(outcome, Ok(()));
    assert!(on_worker);
    assert_eq!(main.attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn disabled_action_does_not_run() {
    let runtime = StdRuntime::with_config(StdRuntimeConfig::default().with_worker_threads(1))
        .expect("spawn workers");
    let action = action();
    action.selection_changed(vec![element(Arc::new(FakeFrame))]);

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    action.run_selection(&runtime.workers(), move |_| flag.store(true, Ordering::SeqCst));
    drop(runtime);

    assert!(!ran.load(Ordering::SeqCst));
}
