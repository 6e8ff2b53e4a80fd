mod model;

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use debugview_actions::{DebugAction, DebugEvent, DebugEventKind, TerminateActionDelegate};
use debugview_core::{
    AsyncTreeViewer, MemoryTree, PresentationAdapter, SharedAdapter, ViewerOptions,
};
use debugview_runtime_std::{StdRuntime, StdRuntimeConfig};

use model::{DebugPresentation, Debugger, Node};

const LATENCY: Duration = Duration::from_millis(20);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

type Viewer = AsyncTreeViewer<Node, MemoryTree>;

/// Applies results as workers post them until nothing is pending.
fn settle(runtime: &StdRuntime, viewer: &mut Viewer) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while viewer.has_pending_updates() {
        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "gave up waiting for {} update(s)",
                viewer.pending_update_count()
            );
            break;
        }
        if runtime.wait_for_dispatch(deadline - now) {
            viewer.dispatch_pending();
        }
    }
}

fn show(step: &str, viewer: &Viewer) {
    log::info!("{step}:\n{}", viewer.widget().outline());
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = StdRuntimeConfig::default().with_thread_name("debug-model");
    let runtime = StdRuntime::with_config(config)?;
    let debugger = Debugger::new(LATENCY);
    let presentation: Arc<dyn PresentationAdapter<Node>> =
        Arc::new(DebugPresentation::new(Arc::clone(&debugger), runtime.workers()));

    let mut viewer: Viewer = AsyncTreeViewer::with_options(
        MemoryTree::new(),
        Arc::new(SharedAdapter::new(presentation)),
        runtime.ui_scheduler(),
        ViewerOptions::default()
            .with_context_id("debug.view")
            .with_auto_expand_level(1),
    );

    viewer.set_input(Node::Launch);
    settle(&runtime, &mut viewer);
    show("launched", &viewer);

    viewer.expand(&[Node::Launch, Node::Target, Node::Thread(1)]);
    settle(&runtime, &mut viewer);
    show("expanded main thread", &viewer);

    let top_frame = Node::Frame {
        thread: 1,
        depth: 0,
    };
    viewer.select(&[Node::Launch, Node::Target, Node::Thread(1), top_frame]);
    settle(&runtime, &mut viewer);
    log::info!("selected {:?}", viewer.selection());

    let terminate = DebugAction::new(TerminateActionDelegate);
    let io_worker = debugger.thread(2);
    terminate.selection_changed(vec![Arc::clone(&io_worker)]);
    log::info!("terminate enabled: {}", terminate.is_enabled());

    let (sender, receiver) = flume::bounded(1);
    terminate.run_selection(&runtime.workers(), move |outcome| {
        let _ = sender.send(outcome);
    });
    match receiver.recv_timeout(SETTLE_TIMEOUT) {
        Ok(Ok(())) => log::info!("terminate finished"),
        Ok(Err(failure)) => {
            log::error!("{}: {} ({failure})", failure.dialog_title, failure.dialog_message);
            for cause in &failure.causes {
                log::error!("  {}: {}", cause.element, cause.error);
            }
        }
        Err(err) => log::error!("terminate did not report back: {err}"),
    }
    terminate.handle_debug_event(&DebugEvent::new(DebugEventKind::Terminate, io_worker));
    log::info!("terminate enabled: {}", terminate.is_enabled());

    viewer.refresh();
    settle(&runtime, &mut viewer);
    show("after terminate", &viewer);

    viewer.dispose();
    log::info!("viewer state: {:?}", viewer.state());
    Ok(())
}
