//! A simulated debugger: one launch, one target, a few suspended threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use debugview_actions::{DebugElement, DebugError, Terminate};
use debugview_core::{
    ChildrenUpdate, ImageDescriptor, LabelUpdate, PresentationAdapter, PresentationContext,
};
use debugview_runtime_std::WorkerHandle;
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Launch,
    Target,
    Thread(u32),
    Frame { thread: u32, depth: usize },
}

struct ThreadState {
    id: u32,
    name: &'static str,
    frames: Vec<&'static str>,
    terminated: bool,
}

pub struct Debugger {
    threads: Mutex<Vec<ThreadState>>,
    latency: Duration,
}

impl Debugger {
    pub fn new(latency: Duration) -> Arc<Self> {
        let threads = vec![
            ThreadState {
                id: 1,
                name: "main",
                frames: vec!["main()", "run_loop()", "poll_events()"],
                terminated: false,
            },
            ThreadState {
                id: 2,
                name: "io-worker",
                frames: vec!["worker_main()", "read_socket()"],
                terminated: false,
            },
            ThreadState {
                id: 3,
                name: "gc",
                frames: vec!["collect()"],
                terminated: false,
            },
        ];
        Arc::new(Self {
            threads: Mutex::new(threads),
            latency,
        })
    }

    pub fn thread(self: &Arc<Self>, id: u32) -> Arc<dyn DebugElement> {
        Arc::new(ThreadHandle {
            id,
            debugger: Arc::clone(self),
        })
    }

    fn label(&self, node: &Node) -> (String, &'static str) {
        let threads = self.threads.lock();
        match node {
            Node::Launch => ("demo [Rust Application]".to_owned(), "launch"),
            Node::Target => ("demo at localhost:9229".to_owned(), "target"),
            Node::Thread(id) => match threads.iter().find(|thread| thread.id == *id) {
                Some(thread) if thread.terminated => {
                    (format!("Thread [{}] (Terminated)", thread.name), "thread")
                }
                Some(thread) => (format!("Thread [{}] (Suspended)", thread.name), "thread"),
                None => (format!("Thread {id}"), "thread"),
            },
            Node::Frame { thread, depth } => {
                let frame = threads
                    .iter()
                    .find(|candidate| candidate.id == *thread)
                    .and_then(|candidate| candidate.frames.get(*depth))
                    .copied()
                    .unwrap_or("<unknown>");
                (frame.to_owned(), "frame")
            }
        }
    }

    fn children(&self, node: &Node) -> Vec<(Node, bool)> {
        let threads = self.threads.lock();
        match node {
            Node::Launch => vec![(Node::Target, true)],
            Node::Target => threads
                .iter()
                .filter(|thread| !thread.terminated)
                .map(|thread| (Node::Thread(thread.id), !thread.frames.is_empty()))
                .collect(),
            Node::Thread(id) => threads
                .iter()
                .filter(|thread| thread.id == *id && !thread.terminated)
                .flat_map(|thread| {
                    (0..thread.frames.len()).map(|depth| {
                        let frame = Node::Frame {
                            thread: thread.id,
                            depth,
                        };
                        (frame, false)
                    })
                })
                .collect(),
            Node::Frame { .. } => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct ThreadHandle {
    id: u32,
    debugger: Arc<Debugger>,
}

impl Terminate for ThreadHandle {
    fn can_terminate(&self) -> bool {
        !self.is_terminated()
    }

    fn is_terminated(&self) -> bool {
        self.debugger
            .threads
            .lock()
            .iter()
            .any(|thread| thread.id == self.id && thread.terminated)
    }

    fn terminate(&self) -> Result<(), DebugError> {
        thread::sleep(self.debugger.latency);
        let mut threads = self.debugger.threads.lock();
        let thread = threads
            .iter_mut()
            .find(|thread| thread.id == self.id)
            .ok_or_else(|| DebugError::RequestFailed {
                element: format!("thread {}", self.id),
                message: "no such thread".to_owned(),
            })?;
        if thread.terminated {
            return Err(DebugError::AlreadyTerminated {
                element: thread.name.to_owned(),
            });
        }
        thread.terminated = true;
        log::info!("thread {} terminated", thread.name);
        Ok(())
    }
}

impl DebugElement for ThreadHandle {
    fn name(&self) -> String {
        format!("thread {}", self.id)
    }

    fn as_terminate(&self) -> Option<&dyn Terminate> {
        Some(self)
    }
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("threads", &self.threads.lock().len())
            .finish()
    }
}

/// Answers label and children requests on worker threads after the
/// debugger's simulated latency.
pub struct DebugPresentation {
    debugger: Arc<Debugger>,
    workers: WorkerHandle,
}

impl DebugPresentation {
    pub fn new(debugger: Arc<Debugger>, workers: WorkerHandle) -> Self {
        Self { debugger, workers }
    }
}

impl PresentationAdapter<Node> for DebugPresentation {
    fn retrieve_label(
        &self,
        element: &Node,
        _context: &PresentationContext,
        mut update: LabelUpdate<Node>,
    ) {
        let debugger = Arc::clone(&self.debugger);
        let element = element.clone();
        self.workers.spawn(move || {
            thread::sleep(debugger.latency);
            if update.is_canceled() {
                return;
            }
            let (text, image) = debugger.label(&element);
            update.set_text(text);
            update.set_image(ImageDescriptor::new(image));
            update.done();
        });
    }

    fn retrieve_children(
        &self,
        element: &Node,
        _context: &PresentationContext,
        mut update: ChildrenUpdate<Node>,
    ) {
        let debugger = Arc::clone(&self.debugger);
        let element = element.clone();
        self.workers.spawn(move || {
            thread::sleep(debugger.latency);
            if update.is_canceled() {
                return;
            }
            update.set_children(debugger.children(&element));
            update.done();
        });
    }
}
