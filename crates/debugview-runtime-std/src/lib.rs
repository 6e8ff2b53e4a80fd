//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction defined in `debugview-core`. Applications construct a
//! [`StdRuntime`], hand its [`UiScheduler`] to an
//! [`AsyncTreeViewer`](debugview_core::AsyncTreeViewer) and run adapter work
//! on its worker pool.

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use debugview_core::UiScheduler;
use parking_lot::{Condvar, Mutex, RwLock};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler that records dispatch requests and wakes whoever drives the
/// viewer's thread.
pub struct StdUiScheduler {
    dispatch_requested: Mutex<bool>,
    signal: Condvar,
    waker: RwLock<Option<Waker>>,
}

impl StdUiScheduler {
    pub fn new() -> Self {
        Self {
            dispatch_requested: Mutex::new(false),
            signal: Condvar::new(),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a dispatch has been requested since the last call.
    pub fn take_dispatch_request(&self) -> bool {
        std::mem::take(&mut *self.dispatch_requested.lock())
    }

    /// Blocks until a dispatch is requested or `timeout` elapses. Consumes
    /// the request; returns `false` on timeout.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn wait_for_dispatch(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut requested = self.dispatch_requested.lock();
        while !*requested {
            match deadline {
                Some(deadline) => {
                    if self.signal.wait_until(&mut requested, deadline).timed_out() {
                        break;
                    }
                }
                None => self.signal.wait(&mut requested),
            }
        }
        std::mem::take(&mut *requested)
    }

    /// Registers a waker invoked on every dispatch request, from whichever
    /// thread made it.
    pub fn set_dispatch_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write() = Some(Arc::new(waker));
    }

    pub fn clear_dispatch_waker(&self) {
        *self.waker.write() = None;
    }

    fn wake(&self) {
        let waker = self.waker.read().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdUiScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdUiScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdUiScheduler")
            .field("dispatch_requested", &*self.dispatch_requested.lock())
            .finish()
    }
}

impl UiScheduler for StdUiScheduler {
    fn request_dispatch(&self) {
        *self.dispatch_requested.lock() = true;
        self.signal.notify_all();
        self.wake();
    }
}

/// Settings for [`StdRuntime`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StdRuntimeConfig {
    pub worker_threads: usize,
    /// Worker threads are named `<thread_name>-<index>`.
    pub thread_name: String,
}

impl Default for StdRuntimeConfig {
    fn default() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|count| count.get().min(4))
            .unwrap_or(2);
        Self {
            worker_threads,
            thread_name: "debugview-worker".to_owned(),
        }
    }
}

impl StdRuntimeConfig {
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }
}

/// Cloneable handle for queueing work on a [`WorkerPool`].
#[derive(Clone)]
pub struct WorkerHandle {
    sender: flume::Sender<Job>,
}

impl WorkerHandle {
    /// Queues `job`. Returns `false` if the pool has shut down.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if self.sender.send(Box::new(job)).is_err() {
            log::warn!("worker pool is shut down, dropping job");
            return false;
        }
        true
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("queued", &self.sender.len())
            .finish()
    }
}

/// Fixed set of threads draining a shared job queue. A panicking job is
/// logged and does not take its worker down. Dropping the pool lets queued
/// jobs finish, then joins the workers; if a [`WorkerHandle`] is still alive
/// the workers are detached instead and exit when the last handle drops.
pub struct WorkerPool {
    sender: flume::Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: &StdRuntimeConfig) -> io::Result<Self> {
        let (sender, receiver) = flume::unbounded::<Job>();
        let count = config.worker_threads.max(1);
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || {
                    for job in receiver {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                            log::error!("worker job panicked: {}", panic_message(&*payload));
                        }
                    }
                })?;
            workers.push(worker);
        }
        log::debug!("started {count} worker thread(s)");
        Ok(Self { sender, workers })
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.handle().spawn(job)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit once every sender, handles included, is gone.
        let outstanding = self.sender.sender_count() - 1;
        let (closed, _) = flume::unbounded();
        drop(std::mem::replace(&mut self.sender, closed));
        if outstanding > 0 {
            log::debug!("{outstanding} worker handle(s) still alive, detaching workers");
            return;
        }
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().map(str::to_owned);
            if worker.join().is_err() {
                log::error!("worker {name:?} exited abnormally");
            }
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Convenience container bundling the UI scheduler and the worker pool.
pub struct StdRuntime {
    scheduler: Arc<StdUiScheduler>,
    workers: WorkerPool,
}

impl StdRuntime {
    pub fn new() -> io::Result<Self> {
        Self::with_config(StdRuntimeConfig::default())
    }

    pub fn with_config(config: StdRuntimeConfig) -> io::Result<Self> {
        Ok(Self {
            scheduler: Arc::new(StdUiScheduler::new()),
            workers: WorkerPool::new(&config)?,
        })
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdUiScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns the scheduler as the trait object viewers take.
    pub fn ui_scheduler(&self) -> Arc<dyn UiScheduler> {
        self.scheduler.clone()
    }

    pub fn workers(&self) -> WorkerHandle {
        self.workers.handle()
    }

    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.workers.spawn(job)
    }

    pub fn take_dispatch_request(&self) -> bool {
        self.scheduler.take_dispatch_request()
    }

    pub fn wait_for_dispatch(&self, timeout: Duration) -> bool {
        self.scheduler.wait_for_dispatch(timeout)
    }

    pub fn set_dispatch_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_dispatch_waker(waker);
    }

    pub fn clear_dispatch_waker(&self) {
        self.scheduler.clear_dispatch_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("workers", &self.workers)
            .finish()
    }
}
