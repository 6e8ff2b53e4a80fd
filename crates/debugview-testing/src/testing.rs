use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use debugview_core::collections::map::HashMap;
use debugview_core::{
    AsyncTreeViewer, ChildrenUpdate, ImageDescriptor, LabelUpdate, MemoryTree,
    PresentationAdapter, PresentationContext, SharedAdapter, UiScheduler, ViewerOptions,
};
use debugview_runtime_std::{StdUiScheduler, WorkerHandle};
use parking_lot::{Mutex, RwLock};

/// Installs `env_logger` for the current test binary. Safe to call from every
/// test; only the first call has an effect.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Element made of a name. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestElement(Arc<str>);

impl TestElement {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TestElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TestElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestElement {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Builds a path of [`TestElement`]s from names.
pub fn path(names: &[&str]) -> Vec<TestElement> {
    names.iter().copied().map(TestElement::from).collect()
}

/// Mutable element hierarchy shared between a test and its adapter.
///
/// Labels default to the element's name; elements with an entry in the
/// children table get a `folder` image, the rest a `leaf` image.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    children: Arc<RwLock<HashMap<TestElement, Vec<TestElement>>>>,
    labels: Arc<RwLock<HashMap<TestElement, String>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(self, parent: &str, children: &[&str]) -> Self {
        self.set_children(parent, children);
        self
    }

    pub fn set_children(&self, parent: &str, children: &[&str]) {
        self.children
            .write()
            .insert(TestElement::from(parent), path(children));
    }

    pub fn set_label(&self, element: &str, label: impl Into<String>) {
        self.labels
            .write()
            .insert(TestElement::from(element), label.into());
    }

    pub fn children_of(&self, element: &TestElement) -> Vec<TestElement> {
        self.children
            .read()
            .get(element)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_children(&self, element: &TestElement) -> bool {
        self.children
            .read()
            .get(element)
            .is_some_and(|children| !children.is_empty())
    }

    pub fn label_of(&self, element: &TestElement) -> String {
        self.labels
            .read()
            .get(element)
            .cloned()
            .unwrap_or_else(|| element.name().to_owned())
    }

    fn image_of(&self, element: &TestElement) -> ImageDescriptor {
        if self.children.read().contains_key(element) {
            ImageDescriptor::new("folder")
        } else {
            ImageDescriptor::new("leaf")
        }
    }

    fn fill_label(&self, element: &TestElement, update: &mut LabelUpdate<TestElement>) {
        update.set_text(self.label_of(element));
        update.set_image(self.image_of(element));
    }

    fn fill_children(&self, element: &TestElement, update: &mut ChildrenUpdate<TestElement>) {
        let children = self.children_of(element);
        let entries: Vec<_> = children
            .into_iter()
            .map(|child| {
                let has_children = self.has_children(&child);
                (child, has_children)
            })
            .collect();
        update.set_children(entries);
    }
}

/// How a [`ScriptedAdapter`] answers requests.
#[derive(Clone)]
pub enum CompletionMode {
    /// Answers inside the request call.
    Immediate,
    /// Parks requests until the test calls [`ScriptedAdapter::complete_next`]
    /// or [`ScriptedAdapter::complete_all`].
    Deferred,
    /// Answers on a worker thread, optionally after a delay.
    Threaded(WorkerHandle, Duration),
}

enum Request {
    Label(TestElement, LabelUpdate<TestElement>),
    Children(TestElement, ChildrenUpdate<TestElement>),
}

impl Request {
    fn is_canceled(&self) -> bool {
        match self {
            Request::Label(_, update) => update.is_canceled(),
            Request::Children(_, update) => update.is_canceled(),
        }
    }

    fn answer(self, model: &ScriptedModel) {
        match self {
            Request::Label(element, mut update) => {
                model.fill_label(&element, &mut update);
                update.done();
            }
            Request::Children(element, mut update) => {
                model.fill_children(&element, &mut update);
                update.done();
            }
        }
    }
}

/// Presentation adapter answering from a [`ScriptedModel`] and counting the
/// requests it receives.
pub struct ScriptedAdapter {
    model: ScriptedModel,
    mode: CompletionMode,
    parked: Mutex<VecDeque<Request>>,
    label_requests: AtomicUsize,
    children_requests: AtomicUsize,
    skipped: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(model: ScriptedModel, mode: CompletionMode) -> Self {
        Self {
            model,
            mode,
            parked: Mutex::new(VecDeque::new()),
            label_requests: AtomicUsize::new(0),
            children_requests: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        }
    }

    pub fn model(&self) -> &ScriptedModel {
        &self.model
    }

    pub fn label_requests(&self) -> usize {
        self.label_requests.load(Ordering::SeqCst)
    }

    pub fn children_requests(&self) -> usize {
        self.children_requests.load(Ordering::SeqCst)
    }

    /// Parked requests dropped because they were canceled first.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().len()
    }

    /// Answers the oldest parked request. Returns `false` when none is left.
    pub fn complete_next(&self) -> bool {
        let request = self.parked.lock().pop_front();
        match request {
            Some(request) => {
                self.finish(request);
                true
            }
            None => false,
        }
    }

    /// Answers the newest parked request.
    pub fn complete_latest(&self) -> bool {
        let request = self.parked.lock().pop_back();
        match request {
            Some(request) => {
                self.finish(request);
                true
            }
            None => false,
        }
    }

    /// Answers every parked request, including those parked while answering.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    fn finish(&self, request: Request) {
        if request.is_canceled() {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            return;
        }
        request.answer(&self.model);
    }

    fn submit(&self, request: Request) {
        match &self.mode {
            CompletionMode::Immediate => self.finish(request),
            CompletionMode::Deferred => self.parked.lock().push_back(request),
            CompletionMode::Threaded(workers, delay) => {
                let model = self.model.clone();
                let delay = *delay;
                workers.spawn(move || {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    if !request.is_canceled() {
                        request.answer(&model);
                    }
                });
            }
        }
    }
}

impl PresentationAdapter<TestElement> for ScriptedAdapter {
    fn retrieve_label(
        &self,
        element: &TestElement,
        _context: &PresentationContext,
        update: LabelUpdate<TestElement>,
    ) {
        self.label_requests.fetch_add(1, Ordering::SeqCst);
        self.submit(Request::Label(element.clone(), update));
    }

    fn retrieve_children(
        &self,
        element: &TestElement,
        _context: &PresentationContext,
        update: ChildrenUpdate<TestElement>,
    ) {
        self.children_requests.fetch_add(1, Ordering::SeqCst);
        self.submit(Request::Children(element.clone(), update));
    }
}

/// Headless harness owning a viewer over a [`MemoryTree`] and the scripted
/// adapter feeding it.
pub struct TreeTestRule {
    viewer: AsyncTreeViewer<TestElement, MemoryTree>,
    adapter: Arc<ScriptedAdapter>,
    scheduler: Arc<StdUiScheduler>,
}

impl TreeTestRule {
    pub fn new(model: ScriptedModel, mode: CompletionMode) -> Self {
        Self::with_options(model, mode, ViewerOptions::default())
    }

    pub fn with_options(model: ScriptedModel, mode: CompletionMode, options: ViewerOptions) -> Self {
        init_logging();
        let adapter = Arc::new(ScriptedAdapter::new(model, mode));
        let scheduler = Arc::new(StdUiScheduler::new());
        let lookup = SharedAdapter::new(adapter.clone() as Arc<dyn PresentationAdapter<TestElement>>);
        let viewer = AsyncTreeViewer::with_options(
            MemoryTree::new(),
            Arc::new(lookup),
            scheduler.clone() as Arc<dyn UiScheduler>,
            options,
        );
        Self {
            viewer,
            adapter,
            scheduler,
        }
    }

    pub fn viewer(&self) -> &AsyncTreeViewer<TestElement, MemoryTree> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut AsyncTreeViewer<TestElement, MemoryTree> {
        &mut self.viewer
    }

    pub fn adapter(&self) -> &ScriptedAdapter {
        &self.adapter
    }

    pub fn model(&self) -> &ScriptedModel {
        self.adapter.model()
    }

    pub fn scheduler(&self) -> &StdUiScheduler {
        &self.scheduler
    }

    pub fn tree(&self) -> &MemoryTree {
        self.viewer.widget()
    }

    pub fn outline(&self) -> String {
        self.viewer.widget().outline()
    }

    pub fn set_input(&mut self, name: &str) {
        self.viewer.set_input(TestElement::from(name));
    }

    /// Answers parked requests and applies results until the viewer has no
    /// pending updates. Threaded answers are waited for up to `timeout`.
    /// Returns `false` if the viewer did not settle in time.
    pub fn pump_until_idle_for(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let completed = self.adapter.complete_all();
            let applied = self.viewer.dispatch_pending();
            if completed > 0 || applied > 0 {
                continue;
            }
            if !self.viewer.has_pending_updates() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!(
                    "viewer still has {} pending update(s)",
                    self.viewer.pending_updates().len()
                );
                return false;
            }
            self.scheduler.wait_for_dispatch(deadline - now);
        }
    }

    pub fn pump_until_idle(&mut self) -> bool {
        self.pump_until_idle_for(Duration::from_secs(5))
    }
}
