//=========================================================================
// Test Support
//=========================================================================
//
// Scripted asset manager and recording screens shared by unit tests.
//
// ManualAssets keeps its bookkeeping behind an Rc so a test can hold a
// clone while the controller owns the boxed original. Assets become
// ready only when the test says so (`finish`), or on the next `update`
// for a manager built with `completing()`.
//
//=========================================================================

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::asset::{AssetDescriptor, AssetManager};
use crate::core::screen::{Screen, ScreenContext, Transition, TransitionContext};

//=== Logging =============================================================

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//=== ManualAssets ========================================================

#[derive(Default)]
struct Script {
    requested: HashSet<String>,
    ready: HashSet<String>,
    failed: HashMap<String, String>,
    load_calls: HashMap<String, usize>,
    unload_calls: HashMap<String, usize>,
    complete_on_update: bool,
    updates: usize,
    disposals: usize,
}

#[derive(Clone, Default)]
pub(crate) struct ManualAssets {
    script: Rc<RefCell<Script>>,
    values: Rc<HashMap<String, Box<dyn Any>>>,
}

impl ManualAssets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every requested asset becomes ready on the next `update`.
    pub(crate) fn completing() -> Self {
        let manager = Self::new();
        manager.script.borrow_mut().complete_on_update = true;
        manager
    }

    /// Value returned by `get` once `file` is ready. Call before cloning.
    pub(crate) fn with_value<T: Any>(mut self, file: &str, value: T) -> Self {
        Rc::get_mut(&mut self.values)
            .expect("with_value is called before the manager is shared")
            .insert(file.to_string(), Box::new(value));
        self
    }

    pub(crate) fn finish(&self, file: &str) {
        self.script.borrow_mut().ready.insert(file.to_string());
    }

    /// Marks `file` as failed; it stays failed until unloaded.
    pub(crate) fn fail(&self, file: &str, reason: &str) {
        let mut script = self.script.borrow_mut();
        script.ready.remove(file);
        script.failed.insert(file.to_string(), reason.to_string());
    }

    pub(crate) fn is_pending(&self, file: &str) -> bool {
        let script = self.script.borrow();
        script.requested.contains(file) && !script.ready.contains(file)
    }

    pub(crate) fn load_calls(&self, file: &str) -> usize {
        self.script.borrow().load_calls.get(file).copied().unwrap_or(0)
    }

    pub(crate) fn unload_calls(&self, file: &str) -> usize {
        self.script.borrow().unload_calls.get(file).copied().unwrap_or(0)
    }

    pub(crate) fn updates(&self) -> usize {
        self.script.borrow().updates
    }

    pub(crate) fn disposals(&self) -> usize {
        self.script.borrow().disposals
    }
}

impl AssetManager for ManualAssets {
    fn load(&mut self, descriptor: &AssetDescriptor) {
        let mut script = self.script.borrow_mut();
        let file = descriptor.file_name().to_string();
        *script.load_calls.entry(file.clone()).or_default() += 1;
        script.requested.insert(file);
    }

    fn unload(&mut self, file_name: &str) {
        let mut script = self.script.borrow_mut();
        *script.unload_calls.entry(file_name.to_string()).or_default() += 1;
        script.requested.remove(file_name);
        script.ready.remove(file_name);
        script.failed.remove(file_name);
    }

    fn is_loaded(&self, file_name: &str) -> bool {
        self.script.borrow().ready.contains(file_name)
    }

    fn get(&self, file_name: &str) -> Option<&dyn Any> {
        if !self.is_loaded(file_name) {
            return None;
        }
        self.values.get(file_name).map(|v| v.as_ref())
    }

    fn failure(&self, file_name: &str) -> Option<String> {
        self.script.borrow().failed.get(file_name).cloned()
    }

    fn update(&mut self) -> bool {
        let mut script = self.script.borrow_mut();
        script.updates += 1;
        if script.complete_on_update {
            let requested: Vec<String> = script
                .requested
                .iter()
                .filter(|f| !script.failed.contains_key(*f))
                .cloned()
                .collect();
            script.ready.extend(requested);
        }
        script
            .requested
            .iter()
            .all(|f| script.ready.contains(f) || script.failed.contains_key(f))
    }

    fn dispose(&mut self) {
        let mut script = self.script.borrow_mut();
        script.disposals += 1;
        script.requested.clear();
        script.ready.clear();
        script.failed.clear();
    }
}

//=== Journal =============================================================

/// Shared log of every hook call, as `"<name>.<hook>"`.
#[derive(Clone, Default)]
pub(crate) struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &str, hook: &str) {
        self.0.borrow_mut().push(format!("{}.{}", name, hook));
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

//=== Recorder ============================================================

type ScreenScript = Box<dyn FnMut(u32, &mut ScreenContext<'_>)>;
type TransitionScript = Box<dyn FnMut(u32, &mut TransitionContext<'_>)>;

/// Screen that journals its hooks. `M` only makes distinct types so
/// several recorders can be registered side by side.
pub(crate) struct Recorder<M = ()> {
    name: String,
    journal: Journal,
    frames: u32,
    on_render: Option<ScreenScript>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: 'static> Recorder<M> {
    pub(crate) fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            frames: 0,
            on_render: None,
            _marker: PhantomData,
        }
    }

    /// Runs `script` with the frame number on every render.
    pub(crate) fn on_render(
        mut self,
        script: impl FnMut(u32, &mut ScreenContext<'_>) + 'static,
    ) -> Self {
        self.on_render = Some(Box::new(script));
        self
    }
}

impl<M: 'static> Screen for Recorder<M> {
    fn create(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.journal.push(&self.name, "create");
    }

    fn show(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.journal.push(&self.name, "show");
    }

    fn render(&mut self, _delta: f32, ctx: &mut ScreenContext<'_>) {
        self.journal.push(&self.name, "render");
        self.frames += 1;
        if let Some(script) = self.on_render.as_mut() {
            script(self.frames, ctx);
        }
    }

    fn resize(&mut self, _width: u32, _height: u32) {
        self.journal.push(&self.name, "resize");
    }

    fn pause(&mut self) {
        self.journal.push(&self.name, "pause");
    }

    fn resume(&mut self) {
        self.journal.push(&self.name, "resume");
    }

    fn hide(&mut self) {
        self.journal.push(&self.name, "hide");
    }

    fn dispose(&mut self) {
        self.journal.push(&self.name, "dispose");
    }
}

//=== TransitionRecorder ==================================================

/// Transition that journals its hooks. Switches on its first render
/// unless given a script.
pub(crate) struct TransitionRecorder<M = ()> {
    name: String,
    journal: Journal,
    frames: u32,
    on_render: Option<TransitionScript>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: 'static> TransitionRecorder<M> {
    pub(crate) fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            frames: 0,
            on_render: None,
            _marker: PhantomData,
        }
    }

    /// Replaces the instant switch with `script`, called with the frame
    /// number (starting at 1) on every render.
    pub(crate) fn on_render(
        mut self,
        script: impl FnMut(u32, &mut TransitionContext<'_>) + 'static,
    ) -> Self {
        self.on_render = Some(Box::new(script));
        self
    }
}

impl<M: 'static> Transition for TransitionRecorder<M> {
    fn create(&mut self, _ctx: &mut TransitionContext<'_>) {
        self.journal.push(&self.name, "create");
    }

    fn show(&mut self, _ctx: &mut TransitionContext<'_>) {
        self.frames = 0;
        self.journal.push(&self.name, "show");
    }

    fn render(&mut self, _delta: f32, ctx: &mut TransitionContext<'_>) {
        self.journal.push(&self.name, "render");
        self.frames += 1;
        match self.on_render.as_mut() {
            Some(script) => script(self.frames, ctx),
            None => ctx.switch_screens(),
        }
    }

    fn resize(&mut self, _width: u32, _height: u32) {
        self.journal.push(&self.name, "resize");
    }

    fn pause(&mut self) {
        self.journal.push(&self.name, "pause");
    }

    fn resume(&mut self) {
        self.journal.push(&self.name, "resume");
    }

    fn hide(&mut self) {
        self.journal.push(&self.name, "hide");
    }

    fn dispose(&mut self) {
        self.journal.push(&self.name, "dispose");
    }
}
