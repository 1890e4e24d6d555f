//! Shared compositor state and cross-cutting queries
//!
//! The [`Compositor`] is the explicit service bundle handed to every
//! component instead of global singletons: configuration, the event bus,
//! typed hooks, the animation tick set, and the window, workspace and
//! monitor collections. Components that may outlive parts of it (e.g. a
//! workspace destroyed during shutdown) hold weak handles and check
//! liveness before use.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use anyhow::{bail, Result};
use log::{debug, info};

use crate::animation::AnimationTicker;
use crate::config::{ConfigManager, PrismConfig, WorkspaceRule};
use crate::event::{EventBus, HookSystem};
use crate::monitor::frame::{
    FrameEventPipeline, FrameScheduler, LayoutNegotiator, LogFrameScheduler, LogLayoutNegotiator,
};
use crate::monitor::{
    Monitor, MonitorHandle, MonitorId, MonitorLifecycleController, OutputConfiguration,
    OutputHandle, OutputLayout,
};
use crate::window::{Window, WindowHandle, WindowRegistry};
use crate::workspace::selector::is_number;
use crate::workspace::{Workspace, WorkspaceHandle, WorkspaceId, WORKSPACE_INVALID};
use crate::Vec2;

/// Seam for running user commands (e.g. a workspace rule's
/// on-created-empty command). Process spawning itself lives outside this
/// core.
pub trait CommandSpawner {
    fn spawn(&self, command: &str);
}

/// Default spawner used until a real one is installed; it only logs.
pub struct LogCommandSpawner;

impl CommandSpawner for LogCommandSpawner {
    fn spawn(&self, command: &str) {
        info!("🚀 Spawn requested: {command}");
    }
}

/// The compositor's shared state. Single-threaded; interior mutability
/// everywhere, no locking, ordering discipline only.
pub struct Compositor {
    pub config: Rc<ConfigManager>,
    pub events: Rc<EventBus>,
    pub hooks: Rc<HookSystem>,
    pub ticker: Rc<AnimationTicker>,
    pub windows: Rc<WindowRegistry>,

    pub monitors: RefCell<Vec<MonitorHandle>>,
    pub workspaces: RefCell<Vec<WorkspaceHandle>>,

    pub layout: OutputLayout,
    pub monitor_lifecycle: MonitorLifecycleController,
    pub frame_pipeline: FrameEventPipeline,

    /// Set once the first real monitor connects.
    pub ready_to_process: Cell<bool>,

    /// One-shot flag consumed by the next frame callback to run
    /// compositor cleanup instead of drawing.
    exit_triggered: Cell<bool>,

    /// Stable output-name to monitor-ID assignments, kept across
    /// reconnections of the same physical output.
    monitor_ids: RefCell<HashMap<String, MonitorId>>,

    unsafe_output: RefCell<Weak<RefCell<Monitor>>>,
    most_hz_monitor: RefCell<Weak<RefCell<Monitor>>>,

    pointer_position: Cell<Vec2>,

    frame_scheduler: RefCell<Rc<dyn FrameScheduler>>,
    layout_negotiator: RefCell<Rc<dyn LayoutNegotiator>>,
    spawner: RefCell<Rc<dyn CommandSpawner>>,

    next_window_id: Cell<u64>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(PrismConfig::default())
    }
}

impl Compositor {
    pub fn new(config: PrismConfig) -> Self {
        info!("🏗️ Initializing Prism compositor core...");
        Self {
            config: Rc::new(ConfigManager::new(config)),
            events: Rc::new(EventBus::new()),
            hooks: Rc::new(HookSystem::new()),
            ticker: Rc::new(AnimationTicker::new()),
            windows: Rc::new(WindowRegistry::new()),
            monitors: RefCell::new(Vec::new()),
            workspaces: RefCell::new(Vec::new()),
            layout: OutputLayout::new(),
            monitor_lifecycle: MonitorLifecycleController::new(),
            frame_pipeline: FrameEventPipeline::new(),
            ready_to_process: Cell::new(false),
            exit_triggered: Cell::new(false),
            monitor_ids: RefCell::new(HashMap::new()),
            unsafe_output: RefCell::new(Weak::new()),
            most_hz_monitor: RefCell::new(Weak::new()),
            pointer_position: Cell::new(Vec2::new(0.0, 0.0)),
            frame_scheduler: RefCell::new(Rc::new(LogFrameScheduler)),
            layout_negotiator: RefCell::new(Rc::new(LogLayoutNegotiator)),
            spawner: RefCell::new(Rc::new(LogCommandSpawner)),
            next_window_id: Cell::new(1),
        }
    }

    // ---- external seams ------------------------------------------------

    pub fn set_frame_scheduler(&self, scheduler: Rc<dyn FrameScheduler>) {
        *self.frame_scheduler.borrow_mut() = scheduler;
    }

    pub fn frame_scheduler(&self) -> Rc<dyn FrameScheduler> {
        let scheduler = self.frame_scheduler.borrow();
        Rc::clone(&*scheduler)
    }

    pub fn set_layout_negotiator(&self, negotiator: Rc<dyn LayoutNegotiator>) {
        *self.layout_negotiator.borrow_mut() = negotiator;
    }

    pub fn apply_layout_configuration(&self, configuration: &OutputConfiguration) {
        self.layout_negotiator
            .borrow()
            .apply_configuration(configuration);
    }

    pub fn set_command_spawner(&self, spawner: Rc<dyn CommandSpawner>) {
        *self.spawner.borrow_mut() = spawner;
    }

    pub fn spawn(&self, command: &str) {
        self.spawner.borrow().spawn(command);
    }

    /// Ask the frame scheduler for a redraw of one monitor.
    pub fn schedule_frame(&self, monitor: &MonitorHandle) {
        self.frame_scheduler.borrow().schedule_frame(monitor);
    }

    pub fn warp_pointer(&self, position: Vec2) {
        self.pointer_position.set(position);
        debug!("Pointer warped to ({:.1}, {:.1})", position.x, position.y);
    }

    pub fn pointer_position(&self) -> Vec2 {
        self.pointer_position.get()
    }

    // ---- exit handling -------------------------------------------------

    /// Arm the one-shot exit flag; the next frame callback runs cleanup.
    pub fn trigger_exit(&self) {
        self.exit_triggered.set(true);
    }

    /// Consume the exit flag. Clearing before cleanup keeps re-entrant
    /// frame callbacks from recursing into it.
    pub fn take_exit_triggered(&self) -> bool {
        self.exit_triggered.replace(false)
    }

    /// Tear down compositor state: destroy workspaces (their events are
    /// still delivered; the bus is alive here) and drop monitors after
    /// nulling their output handles.
    pub fn cleanup(&self) {
        info!("🔽 Cleaning up compositor state...");
        let workspaces: Vec<WorkspaceHandle> = self.workspaces.borrow_mut().drain(..).collect();
        for workspace in &workspaces {
            Workspace::destroy(workspace);
        }
        for monitor in self.monitors.borrow_mut().drain(..) {
            let mut m = monitor.borrow_mut();
            m.output = None;
            m.rendering_init_passed = false;
        }
        debug!("Cleanup complete");
    }

    /// Advance all registered animated vars. Returns how many are still
    /// animating.
    pub fn tick(&self, now: std::time::Instant) -> usize {
        self.ticker.tick(now)
    }

    // ---- monitors ------------------------------------------------------

    /// Next available monitor ID for an output name. Deterministic
    /// across reconnections of the same output.
    pub fn next_monitor_id(&self, output_name: &str) -> MonitorId {
        let mut ids = self.monitor_ids.borrow_mut();
        if let Some(id) = ids.get(output_name) {
            return *id;
        }
        let next = ids.values().copied().max().map_or(0, |highest| highest + 1);
        ids.insert(output_name.to_string(), next);
        next
    }

    pub fn set_unsafe_output(&self, monitor: &MonitorHandle) {
        *self.unsafe_output.borrow_mut() = Rc::downgrade(monitor);
    }

    pub fn unsafe_output(&self) -> Option<MonitorHandle> {
        self.unsafe_output.borrow().upgrade()
    }

    pub fn set_most_hz_monitor(&self, monitor: &MonitorHandle) {
        *self.most_hz_monitor.borrow_mut() = Rc::downgrade(monitor);
    }

    /// The enabled monitor with the highest refresh rate seen so far.
    pub fn most_hz_monitor(&self) -> Option<MonitorHandle> {
        self.most_hz_monitor.borrow().upgrade()
    }

    pub fn monitor_from_id(&self, id: MonitorId) -> Option<MonitorHandle> {
        self.monitors
            .borrow()
            .iter()
            .find(|m| m.borrow().id == id)
            .cloned()
    }

    /// Resolve a monitor from a selector: a numeric ID, `desc:` plus a
    /// description fragment, or an exact output name.
    pub fn monitor_from_string(&self, selector: &str) -> Option<MonitorHandle> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        if is_number(selector) {
            return selector
                .parse::<MonitorId>()
                .ok()
                .and_then(|id| self.monitor_from_id(id));
        }
        if let Some(fragment) = selector.strip_prefix("desc:") {
            return self
                .monitors
                .borrow()
                .iter()
                .find(|m| m.borrow().description.contains(fragment))
                .cloned();
        }
        self.monitors
            .borrow()
            .iter()
            .find(|m| m.borrow().name == selector)
            .cloned()
    }

    pub fn monitor_from_output(&self, output: &OutputHandle) -> Option<MonitorHandle> {
        self.monitors
            .borrow()
            .iter()
            .find(|m| {
                m.borrow()
                    .output
                    .as_ref()
                    .map_or(false, |o| Rc::ptr_eq(o, output))
            })
            .cloned()
    }

    // ---- workspaces ----------------------------------------------------

    /// Create and register a workspace. At most one live workspace may
    /// hold a given ID.
    pub fn create_workspace(
        &self,
        id: WorkspaceId,
        monitor_id: MonitorId,
        name: impl Into<String>,
        special: bool,
        created_empty: bool,
    ) -> Result<WorkspaceHandle> {
        if id == WORKSPACE_INVALID {
            bail!("refusing to create a workspace with the invalid ID");
        }
        if self.workspace_by_id(id).is_some() {
            bail!("workspace with ID {id} already exists");
        }
        let workspace = Workspace::create(self, id, monitor_id, name, special, created_empty);
        self.workspaces.borrow_mut().push(Rc::clone(&workspace));
        Ok(workspace)
    }

    /// Destroy a workspace and drop it from the registry.
    pub fn destroy_workspace(&self, workspace: &WorkspaceHandle) {
        Workspace::destroy(workspace);
        self.workspaces
            .borrow_mut()
            .retain(|w| !Rc::ptr_eq(w, workspace));
    }

    /// Live (non-inert) workspace by ID.
    pub fn workspace_by_id(&self, id: WorkspaceId) -> Option<WorkspaceHandle> {
        self.workspaces
            .borrow()
            .iter()
            .find(|w| {
                let w = w.borrow();
                !w.inert && w.id == id
            })
            .cloned()
    }

    /// Live (non-inert) workspace by name.
    pub fn workspace_by_name(&self, name: &str) -> Option<WorkspaceHandle> {
        self.workspaces
            .borrow()
            .iter()
            .find(|w| {
                let w = w.borrow();
                !w.inert && w.name == name
            })
            .cloned()
    }

    /// Resolve a workspace target string to an ID: a positive number, a
    /// `name:` reference, a `special` name, or a bare workspace name.
    /// Unresolvable targets yield [`WORKSPACE_INVALID`].
    pub fn workspace_id_from_string(&self, target: &str) -> WorkspaceId {
        let target = target.trim();
        if target.is_empty() {
            return WORKSPACE_INVALID;
        }
        if let Some(name) = target.strip_prefix("name:") {
            return self
                .workspace_by_name(name)
                .map_or(WORKSPACE_INVALID, |w| w.borrow().id);
        }
        if target.starts_with("special") {
            return self
                .workspace_by_name(target)
                .map_or(WORKSPACE_INVALID, |w| w.borrow().id);
        }
        if is_number(target) {
            return match target.parse::<WorkspaceId>() {
                Ok(id) if id > 0 => id,
                _ => WORKSPACE_INVALID,
            };
        }
        self.workspace_by_name(target)
            .map_or(WORKSPACE_INVALID, |w| w.borrow().id)
    }

    /// First configured workspace rule matching this workspace.
    pub fn workspace_rule_for(&self, workspace: &WorkspaceHandle) -> WorkspaceRule {
        self.config
            .workspace_rules()
            .into_iter()
            .find(|rule| {
                workspace
                    .borrow()
                    .matches_static_selector(self, &rule.selector)
            })
            .unwrap_or_default()
    }

    // ---- windows -------------------------------------------------------

    /// Allocate a window with a fresh ID and register it.
    pub fn create_window(&self, title: impl Into<String>) -> WindowHandle {
        let id = self.next_window_id.get();
        self.next_window_id.set(id + 1);
        self.windows.add(Window::new(id, title))
    }

    /// Close a window: drop it from the registry and notify observers
    /// (workspaces clear their last-focused reference here).
    pub fn close_window(&self, window: &WindowHandle) {
        if self.windows.remove(window).is_none() {
            return;
        }
        let id = {
            let mut w = window.borrow_mut();
            w.mapped = false;
            w.id
        };
        self.events.post("closewindow", format!("{id:x}"));
        self.hooks.window_closed.emit(window);
    }

    pub fn windows_on_workspace(
        &self,
        workspace: WorkspaceId,
        only_tiled: Option<bool>,
        only_visible: Option<bool>,
    ) -> i64 {
        self.windows
            .windows_on_workspace(workspace, only_tiled, only_visible)
    }

    pub fn groups_on_workspace(
        &self,
        workspace: WorkspaceId,
        only_tiled: Option<bool>,
        only_visible: Option<bool>,
    ) -> i64 {
        self.windows
            .groups_on_workspace(workspace, only_tiled, only_visible)
    }
}
