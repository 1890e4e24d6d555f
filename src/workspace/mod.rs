//! Workspace lifecycle and transition animations
//!
//! A workspace is a named, ID-addressed virtual desktop bound to one
//! monitor at a time. It owns three animated properties (render offset,
//! fade alpha, client scale) driven by the global tick set, remembers
//! the previously shown workspace, and is matchable through the selector
//! language in [`selector`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, error, info};

use crate::animation::{AnimatedVar, DamageHint};
use crate::compositor::Compositor;
use crate::event::{EventBus, HookHandle, HookSystem};
use crate::monitor::{MonitorId, MONITOR_INVALID};
use crate::window::{WeakWindow, WindowHandle};
use crate::{AnimationTicker, Vec2};

pub mod selector;

pub use selector::{parse_style_percent, SelectorParseError};

pub type WorkspaceId = i64;
pub type WorkspaceHandle = Rc<RefCell<Workspace>>;

/// Sentinel for "no workspace".
pub const WORKSPACE_INVALID: WorkspaceId = -1;

/// IDs at or below this value address named workspaces.
pub const WORKSPACE_NAME_START: WorkspaceId = -1337;

/// Aggregate fullscreen state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenMode {
    #[default]
    None,
    Fullscreen,
    Maximized,
    /// Fullscreen presentation without telling the client.
    FullscreenNoClientNotify,
}

/// An `(id, name)` pair remembered for "previous workspace" switching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceIdName {
    pub id: WorkspaceId,
    pub name: String,
}

impl Default for WorkspaceIdName {
    fn default() -> Self {
        Self {
            id: WORKSPACE_INVALID,
            name: String::new(),
        }
    }
}

/// A workspace entity. Created through [`Workspace::create`], which runs
/// the two-phase construct-then-initialize sequence; the raw constructor
/// alone leaves the workspace inert and unhooked.
pub struct Workspace {
    pub id: WorkspaceId,
    pub monitor_id: MonitorId,
    pub name: String,
    /// Overlay-style scratchpad workspace. Immutable after construction.
    pub special: bool,
    /// Set at construction, read once during init to fire the
    /// on-created-empty rule command.
    pub created_empty: bool,

    /// Detached from any monitor/ID, pending destruction. Inert
    /// workspaces are unselectable and never match rules.
    pub inert: bool,
    pub persistent: bool,
    pub visible: bool,

    pub has_fullscreen_window: bool,
    pub fullscreen_mode: FullscreenMode,

    /// Offset applied to every window on this workspace while a switch
    /// animation plays.
    pub render_offset: AnimatedVar<Vec2>,
    /// 1.0 = fully shown.
    pub alpha: AnimatedVar<f64>,
    /// Scale applied to clients for popin-style transitions. 1.0 =
    /// unscaled.
    pub scale_clients: AnimatedVar<f64>,

    prev_workspace: WorkspaceIdName,
    prev_workspace_per_monitor: WorkspaceIdName,

    last_focused: WeakWindow,

    self_ref: Weak<RefCell<Workspace>>,
    window_closed_hook: Option<HookHandle>,

    // Weak service handles; destruction during compositor teardown must
    // tolerate these being gone already.
    events: Weak<EventBus>,
    hooks: Weak<HookSystem>,
    ticker: Weak<AnimationTicker>,
}

impl Workspace {
    fn new(
        id: WorkspaceId,
        monitor_id: MonitorId,
        name: impl Into<String>,
        special: bool,
        created_empty: bool,
    ) -> Self {
        Self {
            id,
            monitor_id,
            name: name.into(),
            special,
            created_empty,
            inert: true,
            persistent: false,
            visible: false,
            has_fullscreen_window: false,
            fullscreen_mode: FullscreenMode::None,
            render_offset: AnimatedVar::new(Vec2::new(0.0, 0.0), DamageHint::Entire),
            alpha: AnimatedVar::new(1.0, DamageHint::Entire),
            scale_clients: AnimatedVar::new(1.0, DamageHint::Entire),
            prev_workspace: WorkspaceIdName::default(),
            prev_workspace_per_monitor: WorkspaceIdName::default(),
            last_focused: Weak::new(),
            self_ref: Weak::new(),
            window_closed_hook: None,
            events: Weak::new(),
            hooks: Weak::new(),
            ticker: Weak::new(),
        }
    }

    /// Allocate a workspace and run its initialization: animation wiring,
    /// rule application, hook subscription and creation events.
    /// Construction and initialization are separate phases because the
    /// hook registration needs a handle to the workspace itself; nothing
    /// is published before initialization completes. The caller owns the
    /// returned handle (normally the registry on [`Compositor`]).
    pub fn create(
        ctx: &Compositor,
        id: WorkspaceId,
        monitor_id: MonitorId,
        name: impl Into<String>,
        special: bool,
        created_empty: bool,
    ) -> WorkspaceHandle {
        let handle = Rc::new(RefCell::new(Workspace::new(
            id,
            monitor_id,
            name,
            special,
            created_empty,
        )));
        Workspace::init(&handle, ctx);
        handle
    }

    /// Second construction phase. Requires the shared handle so the
    /// window-closed hook and the lifecycle events can carry a reference
    /// back to this workspace without creating an ownership cycle.
    fn init(handle: &WorkspaceHandle, ctx: &Compositor) {
        {
            let mut ws = handle.borrow_mut();
            ws.self_ref = Rc::downgrade(handle);
            ws.events = Rc::downgrade(&ctx.events);
            ws.hooks = Rc::downgrade(&ctx.hooks);
            ws.ticker = Rc::downgrade(&ctx.ticker);

            let movement = ctx.config.animation_config(if ws.special {
                "specialWorkspaceIn"
            } else {
                "workspacesIn"
            });
            let fade = ctx.config.animation_config(if ws.special {
                "fadeSpecialWorkspaceIn"
            } else {
                "fadeWorkspacesIn"
            });

            ws.render_offset.set_config(movement.clone());
            ws.alpha.set_config(fade);
            ws.scale_clients.set_config(movement);

            ws.alpha.set_value_and_warp(1.0);
            ws.scale_clients.set_value_and_warp(1.0);

            ctx.ticker.register(&ws.render_offset);
            ctx.ticker.register(&ws.alpha);
            ctx.ticker.register(&ws.scale_clients);

            ws.inert = false;
        }

        let rule = ctx.workspace_rule_for(handle);
        let run_cmd = {
            let mut ws = handle.borrow_mut();
            if let Some(name) = rule.default_name {
                ws.name = name;
            }
            ws.persistent = rule.persistent;

            let me = Rc::downgrade(handle);
            ws.window_closed_hook = Some(ctx.hooks.window_closed.subscribe(move |closed| {
                let Some(me) = me.upgrade() else { return };
                let mut ws = me.borrow_mut();
                let matches = ws
                    .last_focused
                    .upgrade()
                    .map_or(false, |last| Rc::ptr_eq(&last, closed));
                if matches {
                    ws.last_focused = Weak::new();
                }
            }));

            if ws.created_empty {
                rule.on_created_empty_cmd
            } else {
                None
            }
        };

        if let Some(cmd) = run_cmd {
            ctx.spawn(&cmd);
        }

        let (id, name) = {
            let ws = handle.borrow();
            (ws.id, ws.name.clone())
        };
        info!("🗂️ Created workspace '{}' (id {})", name, id);
        ctx.events.post("createworkspace", name.clone());
        ctx.events.post("createworkspacev2", format!("{},{}", id, name));
        ctx.hooks.workspace_created.emit(handle);
    }

    /// Tear the workspace down: unregister its animated properties from
    /// the tick set, drop the window-closed hook and publish destroy
    /// events. Global services may already be gone during compositor
    /// shutdown, so every use is guarded.
    pub fn destroy(handle: &WorkspaceHandle) {
        let (ticker, hooks, events, hook_handle, id, name) = {
            let mut ws = handle.borrow_mut();
            (
                ws.ticker.clone(),
                ws.hooks.clone(),
                ws.events.clone(),
                ws.window_closed_hook.take(),
                ws.id,
                ws.name.clone(),
            )
        };

        if let Some(ticker) = ticker.upgrade() {
            let ws = handle.borrow();
            ticker.unregister(&ws.render_offset);
            ticker.unregister(&ws.alpha);
            ticker.unregister(&ws.scale_clients);
        }

        debug!("Destroying workspace ID {}", id);

        if let Some(hooks) = hooks.upgrade() {
            if let Some(hook) = hook_handle {
                hooks.window_closed.unsubscribe(hook);
            }
        }

        if let Some(events) = events.upgrade() {
            events.post("destroyworkspace", name.clone());
            events.post("destroyworkspacev2", format!("{},{}", id, name));
            if let Some(hooks) = hooks.upgrade() {
                hooks.workspace_destroyed.emit(handle);
            }
        }
    }

    /// Drive a workspace switch animation. `enter` selects the in/out
    /// direction, `left` the movement sign, `instant` skips the visual
    /// transition entirely.
    pub fn start_anim(&self, ctx: &Compositor, enter: bool, left: bool, instant: bool) {
        if !instant {
            let family = if self.special { "specialWorkspace" } else { "workspaces" };
            let fade_family = if self.special { "SpecialWorkspace" } else { "Workspaces" };
            let direction = if enter { "In" } else { "Out" };
            let movement = ctx.config.animation_config(&format!("{family}{direction}"));
            let fade = ctx
                .config
                .animation_config(&format!("fade{fade_family}{direction}"));

            self.alpha.set_config(fade);
            self.render_offset.set_config(movement.clone());
            self.scale_clients.set_config(movement);
        }

        // Nudge floating windows along with the offset every tick.
        let windows = Rc::downgrade(&ctx.windows);
        let workspace_id = self.id;
        self.render_offset.set_update_callback(move |offset| {
            let Some(windows) = windows.upgrade() else { return };
            for window in windows.all() {
                let mut w = window.borrow_mut();
                if !w.mapped || w.workspace_id != workspace_id || !w.floating {
                    continue;
                }
                w.on_workspace_anim_update(offset);
            }
        });

        // Alpha always animates toward full visibility on entry and
        // toward zero on exit, regardless of where it was.
        self.alpha.set_value_and_warp(if enter { 0.0 } else { 1.0 });
        self.alpha.set(if enter { 1.0 } else { 0.0 });

        let movement = self.render_offset.config();
        if movement.enabled {
            let style = movement.style;
            let monitor_size = ctx
                .monitor_from_id(self.monitor_id)
                .map(|m| m.borrow().size)
                .unwrap_or_else(|| Vec2::new(0.0, 0.0));

            if style.starts_with("slide") && style.contains('%') {
                let percent = match parse_style_percent(&style) {
                    Ok(p) => p,
                    Err(err) => {
                        error!("startAnim: invalid percentage: {err}");
                        0.0
                    }
                };
                let factor = percent / 100.0;

                self.render_offset.set_value_and_warp(Vec2::new(0.0, 0.0));
                self.scale_clients.set_value_and_warp(1.0);

                if style.starts_with("slidevert") {
                    let span = monitor_size.y * factor;
                    if enter {
                        self.render_offset
                            .set_value_and_warp(Vec2::new(0.0, if left { span } else { -span }));
                        self.render_offset.set(Vec2::new(0.0, 0.0));
                    } else {
                        self.render_offset
                            .set(Vec2::new(0.0, if left { -span } else { span }));
                    }
                } else {
                    let span = monitor_size.x * factor;
                    if enter {
                        self.render_offset
                            .set_value_and_warp(Vec2::new(if left { span } else { -span }, 0.0));
                        self.render_offset.set(Vec2::new(0.0, 0.0));
                    } else {
                        self.render_offset
                            .set(Vec2::new(if left { -span } else { span }, 0.0));
                    }
                }
            } else if style.starts_with("popin") {
                self.render_offset.set_value_and_warp(Vec2::new(0.0, 0.0));

                let percent = match parse_style_percent(&style) {
                    Ok(p) => p,
                    Err(err) => {
                        error!("startAnim: invalid percentage: {err}");
                        0.0
                    }
                };

                if enter {
                    self.scale_clients.set_value_and_warp(percent / 100.0);
                    self.scale_clients.set(1.0);
                } else {
                    self.scale_clients.set_value_and_warp(1.0);
                    self.scale_clients.set(percent / 100.0);
                }
            } else {
                // Unrecognized styles fall back to a plain slide.
                let distance = monitor_size.x + ctx.config.workspace_gap() as f64;

                self.scale_clients.set_value_and_warp(1.0);

                if enter {
                    self.render_offset
                        .set_value_and_warp(Vec2::new(if left { distance } else { -distance }, 0.0));
                    self.render_offset.set(Vec2::new(0.0, 0.0));
                } else {
                    self.render_offset
                        .set(Vec2::new(if left { -distance } else { distance }, 0.0));
                }
            }
        }

        if instant {
            self.render_offset.warp();
            self.alpha.warp();
            self.scale_clients.warp();
        }
    }

    /// Record `prev` as the workspace to return to. `None` clears both
    /// the global and the per-monitor record; a self-reference is logged
    /// and ignored. The per-monitor record is only updated when `prev`
    /// lives on the same monitor as this workspace.
    pub fn remember_prev_workspace(&mut self, prev: Option<&WorkspaceHandle>) {
        let Some(prev) = prev else {
            self.prev_workspace = WorkspaceIdName::default();
            self.prev_workspace_per_monitor = WorkspaceIdName::default();
            return;
        };

        // A handle aliasing ourselves cannot be borrowed here; it is the
        // same invalid self-reference as a matching ID.
        let Ok(prev) = prev.try_borrow() else {
            debug!("Tried to set prev workspace to the same as current one");
            return;
        };

        if prev.id == self.id {
            debug!("Tried to set prev workspace to the same as current one");
            return;
        }

        self.prev_workspace = WorkspaceIdName {
            id: prev.id,
            name: prev.name.clone(),
        };

        if prev.monitor_id == self.monitor_id {
            self.prev_workspace_per_monitor = WorkspaceIdName {
                id: prev.id,
                name: prev.name.clone(),
            };
        }
    }

    /// The remembered previous workspace, globally or for this monitor.
    pub fn prev_workspace_id_name(&self, per_monitor: bool) -> WorkspaceIdName {
        if per_monitor {
            self.prev_workspace_per_monitor.clone()
        } else {
            self.prev_workspace.clone()
        }
    }

    /// The name this workspace goes by in configuration: special
    /// workspaces by their verbatim name, positive IDs as decimal text,
    /// named workspaces with a `name:` prefix.
    pub fn config_name(&self) -> String {
        if self.special {
            return self.name.clone();
        }
        if self.id > 0 {
            return self.id.to_string();
        }
        format!("name:{}", self.name)
    }

    /// Detach from monitor and ID. Terminal state before destruction or
    /// recycling; inert workspaces resolve to nothing.
    pub fn mark_inert(&mut self) {
        self.inert = true;
        self.id = WORKSPACE_INVALID;
        self.monitor_id = MONITOR_INVALID;
        self.visible = false;
    }

    pub fn inert(&self) -> bool {
        self.inert
    }

    /// The last window focused on this workspace, if it is still mapped
    /// and still belongs here. The weak reference is never upgraded into
    /// ownership elsewhere.
    pub fn last_focused_window(&self) -> Option<WindowHandle> {
        let window = self.last_focused.upgrade()?;
        {
            let w = window.borrow();
            if !w.mapped || w.workspace_id != self.id {
                return None;
            }
        }
        Some(window)
    }

    pub fn set_last_focused_window(&mut self, window: Option<&WindowHandle>) {
        self.last_focused = window.map_or_else(Weak::new, Rc::downgrade);
    }
}

#[cfg(test)]
mod tests;
