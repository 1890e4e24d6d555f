//! Monitor lifecycle and output layout
//!
//! Wraps backend outputs in [`Monitor`] entities, tracks hotplug, and
//! negotiates the display layout. The single "unsafe fallback" output is
//! a permanently available virtual placeholder used when no real display
//! exists; it never takes part in layout negotiation or frame
//! scheduling.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, error, info};

use crate::compositor::Compositor;
use crate::config::{MonitorRule, Transform};
use crate::Vec2;

pub mod frame;

pub use frame::{
    CommitState, FrameEventPipeline, FrameScheduler, LayoutNegotiator, OutputCommitConsumer,
    PresentTiming,
};

pub type MonitorId = i64;
pub type MonitorHandle = Rc<RefCell<Monitor>>;
pub type OutputHandle = Rc<RefCell<Output>>;

/// Sentinel for "no monitor".
pub const MONITOR_INVALID: MonitorId = -1;

/// Name the backend gives the always-present headless placeholder.
pub const FALLBACK_OUTPUT_NAME: &str = "HEADLESS-1";

/// Integer rectangle used for damage tracking and layout boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One advertised display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputMode {
    pub width: i32,
    pub height: i32,
    pub refresh_mhz: i32,
    pub preferred: bool,
}

/// A backend output handle. The monitor wrapping it holds a non-owning
/// reference whose validity ends exactly at disconnect.
#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub modes: Vec<OutputMode>,
    pub current_mode: Option<OutputMode>,
    /// Fallback dimensions reported when no mode is set.
    pub width: i32,
    pub height: i32,
    pub refresh_mhz: i32,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            enabled: true,
            modes: Vec::new(),
            current_mode: None,
            width: 0,
            height: 0,
            refresh_mhz: 0,
        }
    }
}

/// One physical or virtual display sink.
#[derive(Debug)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,
    pub description: String,

    /// Nulled on disconnect, before the monitor leaves the collection,
    /// so late signals resolve to nothing instead of a dangling handle.
    pub output: Option<OutputHandle>,

    pub position: Vec2,
    pub size: Vec2,
    pub refresh_rate: f64,
    pub scale: f64,
    pub transform: Transform,
    pub vrr_active: bool,

    pub enabled: bool,
    /// Virtual/headless output the user explicitly requested.
    pub created_by_user: bool,
    /// The single placeholder output used when zero real outputs exist.
    pub is_unsafe_fallback: bool,
    pub rendering_init_passed: bool,

    /// Size override recorded from a client state request.
    pub force_size: Option<Vec2>,

    pub active_rule: MonitorRule,

    damage: Vec<Rect>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            id: MONITOR_INVALID,
            name: String::new(),
            description: String::new(),
            output: None,
            position: Vec2::new(0.0, 0.0),
            size: Vec2::new(0.0, 0.0),
            refresh_rate: 0.0,
            scale: 1.0,
            transform: Transform::Normal,
            vrr_active: false,
            enabled: false,
            created_by_user: false,
            is_unsafe_fallback: false,
            rendering_init_passed: false,
            force_size: None,
            active_rule: MonitorRule::default(),
            damage: Vec::new(),
        }
    }

    /// Center of the monitor in layout coordinates.
    pub fn middle(&self) -> Vec2 {
        self.position + self.size / 2.0
    }

    /// Accumulate a damaged region for the next repaint.
    pub fn add_damage(&mut self, region: Rect) {
        self.damage.push(region);
    }

    /// Drain the accumulated damage.
    pub fn take_damage(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.damage)
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    /// Pick the mode a rule asks for, falling back to the output's
    /// preferred mode, then to the first advertised one.
    fn pick_mode(output: &Output, rule: &MonitorRule) -> Option<OutputMode> {
        if let (Some(width), Some(height)) = (rule.width, rule.height) {
            let wanted = output.modes.iter().find(|mode| {
                mode.width == width
                    && mode.height == height
                    && rule
                        .refresh
                        .map_or(true, |hz| (mode.refresh_mhz as f64 / 1000.0 - hz).abs() < 0.5)
            });
            if let Some(mode) = wanted {
                return Some(*mode);
            }
        }
        output
            .modes
            .iter()
            .find(|mode| mode.preferred)
            .or_else(|| output.modes.first())
            .copied()
    }

    /// Apply a monitor rule: mode selection, geometry and enablement.
    /// Size honors a recorded force override first, then the selected
    /// mode, then the output's raw dimensions.
    pub fn apply_rule(&mut self, rule: &MonitorRule) {
        self.active_rule = rule.clone();

        let mut mode_size = None;
        let mut refresh = self.refresh_rate;
        if let Some(output) = &self.output {
            let mut out = output.borrow_mut();
            if let Some(mode) = Self::pick_mode(&out, rule) {
                out.current_mode = Some(mode);
                mode_size = Some(Vec2::new(mode.width as f64, mode.height as f64));
                refresh = mode.refresh_mhz as f64 / 1000.0;
            } else {
                mode_size = Some(Vec2::new(out.width as f64, out.height as f64));
                refresh = out.refresh_mhz as f64 / 1000.0;
            }
            out.enabled = !rule.disabled;
        }

        self.size = self
            .force_size
            .or(mode_size)
            .unwrap_or(self.size);
        self.refresh_rate = refresh;

        if let (Some(x), Some(y)) = (rule.x, rule.y) {
            self.position = Vec2::new(x as f64, y as f64);
        }
        self.scale = rule.scale;
        self.transform = rule.transform;
        self.vrr_active = rule.vrr;
        self.enabled = !rule.disabled;
    }

    /// Connect sequence: negotiate geometry and mode from the active
    /// rule and bring the monitor up.
    pub fn on_connect(&mut self, rule: &MonitorRule) {
        self.apply_rule(rule);
        self.rendering_init_passed = true;
        info!(
            "🖥️ Monitor {} connected: {}x{} @ {:.2}Hz scale {:.2}",
            self.name, self.size.x, self.size.y, self.refresh_rate, self.scale
        );
    }

    /// Disconnect sequence. The output handle is nulled by the caller
    /// right after this returns.
    pub fn on_disconnect(&mut self) {
        self.enabled = false;
        info!("🔌 Monitor {} disconnected", self.name);
    }
}

/// A mode requested outside the advertised list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomMode {
    pub width: i32,
    pub height: i32,
    pub refresh_mhz: i32,
}

/// Per-output entry of an atomic layout configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfigHead {
    pub name: String,
    pub enabled: bool,
    pub mode: Option<OutputMode>,
    pub custom_mode: Option<CustomMode>,
    pub position: Vec2,
    pub transform: Transform,
    pub scale: f64,
    pub adaptive_sync: bool,
}

/// The full display layout submitted as one atomic configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConfiguration {
    pub heads: Vec<OutputConfigHead>,
}

/// A client's request to change an output's state. Only honored for
/// user-created virtual outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputStateRequest {
    pub mode: Option<OutputMode>,
    pub custom_size: Option<(i32, i32)>,
}

/// Authoritative arrangement of monitors in layout space.
#[derive(Default)]
pub struct OutputLayout {
    overrides: RefCell<HashMap<MonitorId, Rect>>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a monitor to an explicit layout box.
    pub fn set_box(&self, monitor: MonitorId, rect: Rect) {
        self.overrides.borrow_mut().insert(monitor, rect);
    }

    /// The layout box for a monitor; without an explicit arrangement the
    /// monitor's own geometry is authoritative.
    pub fn box_for(&self, monitor: &Monitor) -> Rect {
        self.overrides
            .borrow()
            .get(&monitor.id)
            .copied()
            .unwrap_or_else(|| {
                Rect::new(
                    monitor.position.x as i32,
                    monitor.position.y as i32,
                    monitor.size.x as u32,
                    monitor.size.y as u32,
                )
            })
    }
}

/// Reacts to output hotplug and state-request signals, maintains the
/// monitor collection and renegotiates the display layout.
#[derive(Default)]
pub struct MonitorLifecycleController {
    /// Cleared after the first successful real-monitor connection, which
    /// warps the pointer to the new monitor's center.
    first_connect_done: Cell<bool>,
}

impl MonitorLifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new output arrived from the backend.
    pub fn on_new_output(&self, ctx: &Compositor, output: OutputHandle) {
        let name = output.borrow().name.clone();
        if name.is_empty() {
            error!("New output has no name?? Ignoring");
            return;
        }

        let monitor: MonitorHandle = Rc::new(RefCell::new(Monitor::new()));
        ctx.monitors.borrow_mut().push(Rc::clone(&monitor));

        if name == FALLBACK_OUTPUT_NAME {
            ctx.set_unsafe_output(&monitor);
        }
        let fallback = ctx
            .unsafe_output()
            .map_or(false, |m| Rc::ptr_eq(&m, &monitor));

        {
            let mut m = monitor.borrow_mut();
            m.output = Some(Rc::clone(&output));
            m.name = name.clone();
            m.description = output.borrow().description.clone();
            m.id = if fallback {
                MONITOR_INVALID
            } else {
                ctx.next_monitor_id(&name)
            };
            m.is_unsafe_fallback = fallback;
        }

        if !fallback {
            let rule = ctx.config.monitor_rule_for(&name);
            monitor.borrow_mut().on_connect(&rule);
        }

        if !monitor.borrow().enabled || fallback {
            return;
        }

        // Ready to process once we have a real monitor.
        let (id, refresh) = {
            let m = monitor.borrow();
            (m.id, m.refresh_rate)
        };
        ctx.events.post("monitoradded", name.clone());
        ctx.events.post("monitoraddedv2", format!("{},{}", id, name));
        ctx.hooks.monitor_added.emit(&monitor);

        let wins_hz = ctx
            .most_hz_monitor()
            .map_or(true, |m| refresh > m.borrow().refresh_rate);
        if wins_hz {
            ctx.set_most_hz_monitor(&monitor);
        }

        ctx.ready_to_process.set(true);
        ctx.config.set_wants_monitor_reload(true);
        ctx.schedule_frame(&monitor);

        if !self.first_connect_done.replace(true) {
            let center = monitor.borrow().middle();
            ctx.warp_pointer(center);
        } else {
            // A new monitor may change the optimal scale for surfaces of
            // windows already mapped on it.
            let m = monitor.borrow();
            for window in ctx.windows.all() {
                let mut w = window.borrow_mut();
                if w.mapped && w.monitor_id == m.id {
                    w.last_surface_monitor = MONITOR_INVALID;
                    w.update_surface_scale_transform(&m);
                }
            }
        }
    }

    /// An output disappeared. Unknown outputs are a normal no-op;
    /// hotplug races are expected.
    pub fn on_output_destroyed(&self, ctx: &Compositor, output: &OutputHandle) {
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };

        let (id, name) = {
            let m = monitor.borrow();
            (m.id, m.name.clone())
        };
        debug!("Destroy called for monitor {name}");

        monitor.borrow_mut().on_disconnect();

        {
            let mut m = monitor.borrow_mut();
            m.output = None;
            m.rendering_init_passed = false;
        }

        ctx.events.post("monitorremoved", name.clone());
        ctx.events.post("monitorremovedv2", format!("{},{}", id, name));
        ctx.hooks.monitor_removed.emit(&monitor);

        debug!("Removing monitor {name} from the monitor collection");
        ctx.monitors
            .borrow_mut()
            .retain(|m| !Rc::ptr_eq(m, &monitor));
    }

    /// The layout changed; rebuild and submit the full configuration.
    /// Positions come from the authoritative layout box; sizes stay with
    /// mode negotiation.
    pub fn on_layout_changed(&self, ctx: &Compositor) {
        let mut heads = Vec::new();

        for monitor in ctx.monitors.borrow().iter() {
            let mut m = monitor.borrow_mut();
            let Some(output) = m.output.clone() else {
                continue;
            };
            if m.is_unsafe_fallback {
                continue;
            }

            let layout_box = ctx.layout.box_for(&m);
            m.position = Vec2::new(layout_box.x as f64, layout_box.y as f64);

            let out = output.borrow();
            let (mode, custom_mode) = match out.current_mode {
                Some(mode) => (Some(mode), None),
                None => (
                    None,
                    Some(CustomMode {
                        width: out.width,
                        height: out.height,
                        refresh_mhz: out.refresh_mhz,
                    }),
                ),
            };

            heads.push(OutputConfigHead {
                name: m.name.clone(),
                enabled: out.enabled,
                mode,
                custom_mode,
                position: m.position,
                transform: m.transform,
                scale: m.scale,
                adaptive_sync: m.vrr_active,
            });
        }

        ctx.apply_layout_configuration(&OutputConfiguration { heads });
    }

    /// A client asked for an output state change. Only user-created
    /// virtual outputs may be resized this way.
    pub fn on_output_state_request(
        &self,
        ctx: &Compositor,
        monitor: &MonitorHandle,
        request: &OutputStateRequest,
    ) {
        if !monitor.borrow().created_by_user {
            return;
        }

        let size = request
            .mode
            .as_ref()
            .map(|mode| Vec2::new(mode.width as f64, mode.height as f64))
            .or_else(|| {
                request
                    .custom_size
                    .map(|(w, h)| Vec2::new(w as f64, h as f64))
            });
        let Some(size) = size else {
            return;
        };

        monitor.borrow_mut().force_size = Some(size);

        let mut rule = monitor.borrow().active_rule.clone();
        rule.width = Some(size.x as i32);
        rule.height = Some(size.y as i32);

        self.apply_monitor_rule(ctx, monitor, &rule);
    }

    /// Re-apply a rule to a live monitor and schedule a repaint.
    pub fn apply_monitor_rule(&self, ctx: &Compositor, monitor: &MonitorHandle, rule: &MonitorRule) {
        monitor.borrow_mut().apply_rule(rule);
        ctx.schedule_frame(monitor);
    }
}
