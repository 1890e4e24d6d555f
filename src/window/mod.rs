//! Minimal window state consumed by the workspace and monitor cores
//!
//! Windows are collaborators here, not the subject: the workspace engine
//! needs membership, mapped/visible/floating flags and group identity for
//! selector counts, the per-tick geometry nudge during workspace
//! animations, and the cached surface-monitor details invalidated on
//! hotplug.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;

use crate::config::Transform;
use crate::monitor::{Monitor, MonitorId, MONITOR_INVALID};
use crate::workspace::{WorkspaceId, WORKSPACE_INVALID};
use crate::Vec2;

pub type WindowHandle = Rc<RefCell<Window>>;
pub type WeakWindow = Weak<RefCell<Window>>;

/// One toplevel window, reduced to the state this core reads and writes.
#[derive(Debug)]
pub struct Window {
    pub id: u64,
    pub title: String,

    pub workspace_id: WorkspaceId,
    pub monitor_id: MonitorId,

    /// The surface is mapped and may be presented.
    pub mapped: bool,
    /// On a currently-shown workspace.
    pub visible: bool,
    pub floating: bool,

    /// Group this window belongs to, if any.
    pub group: Option<u64>,

    /// Static position within the workspace.
    pub position: Vec2,
    pub size: Vec2,
    /// Position actually used for presentation; workspace animations add
    /// their render offset here every tick.
    pub render_position: Vec2,

    /// Monitor whose scale/transform the surface was last configured
    /// for. Invalid after a hotplug until recomputed.
    pub last_surface_monitor: MonitorId,
    pub surface_scale: f64,
    pub surface_transform: Transform,
}

impl Window {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            workspace_id: WORKSPACE_INVALID,
            monitor_id: MONITOR_INVALID,
            mapped: false,
            visible: false,
            floating: false,
            group: None,
            position: Vec2::new(0.0, 0.0),
            size: Vec2::new(0.0, 0.0),
            render_position: Vec2::new(0.0, 0.0),
            last_surface_monitor: MONITOR_INVALID,
            surface_scale: 1.0,
            surface_transform: Transform::Normal,
        }
    }

    /// Re-derive the on-screen position from the workspace render
    /// offset. Called from the offset var's per-tick callback for every
    /// mapped floating window on an animating workspace.
    pub fn on_workspace_anim_update(&mut self, offset: Vec2) {
        self.render_position = self.position + offset;
    }

    /// Recompute the cached surface scale/transform for the monitor the
    /// window sits on.
    pub fn update_surface_scale_transform(&mut self, monitor: &Monitor) {
        self.surface_scale = monitor.scale;
        self.surface_transform = monitor.transform;
        self.last_surface_monitor = monitor.id;
        debug!(
            "Window {} surface details now scale {:.2} on monitor {}",
            self.id, self.surface_scale, self.last_surface_monitor
        );
    }
}

/// Whether a weak window reference still points at a live, mapped window.
pub fn valid_mapped(window: &WeakWindow) -> bool {
    window
        .upgrade()
        .map_or(false, |w| w.borrow().mapped)
}

/// Owns every window known to the compositor.
#[derive(Default)]
pub struct WindowRegistry {
    windows: RefCell<Vec<WindowHandle>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, window: Window) -> WindowHandle {
        let handle = Rc::new(RefCell::new(window));
        self.windows.borrow_mut().push(Rc::clone(&handle));
        handle
    }

    /// Remove a window by identity. Returns the handle if it was known.
    pub fn remove(&self, window: &WindowHandle) -> Option<WindowHandle> {
        let mut windows = self.windows.borrow_mut();
        let index = windows.iter().position(|w| Rc::ptr_eq(w, window))?;
        Some(windows.remove(index))
    }

    /// Snapshot of all windows.
    pub fn all(&self) -> Vec<WindowHandle> {
        self.windows.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.borrow().is_empty()
    }

    fn matching(
        &self,
        workspace: WorkspaceId,
        only_tiled: Option<bool>,
        only_visible: Option<bool>,
    ) -> Vec<WindowHandle> {
        self.windows
            .borrow()
            .iter()
            .filter(|w| {
                let w = w.borrow();
                if !w.mapped || w.workspace_id != workspace {
                    return false;
                }
                if let Some(tiled) = only_tiled {
                    if w.floating == tiled {
                        return false;
                    }
                }
                if only_visible == Some(true) && !w.visible {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Count windows on a workspace, optionally restricted to tiled
    /// (`Some(true)`) or floating (`Some(false)`) and to visible ones.
    pub fn windows_on_workspace(
        &self,
        workspace: WorkspaceId,
        only_tiled: Option<bool>,
        only_visible: Option<bool>,
    ) -> i64 {
        self.matching(workspace, only_tiled, only_visible).len() as i64
    }

    /// Count distinct window groups on a workspace with the same filters
    /// as [`Self::windows_on_workspace`]. Ungrouped windows do not count.
    pub fn groups_on_workspace(
        &self,
        workspace: WorkspaceId,
        only_tiled: Option<bool>,
        only_visible: Option<bool>,
    ) -> i64 {
        let mut groups: Vec<u64> = self
            .matching(workspace, only_tiled, only_visible)
            .iter()
            .filter_map(|w| w.borrow().group)
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups.len() as i64
    }
}
