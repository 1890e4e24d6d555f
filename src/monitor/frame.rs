//! Per-output frame event pipeline
//!
//! Routes frame, damage, commit and present signals from the backend to
//! the frame scheduler and to buffer-consuming protocol exporters. All
//! signals are keyed by the raw output handle; a signal for an output
//! whose monitor is already gone resolves to nothing and is dropped,
//! which is the expected outcome of a hotplug race.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::compositor::Compositor;
use crate::monitor::{MonitorHandle, OutputConfiguration, OutputHandle, Rect};

/// Presentation feedback delivered with a `present` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentTiming {
    pub tv_sec: u64,
    pub tv_nsec: u32,
    /// Nanoseconds until the next refresh.
    pub refresh_ns: u32,
    pub seq: u64,
}

/// State attached to an output commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitState {
    /// The commit carried a new buffer.
    pub buffer_updated: bool,
}

/// Decides when each monitor is redrawn. Consumed by this core, never
/// implemented here.
pub trait FrameScheduler {
    /// Request a redraw opportunity for a monitor.
    fn schedule_frame(&self, monitor: &MonitorHandle);
    /// A redraw opportunity arrived for a monitor.
    fn on_frame(&self, monitor: &MonitorHandle);
    /// Presentation feedback for a previously submitted frame.
    fn on_present(&self, monitor: &MonitorHandle, timing: &PresentTiming);
}

/// Protocol exporter interested in committed output buffers (screen
/// capture, toplevel export).
pub trait OutputCommitConsumer {
    fn on_output_commit(&self, monitor: &MonitorHandle, state: &CommitState);
}

/// Display layout negotiation service accepting one atomic
/// configuration for all non-fallback monitors.
pub trait LayoutNegotiator {
    fn apply_configuration(&self, configuration: &OutputConfiguration);
}

/// Default scheduler used until a real one is installed; it only logs.
pub struct LogFrameScheduler;

impl FrameScheduler for LogFrameScheduler {
    fn schedule_frame(&self, monitor: &MonitorHandle) {
        debug!("frame scheduled for monitor {}", monitor.borrow().name);
    }

    fn on_frame(&self, monitor: &MonitorHandle) {
        debug!("frame for monitor {}", monitor.borrow().name);
    }

    fn on_present(&self, monitor: &MonitorHandle, timing: &PresentTiming) {
        debug!(
            "present on monitor {} (seq {})",
            monitor.borrow().name,
            timing.seq
        );
    }
}

/// Default negotiator used until a real one is installed; it only logs.
pub struct LogLayoutNegotiator;

impl LayoutNegotiator for LogLayoutNegotiator {
    fn apply_configuration(&self, configuration: &OutputConfiguration) {
        debug!(
            "layout configuration with {} heads",
            configuration.heads.len()
        );
    }
}

/// Routes per-monitor frame, damage, commit and present signals.
#[derive(Default)]
pub struct FrameEventPipeline {
    consumers: RefCell<Vec<Rc<dyn OutputCommitConsumer>>>,
}

impl FrameEventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol exporter for committed buffers.
    pub fn add_commit_consumer(&self, consumer: Rc<dyn OutputCommitConsumer>) {
        self.consumers.borrow_mut().push(consumer);
    }

    /// The output asked for a redraw.
    pub fn on_needs_frame(&self, ctx: &Compositor, output: &OutputHandle) {
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };
        ctx.schedule_frame(&monitor);
    }

    /// The output reported a damaged region.
    pub fn on_damage(&self, ctx: &Compositor, output: &OutputHandle, region: Rect) {
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };
        monitor.borrow_mut().add_damage(region);
    }

    /// The output committed new state. Buffer updates are forwarded to
    /// every registered exporter.
    pub fn on_commit(&self, ctx: &Compositor, output: &OutputHandle, state: &CommitState) {
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };
        if !state.buffer_updated {
            return;
        }
        let consumers: Vec<Rc<dyn OutputCommitConsumer>> =
            self.consumers.borrow().iter().cloned().collect();
        for consumer in consumers {
            consumer.on_output_commit(&monitor, state);
        }
    }

    /// Presentation feedback for the output's last frame.
    pub fn on_present(&self, ctx: &Compositor, output: &OutputHandle, timing: &PresentTiming) {
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };
        ctx.frame_scheduler().on_present(&monitor, timing);
    }

    /// A redraw opportunity for the output. Consumes the one-shot
    /// exit-triggered flag first: the flag is cleared before cleanup
    /// runs, so re-entrant frame callbacks during cleanup do not
    /// recurse.
    pub fn on_frame(&self, ctx: &Compositor, output: &OutputHandle) {
        if ctx.take_exit_triggered() {
            ctx.cleanup();
            return;
        }
        let Some(monitor) = ctx.monitor_from_output(output) else {
            return;
        };
        ctx.frame_scheduler().on_frame(&monitor);
    }
}
