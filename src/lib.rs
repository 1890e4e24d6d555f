//! # Prism Compositor Core Library
//!
//! The workspace and output lifecycle engine of the Prism Wayland
//! compositor: animated workspace transitions, the workspace selector
//! language, monitor hotplug handling and the per-output frame event
//! pipeline.
//!
//! ## Architecture
//!
//! Prism is built on a modular architecture:
//! - `compositor`: Shared compositor state and cross-cutting queries
//! - `workspace`: Workspace lifecycle, transition animations and selectors
//! - `monitor`: Output lifecycle, layout negotiation and frame events
//! - `animation`: Animated property engine driven by the global tick set
//! - `window`: Minimal window state consumed by workspaces and monitors
//! - `event`: Event bus and typed lifecycle hook channels
//! - `config`: Configuration results (animation styles, rules, settings)
//!
//! Everything runs on the compositor's single event loop thread; shared
//! entities are reference counted and observed through weak handles that
//! are re-validated on every read.

pub mod animation;
pub mod compositor;
pub mod config;
pub mod event;
pub mod monitor;
pub mod window;
pub mod workspace;

// Re-export main types for easy access
pub use animation::{AnimatedVar, AnimationTicker, EasingCurve};
pub use compositor::Compositor;
pub use config::{AnimationPropertyConfig, ConfigManager, PrismConfig};
pub use event::{EventBus, HookSystem};
pub use monitor::{Monitor, MonitorLifecycleController, Output};
pub use window::{Window, WindowRegistry};
pub use workspace::Workspace;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for Prism
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 2D vector used for offsets, positions and output sizes.
pub type Vec2 = cgmath::Vector2<f64>;
