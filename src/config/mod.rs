//! Configuration results consumed by the compositor core
//!
//! This module carries the *results* of configuration: named animation
//! property configs, workspace rules, monitor rules and general settings.
//! Loading is plain TOML with serde defaults; anything not present in the
//! user file falls back to built-in values.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Animation behavior resolved from a config name such as `workspacesIn`
/// or `fadeSpecialWorkspaceOut`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationPropertyConfig {
    /// Whether this animation runs at all.
    pub enabled: bool,

    /// Duration of the interpolation (milliseconds).
    pub duration_ms: u64,

    /// Easing curve name ("linear", "ease-in", "ease-out", "ease-in-out").
    pub curve: String,

    /// Free-form style string, e.g. "slide", "slide 30%", "slidevert 20%",
    /// "popin 80%", "fade".
    pub style: String,
}

impl Default for AnimationPropertyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 250,
            curve: "ease-out".to_string(),
            style: "slide".to_string(),
        }
    }
}

/// Rule applied to workspaces matching a selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkspaceRule {
    /// Workspace selector this rule applies to (see the selector language).
    #[serde(default)]
    pub selector: String,

    /// Name override applied when the workspace is created.
    #[serde(default)]
    pub default_name: Option<String>,

    /// Persistent workspaces survive becoming empty.
    #[serde(default)]
    pub persistent: bool,

    /// Command spawned when the workspace is created empty.
    #[serde(default)]
    pub on_created_empty_cmd: Option<String>,
}

/// Output transform applied by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    #[default]
    Normal,
    Rotated90,
    Rotated180,
    Rotated270,
    Flipped,
    FlippedRotated90,
    FlippedRotated180,
    FlippedRotated270,
}

/// Per-output rule matched by output name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorRule {
    /// Output name, e.g. "DP-1". Empty matches any output.
    #[serde(default)]
    pub name: String,

    /// Requested mode size; `None` picks the preferred mode.
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,

    /// Requested refresh rate in Hz.
    #[serde(default)]
    pub refresh: Option<f64>,

    /// Layout position.
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,

    #[serde(default = "MonitorRule::default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub transform: Transform,

    /// Adaptive sync requested.
    #[serde(default)]
    pub vrr: bool,

    #[serde(default)]
    pub disabled: bool,
}

impl MonitorRule {
    fn default_scale() -> f64 {
        1.0
    }
}

impl Default for MonitorRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: None,
            height: None,
            refresh: None,
            x: None,
            y: None,
            scale: 1.0,
            transform: Transform::Normal,
            vrr: false,
            disabled: false,
        }
    }
}

/// General compositor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// Gap between adjacent workspaces during slide transitions (pixels).
    #[serde(default)]
    pub gaps_workspaces: i64,
}

/// Root configuration for the Prism core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrismConfig {
    /// Named animation overrides, keyed by config name.
    #[serde(default)]
    pub animations: HashMap<String, AnimationPropertyConfig>,

    #[serde(default)]
    pub workspace_rules: Vec<WorkspaceRule>,

    #[serde(default)]
    pub monitor_rules: Vec<MonitorRule>,

    #[serde(default)]
    pub general: GeneralConfig,
}

impl PrismConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: PrismConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Runtime configuration store queried by the core subsystems.
pub struct ConfigManager {
    animations: RefCell<HashMap<String, AnimationPropertyConfig>>,
    workspace_rules: RefCell<Vec<WorkspaceRule>>,
    monitor_rules: RefCell<Vec<MonitorRule>>,
    general: RefCell<GeneralConfig>,
    /// Set by monitor hotplug; the config frontend reloads monitor rules
    /// when it sees this.
    wants_monitor_reload: Cell<bool>,
}

impl ConfigManager {
    pub fn new(config: PrismConfig) -> Self {
        let mut animations = Self::default_animations();
        for (name, cfg) in config.animations {
            animations.insert(name, cfg);
        }
        Self {
            animations: RefCell::new(animations),
            workspace_rules: RefCell::new(config.workspace_rules),
            monitor_rules: RefCell::new(config.monitor_rules),
            general: RefCell::new(config.general),
            wants_monitor_reload: Cell::new(false),
        }
    }

    /// The built-in animation families. Movement configs default to a
    /// plain slide; fade configs carry a "fade" style.
    fn default_animations() -> HashMap<String, AnimationPropertyConfig> {
        let mut map = HashMap::new();
        let movement = AnimationPropertyConfig::default();
        let fade = AnimationPropertyConfig {
            style: "fade".to_string(),
            ..AnimationPropertyConfig::default()
        };
        for name in [
            "workspacesIn",
            "workspacesOut",
            "specialWorkspaceIn",
            "specialWorkspaceOut",
        ] {
            map.insert(name.to_string(), movement.clone());
        }
        for name in [
            "fadeWorkspacesIn",
            "fadeWorkspacesOut",
            "fadeSpecialWorkspaceIn",
            "fadeSpecialWorkspaceOut",
        ] {
            map.insert(name.to_string(), fade.clone());
        }
        map
    }

    /// Resolve an animation config by name. Unknown names fall back to
    /// the default movement config.
    pub fn animation_config(&self, name: &str) -> AnimationPropertyConfig {
        self.animations
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| {
                debug!("No animation config named '{name}', using defaults");
                AnimationPropertyConfig::default()
            })
    }

    /// Replace a named animation config at runtime.
    pub fn set_animation_config(&self, name: &str, config: AnimationPropertyConfig) {
        self.animations.borrow_mut().insert(name.to_string(), config);
    }

    pub fn workspace_rules(&self) -> Vec<WorkspaceRule> {
        self.workspace_rules.borrow().clone()
    }

    pub fn set_workspace_rules(&self, rules: Vec<WorkspaceRule>) {
        *self.workspace_rules.borrow_mut() = rules;
    }

    /// First monitor rule whose name matches the output, if any.
    pub fn monitor_rule_for(&self, output_name: &str) -> MonitorRule {
        self.monitor_rules
            .borrow()
            .iter()
            .find(|rule| rule.name.is_empty() || rule.name == output_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_monitor_rules(&self, rules: Vec<MonitorRule>) {
        *self.monitor_rules.borrow_mut() = rules;
    }

    /// Gap between adjacent workspaces used by slide transitions.
    pub fn workspace_gap(&self) -> i64 {
        self.general.borrow().gaps_workspaces
    }

    pub fn set_workspace_gap(&self, gap: i64) {
        self.general.borrow_mut().gaps_workspaces = gap;
    }

    /// Flag that monitor configuration should be reloaded.
    pub fn set_wants_monitor_reload(&self, wants: bool) {
        self.wants_monitor_reload.set(wants);
    }

    pub fn wants_monitor_reload(&self) -> bool {
        self.wants_monitor_reload.get()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(PrismConfig::default())
    }
}
