//! Unit tests for workspace lifecycle, animations and selectors

use super::*;
use crate::compositor::{CommandSpawner, Compositor};
use crate::config::{AnimationPropertyConfig, PrismConfig, WorkspaceRule};
use crate::monitor::{MonitorHandle, Output, OutputMode};
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

fn movement_style(style: &str) -> AnimationPropertyConfig {
    AnimationPropertyConfig {
        enabled: true,
        duration_ms: 200,
        curve: "ease-out".to_string(),
        style: style.to_string(),
    }
}

fn connect_monitor(ctx: &Compositor, name: &str, width: i32, height: i32) -> MonitorHandle {
    let mut output = Output::new(name);
    output.modes = vec![OutputMode {
        width,
        height,
        refresh_mhz: 60_000,
        preferred: true,
    }];
    let output = Rc::new(RefCell::new(output));
    ctx.monitor_lifecycle.on_new_output(ctx, Rc::clone(&output));
    ctx.monitor_from_output(&output).expect("monitor connected")
}

/// Compositor with one 1000x600 monitor, the shape most tests need.
fn test_compositor() -> (Compositor, MonitorHandle) {
    let ctx = Compositor::new(PrismConfig::default());
    let monitor = connect_monitor(&ctx, "DP-1", 1000, 600);
    (ctx, monitor)
}

fn approx(value: f64, expected: f64) -> bool {
    (value - expected).abs() < 1e-9
}

#[test]
fn test_create_publishes_events_and_registers_vars() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let before = ctx.ticker.registered();
    let workspace = ctx.create_workspace(5, monitor_id, "web", false, false)?;

    assert!(!workspace.borrow().inert());
    assert_eq!(ctx.ticker.registered(), before + 3);

    let names: Vec<(String, String)> = ctx
        .events
        .recent()
        .into_iter()
        .map(|e| (e.name, e.data))
        .collect();
    assert!(names.contains(&("createworkspace".to_string(), "web".to_string())));
    assert!(names.contains(&("createworkspacev2".to_string(), "5,web".to_string())));

    Ok(())
}

#[test]
fn test_create_rejects_duplicate_ids() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    ctx.create_workspace(5, monitor_id, "web", false, false)?;
    assert!(ctx.create_workspace(5, monitor_id, "other", false, false).is_err());
    assert!(ctx.create_workspace(WORKSPACE_INVALID, monitor_id, "x", false, false).is_err());

    Ok(())
}

#[test]
fn test_destroy_unregisters_and_publishes() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(5, monitor_id, "web", false, false)?;
    assert_eq!(ctx.ticker.registered(), 3);

    ctx.destroy_workspace(&workspace);
    assert_eq!(ctx.ticker.registered(), 0);
    assert!(ctx.workspace_by_id(5).is_none());

    let names: Vec<(String, String)> = ctx
        .events
        .recent()
        .into_iter()
        .map(|e| (e.name, e.data))
        .collect();
    assert!(names.contains(&("destroyworkspacev2".to_string(), "5,web".to_string())));

    Ok(())
}

#[test]
fn test_workspace_rule_applies_name_and_persistence() -> Result<()> {
    struct RecordingSpawner {
        commands: RefCell<Vec<String>>,
    }
    impl CommandSpawner for RecordingSpawner {
        fn spawn(&self, command: &str) {
            self.commands.borrow_mut().push(command.to_string());
        }
    }

    let mut config = PrismConfig::default();
    config.workspace_rules.push(WorkspaceRule {
        selector: "5".to_string(),
        default_name: Some("browser".to_string()),
        persistent: true,
        on_created_empty_cmd: Some("firefox".to_string()),
    });

    let ctx = Compositor::new(config);
    let monitor = connect_monitor(&ctx, "DP-1", 1000, 600);
    let monitor_id = monitor.borrow().id;

    let spawner = Rc::new(RecordingSpawner {
        commands: RefCell::new(Vec::new()),
    });
    ctx.set_command_spawner(Rc::clone(&spawner) as Rc<dyn CommandSpawner>);

    // Created empty: the rule command runs and the name is overridden.
    let workspace = ctx.create_workspace(5, monitor_id, "5", false, true)?;
    assert_eq!(workspace.borrow().name, "browser");
    assert!(workspace.borrow().persistent);
    assert_eq!(spawner.commands.borrow().as_slice(), ["firefox"]);

    // Not created empty: no spawn.
    let other = ctx.create_workspace(6, monitor_id, "6", false, false)?;
    assert_eq!(spawner.commands.borrow().len(), 1);
    assert!(!other.borrow().persistent);

    Ok(())
}

#[test]
fn test_config_name_forms() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let numbered = ctx.create_workspace(5, monitor_id, "5", false, false)?;
    assert_eq!(numbered.borrow().config_name(), "5");

    let named = ctx.create_workspace(WORKSPACE_NAME_START - 1, monitor_id, "foo", false, false)?;
    assert_eq!(named.borrow().config_name(), "name:foo");

    let special = ctx.create_workspace(-99, monitor_id, "special:term", true, false)?;
    assert_eq!(special.borrow().config_name(), "special:term");

    Ok(())
}

#[test]
fn test_mark_inert_detaches() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(5, monitor_id, "web", false, false)?;
    workspace.borrow_mut().visible = true;
    workspace.borrow_mut().mark_inert();

    let ws = workspace.borrow();
    assert!(ws.inert());
    assert_eq!(ws.id, WORKSPACE_INVALID);
    assert_eq!(ws.monitor_id, crate::monitor::MONITOR_INVALID);
    assert!(!ws.visible);

    // Inert workspaces resolve to nothing.
    drop(ws);
    assert!(ctx.workspace_by_id(WORKSPACE_INVALID).is_none());
    assert!(!workspace.borrow().matches_static_selector(&ctx, "name:web"));

    Ok(())
}

#[test]
fn test_remember_prev_workspace() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    let other_monitor = connect_monitor(&ctx, "DP-2", 1920, 1080);
    let other_monitor_id = other_monitor.borrow().id;

    let current = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    let same_monitor = ctx.create_workspace(2, monitor_id, "two", false, false)?;
    let elsewhere = ctx.create_workspace(3, other_monitor_id, "three", false, false)?;

    // Same monitor: both records update.
    current
        .borrow_mut()
        .remember_prev_workspace(Some(&same_monitor));
    {
        let ws = current.borrow();
        assert_eq!(ws.prev_workspace_id_name(false).id, 2);
        assert_eq!(ws.prev_workspace_id_name(true).id, 2);
        assert_eq!(ws.prev_workspace_id_name(false).name, "two");
    }

    // Different monitor: only the global record updates.
    current
        .borrow_mut()
        .remember_prev_workspace(Some(&elsewhere));
    {
        let ws = current.borrow();
        assert_eq!(ws.prev_workspace_id_name(false).id, 3);
        assert_eq!(ws.prev_workspace_id_name(true).id, 2);
    }

    // Self-reference by ID: logged and ignored.
    let twin = ctx.create_workspace(10, monitor_id, "ten", false, false)?;
    let other_twin = Workspace::create(&ctx, 10, monitor_id, "ten-alias", false, false);
    twin.borrow_mut().remember_prev_workspace(Some(&other_twin));
    assert_eq!(twin.borrow().prev_workspace_id_name(false).id, WORKSPACE_INVALID);

    // Aliasing handle: same invalid self-reference, still ignored.
    current.borrow_mut().remember_prev_workspace(Some(&current));
    assert_eq!(current.borrow().prev_workspace_id_name(false).id, 3);

    // None clears both records.
    current.borrow_mut().remember_prev_workspace(None);
    {
        let ws = current.borrow();
        assert_eq!(ws.prev_workspace_id_name(false).id, WORKSPACE_INVALID);
        assert_eq!(ws.prev_workspace_id_name(false).name, "");
        assert_eq!(ws.prev_workspace_id_name(true).id, WORKSPACE_INVALID);
    }

    Ok(())
}

#[test]
fn test_last_focused_window_invalidated_on_close() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    let window = ctx.create_window("editor");
    {
        let mut w = window.borrow_mut();
        w.mapped = true;
        w.workspace_id = 1;
        w.monitor_id = monitor_id;
    }

    workspace
        .borrow_mut()
        .set_last_focused_window(Some(&window));
    assert!(workspace.borrow().last_focused_window().is_some());

    ctx.close_window(&window);
    assert!(workspace.borrow().last_focused_window().is_none());

    Ok(())
}

#[test]
fn test_last_focused_window_revalidated_on_read() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    let window = ctx.create_window("editor");
    {
        let mut w = window.borrow_mut();
        w.mapped = true;
        w.workspace_id = 1;
    }
    workspace
        .borrow_mut()
        .set_last_focused_window(Some(&window));

    // Window wandered to another workspace: the weak reference no longer
    // resolves, without having been explicitly cleared.
    window.borrow_mut().workspace_id = 2;
    assert!(workspace.borrow().last_focused_window().is_none());

    window.borrow_mut().workspace_id = 1;
    window.borrow_mut().mapped = false;
    assert!(workspace.borrow().last_focused_window().is_none());

    Ok(())
}

// ---- startAnim -------------------------------------------------------

#[test]
fn test_start_anim_slide_percentage_entering() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide 30%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    workspace.borrow().start_anim(&ctx, true, true, false);

    let ws = workspace.borrow();
    let offset = ws.render_offset.value();
    assert!(approx(offset.x, 300.0), "got {:?}", offset);
    assert!(approx(offset.y, 0.0));
    assert_eq!(ws.render_offset.goal(), crate::Vec2::new(0.0, 0.0));

    // Entering from the right flips the sign.
    drop(ws);
    workspace.borrow().start_anim(&ctx, true, false, false);
    assert!(approx(workspace.borrow().render_offset.value().x, -300.0));

    Ok(())
}

#[test]
fn test_start_anim_slide_percentage_leaving() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesOut", movement_style("slide 30%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    workspace.borrow().start_anim(&ctx, false, true, false);

    let ws = workspace.borrow();
    // Already-visible workspace animates away: no warp, only a target.
    assert_eq!(ws.render_offset.value(), crate::Vec2::new(0.0, 0.0));
    assert!(approx(ws.render_offset.goal().x, -300.0));

    Ok(())
}

#[test]
fn test_start_anim_slidevert_uses_vertical_axis() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slidevert 20%"));
    ctx.config
        .set_animation_config("workspacesOut", movement_style("slidevert 20%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;

    workspace.borrow().start_anim(&ctx, true, true, false);
    {
        let ws = workspace.borrow();
        assert!(approx(ws.render_offset.value().y, 120.0));
        assert!(approx(ws.render_offset.value().x, 0.0));
    }

    workspace.borrow().start_anim(&ctx, false, false, false);
    {
        let ws = workspace.borrow();
        assert!(approx(ws.render_offset.goal().y, 120.0));
    }

    Ok(())
}

#[test]
fn test_start_anim_unparseable_percentage_collapses_to_origin() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide abc%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    workspace.borrow().start_anim(&ctx, true, true, false);

    // Percentage defaults to zero; the switch still completes.
    let ws = workspace.borrow();
    assert_eq!(ws.render_offset.value(), crate::Vec2::new(0.0, 0.0));
    assert_eq!(ws.render_offset.goal(), crate::Vec2::new(0.0, 0.0));
    assert_eq!(ws.alpha.goal(), 1.0);

    Ok(())
}

#[test]
fn test_start_anim_popin_animates_scale() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("popin 80%"));
    ctx.config
        .set_animation_config("workspacesOut", movement_style("popin 80%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;

    workspace.borrow().start_anim(&ctx, true, true, false);
    {
        let ws = workspace.borrow();
        assert_eq!(ws.render_offset.value(), crate::Vec2::new(0.0, 0.0));
        assert!(approx(ws.scale_clients.value(), 0.8));
        assert!(approx(ws.scale_clients.goal(), 1.0));
    }

    workspace.borrow().start_anim(&ctx, false, true, false);
    {
        let ws = workspace.borrow();
        assert!(approx(ws.scale_clients.value(), 1.0));
        assert!(approx(ws.scale_clients.goal(), 0.8));
    }

    Ok(())
}

#[test]
fn test_start_anim_plain_slide_fallback_uses_gap() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config.set_workspace_gap(20);
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide"));
    ctx.config
        .set_animation_config("workspacesOut", movement_style("slide"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;

    workspace.borrow().start_anim(&ctx, true, true, false);
    {
        let ws = workspace.borrow();
        assert!(approx(ws.render_offset.value().x, 1020.0));
        assert_eq!(ws.render_offset.goal(), crate::Vec2::new(0.0, 0.0));
        assert!(approx(ws.scale_clients.value(), 1.0));
    }

    workspace.borrow().start_anim(&ctx, false, true, false);
    assert!(approx(workspace.borrow().render_offset.goal().x, -1020.0));

    Ok(())
}

#[test]
fn test_start_anim_unrecognized_style_falls_back_to_slide() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("wobble"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    workspace.borrow().start_anim(&ctx, true, true, false);

    assert!(approx(workspace.borrow().render_offset.value().x, 1000.0));

    Ok(())
}

#[test]
fn test_start_anim_alpha_is_monotonic() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;

    workspace.borrow().start_anim(&ctx, true, true, false);
    {
        let ws = workspace.borrow();
        assert_eq!(ws.alpha.value(), 0.0);
        assert_eq!(ws.alpha.goal(), 1.0);
    }

    workspace.borrow().start_anim(&ctx, false, true, false);
    {
        let ws = workspace.borrow();
        assert_eq!(ws.alpha.value(), 1.0);
        assert_eq!(ws.alpha.goal(), 0.0);
    }

    Ok(())
}

#[test]
fn test_start_anim_instant_warps_everything() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide 30%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;
    workspace.borrow().start_anim(&ctx, true, true, true);

    let ws = workspace.borrow();
    assert_eq!(ws.render_offset.value(), ws.render_offset.goal());
    assert_eq!(ws.alpha.value(), 1.0);
    assert!(!ws.render_offset.is_animating());
    assert!(!ws.alpha.is_animating());

    Ok(())
}

#[test]
fn test_start_anim_special_workspace_uses_special_family() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("specialWorkspaceIn", movement_style("popin 50%"));

    let special = ctx.create_workspace(-99, monitor_id, "special:term", true, false)?;
    special.borrow().start_anim(&ctx, true, true, false);

    assert!(approx(special.borrow().scale_clients.value(), 0.5));

    Ok(())
}

#[test]
fn test_start_anim_nudges_floating_windows() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide 30%"));

    let workspace = ctx.create_workspace(1, monitor_id, "one", false, false)?;

    let floating = ctx.create_window("panel");
    {
        let mut w = floating.borrow_mut();
        w.mapped = true;
        w.floating = true;
        w.workspace_id = 1;
        w.position = crate::Vec2::new(10.0, 20.0);
    }
    let tiled = ctx.create_window("editor");
    {
        let mut w = tiled.borrow_mut();
        w.mapped = true;
        w.floating = false;
        w.workspace_id = 1;
        w.position = crate::Vec2::new(50.0, 60.0);
    }

    workspace.borrow().start_anim(&ctx, true, true, false);

    // The warp to the pre-entry offset already nudged the floating
    // window; tiled windows are untouched.
    assert!(approx(floating.borrow().render_position.x, 310.0));
    assert!(approx(floating.borrow().render_position.y, 20.0));
    assert_eq!(tiled.borrow().render_position, crate::Vec2::new(0.0, 0.0));

    // Finishing the animation pulls it back to its own position.
    let t0 = std::time::Instant::now();
    ctx.tick(t0);
    ctx.tick(t0 + std::time::Duration::from_millis(500));
    assert!(approx(floating.borrow().render_position.x, 10.0));

    Ok(())
}

#[test]
fn test_start_anim_survives_missing_monitor() -> Result<()> {
    let ctx = Compositor::new(PrismConfig::default());
    ctx.config
        .set_animation_config("workspacesIn", movement_style("slide 30%"));

    // No monitor at all: the switch degrades to a zero offset instead of
    // failing.
    let workspace = ctx.create_workspace(1, 7, "orphan", false, false)?;
    workspace.borrow().start_anim(&ctx, true, true, false);

    assert_eq!(
        workspace.borrow().render_offset.value(),
        crate::Vec2::new(0.0, 0.0)
    );

    Ok(())
}

// ---- selectors -------------------------------------------------------

#[test]
fn test_selector_empty_matches_everything() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(5, monitor_id, "web", false, false)?;
    assert!(workspace.borrow().matches_static_selector(&ctx, ""));
    assert!(workspace.borrow().matches_static_selector(&ctx, "  "));

    Ok(())
}

#[test]
fn test_selector_numeric_resolves_ids() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(5, monitor_id, "web", false, false)?;
    assert!(workspace.borrow().matches_static_selector(&ctx, "5"));
    assert!(!workspace.borrow().matches_static_selector(&ctx, "6"));
    // Unresolvable numeric selectors never match.
    assert!(!workspace.borrow().matches_static_selector(&ctx, "0"));
    assert!(!workspace.borrow().matches_static_selector(&ctx, "-5"));

    Ok(())
}

#[test]
fn test_selector_name_and_special_forms() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let named = ctx.create_workspace(5, monitor_id, "web", false, false)?;
    assert!(named.borrow().matches_static_selector(&ctx, "name:web"));
    assert!(!named.borrow().matches_static_selector(&ctx, "name:wEb"));

    let special = ctx.create_workspace(-99, monitor_id, "special:term", true, false)?;
    assert!(special
        .borrow()
        .matches_static_selector(&ctx, "special:term"));
    assert!(!special.borrow().matches_static_selector(&ctx, "special"));

    Ok(())
}

#[test]
fn test_selector_range_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(3, monitor_id, "three", false, false)?;
    let ws = workspace.borrow();

    assert!(ws.matches_static_selector(&ctx, "r[1-5]"));
    assert!(ws.matches_static_selector(&ctx, "r[3-3]"));
    assert!(!ws.matches_static_selector(&ctx, "r[4-9]"));

    // Malformed ranges fail the whole selector.
    assert!(!ws.matches_static_selector(&ctx, "r[5-2]"));
    assert!(!ws.matches_static_selector(&ctx, "r[0-3]"));
    assert!(!ws.matches_static_selector(&ctx, "r[1-]"));
    assert!(!ws.matches_static_selector(&ctx, "r[a-5]"));
    assert!(!ws.matches_static_selector(&ctx, "r[3]"));

    Ok(())
}

#[test]
fn test_selector_special_flag_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let normal = ctx.create_workspace(3, monitor_id, "three", false, false)?;
    let special = ctx.create_workspace(-99, monitor_id, "special:term", true, false)?;

    assert!(!normal.borrow().matches_static_selector(&ctx, "s[1]"));
    assert!(normal.borrow().matches_static_selector(&ctx, "s[0]"));
    assert!(special.borrow().matches_static_selector(&ctx, "s[1]"));
    assert!(special.borrow().matches_static_selector(&ctx, "s[true]"));
    assert!(!normal.borrow().matches_static_selector(&ctx, "s[maybe]"));

    // Conjunction: every predicate must hold.
    assert!(normal
        .borrow()
        .matches_static_selector(&ctx, "s[0] r[1-5]"));
    assert!(!normal
        .borrow()
        .matches_static_selector(&ctx, "s[1] r[1-5]"));

    Ok(())
}

#[test]
fn test_selector_named_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let plain = ctx.create_workspace(3, monitor_id, "scratch", false, false)?;
    let named = ctx.create_workspace(WORKSPACE_NAME_START - 5, monitor_id, "mail", false, false)?;

    assert!(named.borrow().matches_static_selector(&ctx, "n[1]"));
    assert!(!named.borrow().matches_static_selector(&ctx, "n[0]"));
    assert!(plain.borrow().matches_static_selector(&ctx, "n[0]"));

    assert!(plain.borrow().matches_static_selector(&ctx, "n[s:scr]"));
    assert!(!plain.borrow().matches_static_selector(&ctx, "n[s:xyz]"));
    assert!(plain.borrow().matches_static_selector(&ctx, "n[e:atch]"));
    assert!(!plain.borrow().matches_static_selector(&ctx, "n[e:xyz]"));

    Ok(())
}

#[test]
fn test_selector_monitor_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;
    let other = connect_monitor(&ctx, "DP-2", 1920, 1080);
    let other_id = other.borrow().id;

    let workspace = ctx.create_workspace(3, monitor_id, "three", false, false)?;
    let ws = workspace.borrow();

    assert!(ws.matches_static_selector(&ctx, "m[DP-1]"));
    assert!(!ws.matches_static_selector(&ctx, "m[DP-2]"));
    assert!(ws.matches_static_selector(&ctx, &format!("m[{monitor_id}]")));
    assert!(!ws.matches_static_selector(&ctx, &format!("m[{other_id}]")));
    // A monitor selector resolving to nothing never matches.
    assert!(!ws.matches_static_selector(&ctx, "m[HDMI-A-9]"));

    Ok(())
}

#[test]
fn test_selector_window_count_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(3, monitor_id, "three", false, false)?;

    let spawn = |floating: bool, visible: bool, group: Option<u64>| {
        let window = ctx.create_window("w");
        let mut w = window.borrow_mut();
        w.mapped = true;
        w.workspace_id = 3;
        w.monitor_id = monitor_id;
        w.floating = floating;
        w.visible = visible;
        w.group = group;
    };
    spawn(false, true, Some(1));
    spawn(false, false, Some(1));
    spawn(true, true, None);

    let ws = workspace.borrow();
    assert!(ws.matches_static_selector(&ctx, "w[3]"));
    assert!(!ws.matches_static_selector(&ctx, "w[2]"));
    assert!(ws.matches_static_selector(&ctx, "w[1-4]"));
    assert!(!ws.matches_static_selector(&ctx, "w[4-9]"));

    // Tiled / floating filters.
    assert!(ws.matches_static_selector(&ctx, "w[t2]"));
    assert!(ws.matches_static_selector(&ctx, "w[f1]"));

    // Group counting: one group, regardless of member count.
    assert!(ws.matches_static_selector(&ctx, "w[g1]"));
    assert!(!ws.matches_static_selector(&ctx, "w[g2]"));

    // Visible-only counting.
    assert!(ws.matches_static_selector(&ctx, "w[v2]"));
    assert!(ws.matches_static_selector(&ctx, "w[tv1]"));

    // Non-numeric counts fail closed.
    assert!(!ws.matches_static_selector(&ctx, "w[abc]"));

    Ok(())
}

#[test]
fn test_selector_fullscreen_predicate() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(3, monitor_id, "three", false, false)?;

    assert!(workspace.borrow().matches_static_selector(&ctx, "f[-1]"));
    assert!(!workspace.borrow().matches_static_selector(&ctx, "f[0]"));

    {
        let mut ws = workspace.borrow_mut();
        ws.has_fullscreen_window = true;
        ws.fullscreen_mode = FullscreenMode::Fullscreen;
    }
    assert!(workspace.borrow().matches_static_selector(&ctx, "f[0]"));
    assert!(!workspace.borrow().matches_static_selector(&ctx, "f[1]"));
    assert!(!workspace.borrow().matches_static_selector(&ctx, "f[-1]"));

    {
        let mut ws = workspace.borrow_mut();
        ws.fullscreen_mode = FullscreenMode::Maximized;
    }
    assert!(workspace.borrow().matches_static_selector(&ctx, "f[1]"));

    // Out-of-range values are accepted without a state check.
    assert!(workspace.borrow().matches_static_selector(&ctx, "f[2]"));
    assert!(workspace.borrow().matches_static_selector(&ctx, "f[7]"));
    // Non-numeric still fails closed.
    assert!(!workspace.borrow().matches_static_selector(&ctx, "f[full]"));

    Ok(())
}

#[test]
fn test_selector_rejects_unknown_and_malformed() -> Result<()> {
    let (ctx, monitor) = test_compositor();
    let monitor_id = monitor.borrow().id;

    let workspace = ctx.create_workspace(3, monitor_id, "three", false, false)?;
    let ws = workspace.borrow();

    assert!(!ws.matches_static_selector(&ctx, "x[1]"));
    assert!(!ws.matches_static_selector(&ctx, "r1-5"));
    assert!(!ws.matches_static_selector(&ctx, "r[1-5"));
    assert!(!ws.matches_static_selector(&ctx, "s[0] q[1]"));

    Ok(())
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_range_selector_matches_iff_in_range(
            from in 1i64..50,
            span in 0i64..50,
            id in 1i64..120,
        ) {
            let (ctx, monitor) = test_compositor();
            let monitor_id = monitor.borrow().id;
            let to = from + span;

            let workspace = ctx
                .create_workspace(id, monitor_id, "ws", false, false)
                .unwrap();
            let matched = workspace
                .borrow()
                .matches_static_selector(&ctx, &format!("r[{from}-{to}]"));

            prop_assert_eq!(matched, from <= id && id <= to);
        }

        #[test]
        fn test_empty_selector_matches_any_live_workspace(id in 1i64..10_000) {
            let (ctx, monitor) = test_compositor();
            let monitor_id = monitor.borrow().id;

            let workspace = ctx
                .create_workspace(id, monitor_id, "ws", false, false)
                .unwrap();
            prop_assert!(workspace.borrow().matches_static_selector(&ctx, ""));
        }

        #[test]
        fn test_percent_parse_never_panics(style in ".{0,40}") {
            let _ = parse_style_percent(&style);
        }

        #[test]
        fn test_arbitrary_selectors_never_panic(selector in ".{0,40}") {
            let (ctx, monitor) = test_compositor();
            let monitor_id = monitor.borrow().id;

            let workspace = ctx
                .create_workspace(1, monitor_id, "ws", false, false)
                .unwrap();
            let _ = workspace.borrow().matches_static_selector(&ctx, &selector);
        }
    }
}
