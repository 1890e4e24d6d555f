//! Animated property engine
//!
//! Every value that animates in Prism (workspace render offsets, fade
//! alphas, client scales) is an [`AnimatedVar`]: a current value that
//! interpolates toward a target according to a named, externally
//! configured curve. Vars register with the global [`AnimationTicker`],
//! which advances them once per compositor tick and fires their update
//! callbacks synchronously within that tick.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use log::debug;

use crate::config::AnimationPropertyConfig;
use crate::Vec2;

/// Easing curves supported by animation configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EasingCurve {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl EasingCurve {
    /// Resolve a curve from its config name. Unknown names ease out.
    pub fn from_name(name: &str) -> Self {
        match name {
            "linear" => EasingCurve::Linear,
            "ease-in" => EasingCurve::EaseIn,
            "ease-out" => EasingCurve::EaseOut,
            "ease-in-out" => EasingCurve::EaseInOut,
            _ => EasingCurve::EaseOut,
        }
    }

    /// Apply the curve to a progress value in `[0, 1]`.
    pub fn apply(self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        match self {
            EasingCurve::Linear => t,
            EasingCurve::EaseIn => t * t,
            EasingCurve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            EasingCurve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Values an [`AnimatedVar`] can interpolate.
pub trait Interpolate: Copy + PartialEq + 'static {
    fn lerp(from: Self, to: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t
    }
}

impl Interpolate for Vec2 {
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t
    }
}

/// Hint describing how much of the owning entity a value change dirties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageHint {
    #[default]
    None,
    /// The whole monitor the entity sits on needs a repaint.
    Entire,
}

/// Per-tick update callback. Receives the new current value.
type UpdateCallback<T> = Box<dyn FnMut(T)>;

struct InFlight<T> {
    begun_value: T,
    /// Stamped by the first tick that sees the animation.
    started: Option<Instant>,
}

struct VarState<T: Interpolate> {
    current: T,
    target: T,
    config: AnimationPropertyConfig,
    damage: DamageHint,
    in_flight: Option<InFlight<T>>,
    callback: Option<UpdateCallback<T>>,
    ticket: Option<u64>,
}

impl<T: Interpolate> VarState<T> {
    /// Advance the animation. Returns `(changed, current)`.
    fn advance(&mut self, now: Instant) -> (bool, T) {
        let Some(flight) = self.in_flight.as_mut() else {
            return (false, self.current);
        };

        let started = *flight.started.get_or_insert(now);
        let duration_ms = self.config.duration_ms;
        let elapsed_ms = now.duration_since(started).as_secs_f64() * 1000.0;

        if !self.config.enabled || duration_ms == 0 || elapsed_ms >= duration_ms as f64 {
            self.in_flight = None;
            let changed = self.current != self.target;
            self.current = self.target;
            return (changed, self.current);
        }

        let progress = elapsed_ms / duration_ms as f64;
        let eased = EasingCurve::from_name(&self.config.curve).apply(progress);
        let next = T::lerp(flight.begun_value, self.target, eased);
        let changed = next != self.current;
        self.current = next;
        (changed, self.current)
    }
}

/// A value that interpolates from its current value to a target over time.
///
/// The handle is a cheap clone; the ticker observes the shared state
/// through a weak reference, so dropping the last handle removes the var
/// from the tick set on the next tick.
pub struct AnimatedVar<T: Interpolate> {
    inner: Rc<RefCell<VarState<T>>>,
}

impl<T: Interpolate> Clone for AnimatedVar<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Interpolate> AnimatedVar<T> {
    pub fn new(initial: T, damage: DamageHint) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VarState {
                current: initial,
                target: initial,
                config: AnimationPropertyConfig::default(),
                damage,
                in_flight: None,
                callback: None,
                ticket: None,
            })),
        }
    }

    /// Current (possibly mid-animation) value.
    pub fn value(&self) -> T {
        self.inner.borrow().current
    }

    /// The value the var is animating toward.
    pub fn goal(&self) -> T {
        self.inner.borrow().target
    }

    pub fn is_animating(&self) -> bool {
        self.inner.borrow().in_flight.is_some()
    }

    pub fn damage_hint(&self) -> DamageHint {
        self.inner.borrow().damage
    }

    pub fn config(&self) -> AnimationPropertyConfig {
        self.inner.borrow().config.clone()
    }

    /// Swap the animation config. The current value is untouched; only
    /// the curve and duration used from here on change.
    pub fn set_config(&self, config: AnimationPropertyConfig) {
        self.inner.borrow_mut().config = config;
    }

    /// Set a new target and let the tick loop interpolate toward it.
    /// A disabled or zero-length config degrades to a warp.
    pub fn set(&self, target: T) {
        let warp = {
            let mut state = self.inner.borrow_mut();
            state.target = target;
            if state.config.enabled && state.config.duration_ms > 0 {
                state.in_flight = Some(InFlight {
                    begun_value: state.current,
                    started: None,
                });
                false
            } else {
                true
            }
        };
        if warp {
            self.warp();
        }
    }

    /// Set both current and target, skipping any animation.
    pub fn set_value_and_warp(&self, value: T) {
        let changed = {
            let mut state = self.inner.borrow_mut();
            let changed = state.current != value;
            state.current = value;
            state.target = value;
            state.in_flight = None;
            changed
        };
        if changed {
            fire_callback(&self.inner);
        }
    }

    /// Force the current value to the target immediately.
    pub fn warp(&self) {
        let changed = {
            let mut state = self.inner.borrow_mut();
            let changed = state.current != state.target;
            state.current = state.target;
            state.in_flight = None;
            changed
        };
        if changed {
            fire_callback(&self.inner);
        }
    }

    /// Attach a callback fired on every tick that changed the value.
    pub fn set_update_callback(&self, callback: impl FnMut(T) + 'static) {
        self.inner.borrow_mut().callback = Some(Box::new(callback));
    }

    pub fn clear_update_callback(&self) {
        self.inner.borrow_mut().callback = None;
    }
}

/// Run the update callback outside of any state borrow so a callback may
/// touch the var it belongs to.
fn fire_callback<T: Interpolate>(inner: &Rc<RefCell<VarState<T>>>) {
    let (value, callback) = {
        let mut state = inner.borrow_mut();
        (state.current, state.callback.take())
    };
    if let Some(mut callback) = callback {
        callback(value);
        let mut state = inner.borrow_mut();
        if state.callback.is_none() {
            state.callback = Some(callback);
        }
    }
}

trait Tickable {
    /// Advance and fire the callback if the value moved. Returns whether
    /// the var is still animating.
    fn tick(&self, now: Instant) -> bool;
}

impl<T: Interpolate> Tickable for RefCell<VarState<T>> {
    fn tick(&self, now: Instant) -> bool {
        let (changed, value) = self.borrow_mut().advance(now);
        if changed {
            let callback = self.borrow_mut().callback.take();
            if let Some(mut callback) = callback {
                callback(value);
                let mut state = self.borrow_mut();
                if state.callback.is_none() {
                    state.callback = Some(callback);
                }
            }
        }
        self.borrow().in_flight.is_some()
    }
}

/// The global per-tick set of animated vars.
///
/// Holds weak handles only: a var whose owner went away is dropped from
/// the set on the next tick instead of keeping the owner alive.
pub struct AnimationTicker {
    vars: RefCell<Vec<(u64, Weak<dyn Tickable>)>>,
    next_ticket: Cell<u64>,
}

impl Default for AnimationTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationTicker {
    pub fn new() -> Self {
        Self {
            vars: RefCell::new(Vec::new()),
            next_ticket: Cell::new(1),
        }
    }

    /// Add a var to the tick set. Registering twice is a no-op.
    pub fn register<T: Interpolate>(&self, var: &AnimatedVar<T>) {
        if var.inner.borrow().ticket.is_some() {
            return;
        }
        let ticket = self.next_ticket.get();
        self.next_ticket.set(ticket + 1);
        var.inner.borrow_mut().ticket = Some(ticket);
        let shared: Rc<dyn Tickable> = var.inner.clone();
        self.vars.borrow_mut().push((ticket, Rc::downgrade(&shared)));
        debug!("Registered animated var #{ticket} with ticker");
    }

    /// Remove a var from the tick set.
    pub fn unregister<T: Interpolate>(&self, var: &AnimatedVar<T>) {
        let Some(ticket) = var.inner.borrow_mut().ticket.take() else {
            return;
        };
        self.vars.borrow_mut().retain(|(id, _)| *id != ticket);
    }

    /// Number of vars currently registered.
    pub fn registered(&self) -> usize {
        self.vars.borrow().len()
    }

    /// Advance every registered var. Callbacks run synchronously here and
    /// must not block; they may touch window geometry read by the render
    /// pass later in the same tick. Returns how many vars are still
    /// animating.
    pub fn tick(&self, now: Instant) -> usize {
        let snapshot: Vec<(u64, Weak<dyn Tickable>)> = self.vars.borrow().clone();
        let mut animating = 0;
        let mut dead = Vec::new();
        for (ticket, weak) in &snapshot {
            match weak.upgrade() {
                Some(var) => {
                    if var.tick(now) {
                        animating += 1;
                    }
                }
                None => dead.push(*ticket),
            }
        }
        if !dead.is_empty() {
            self.vars
                .borrow_mut()
                .retain(|(id, _)| !dead.contains(id));
        }
        animating
    }
}
