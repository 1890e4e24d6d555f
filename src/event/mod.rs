//! Event bus and typed lifecycle hooks
//!
//! Two complementary mechanisms:
//! - [`EventBus`]: string events consumed by IPC clients. Lifecycle
//!   transitions emit a legacy name-only event plus a versioned event
//!   with a comma-joined `id,name` payload.
//! - [`HookSystem`]: compile-time-typed channels, one per topic, used by
//!   in-process subscribers that need the actual entity reference.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::monitor::MonitorHandle;
use crate::window::WindowHandle;
use crate::workspace::WorkspaceHandle;

/// How many recent events the bus keeps for late consumers.
const EVENT_BACKLOG: usize = 64;

/// A string event as delivered to IPC subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub data: String,
}

type EventSubscriber = Rc<dyn Fn(&Event)>;

/// Broadcast bus for string events.
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<Vec<EventSubscriber>>,
    backlog: RefCell<VecDeque<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to all subscribers.
    pub fn post(&self, name: impl Into<String>, data: impl Into<String>) {
        let event = Event {
            name: name.into(),
            data: data.into(),
        };
        trace!("event: {} [{}]", event.name, event.data);
        {
            let mut backlog = self.backlog.borrow_mut();
            if backlog.len() == EVENT_BACKLOG {
                backlog.pop_front();
            }
            backlog.push_back(event.clone());
        }
        // Deliver from a snapshot so a subscriber may post follow-up
        // events or subscribe during delivery.
        let snapshot: Vec<EventSubscriber> = self.subscribers.borrow().iter().cloned().collect();
        for subscriber in snapshot {
            subscriber(&event);
        }
    }

    pub fn subscribe(&self, subscriber: impl Fn(&Event) + 'static) {
        self.subscribers.borrow_mut().push(Rc::new(subscriber));
    }

    /// Recently posted events, oldest first.
    pub fn recent(&self) -> Vec<Event> {
        self.backlog.borrow().iter().cloned().collect()
    }
}

/// Handle returned by [`Channel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

type HookCallback<T> = Rc<dyn Fn(&T)>;

/// A typed publish/subscribe channel for one event topic.
pub struct Channel<T> {
    subscribers: RefCell<Vec<(HookHandle, HookCallback<T>)>>,
    next_handle: Cell<u64>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
        }
    }
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> HookHandle {
        let handle = HookHandle(self.next_handle.get());
        self.next_handle.set(self.next_handle.get() + 1);
        self.subscribers
            .borrow_mut()
            .push((handle, Rc::new(callback)));
        handle
    }

    /// Returns whether the handle was still subscribed.
    pub fn unsubscribe(&self, handle: HookHandle) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let before = subs.len();
        subs.retain(|(h, _)| *h != handle);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver to every subscriber. The list is snapshotted first, so a
    /// callback may subscribe or unsubscribe during delivery.
    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<HookCallback<T>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(payload);
        }
    }
}

/// Typed hook channels for lifecycle topics, one channel per event kind.
#[derive(Default)]
pub struct HookSystem {
    /// A mapped window was closed.
    pub window_closed: Channel<WindowHandle>,
    pub workspace_created: Channel<WorkspaceHandle>,
    pub workspace_destroyed: Channel<WorkspaceHandle>,
    pub monitor_added: Channel<MonitorHandle>,
    pub monitor_removed: Channel<MonitorHandle>,
}

impl HookSystem {
    pub fn new() -> Self {
        Self::default()
    }
}
