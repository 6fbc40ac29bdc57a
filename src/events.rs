use crate::codec::RecordData;
use crate::drive::EditorSessionId;
use crate::host::{ArrayId, ListId, RecordId, UserId};
use bevy_ecs::prelude::Entity;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;

/// Host notifications. List events carry the data and indices as they were when raised, so
/// a handler that runs after later edits still replays the edit it describes.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    ArrayChanged { array: ArrayId },
    ElementsAdded { list: ListId, start: usize, records: Vec<RecordData> },
    ElementsRemoved { list: ListId, start: usize, count: usize },
    RecordChanged { list: ListId, record: RecordId, index: usize, data: RecordData },
    ObjectDestroyed { object: Entity },
    UserLeft { user: UserId },
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::ArrayChanged { array } => write!(f, "ArrayChanged array={array}"),
            HostEvent::ElementsAdded { list, start, records } => {
                write!(f, "ElementsAdded list={list} start={start} count={}", records.len())
            }
            HostEvent::ElementsRemoved { list, start, count } => {
                write!(f, "ElementsRemoved list={list} start={start} count={count}")
            }
            HostEvent::RecordChanged { list, record, index, .. } => {
                write!(f, "RecordChanged list={list} record={} index={index}", record.raw())
            }
            HostEvent::ObjectDestroyed { object } => {
                write!(f, "ObjectDestroyed object={}", object.index())
            }
            HostEvent::UserLeft { user } => write!(f, "UserLeft user={}", user.raw()),
        }
    }
}

impl HostEvent {
    /// Mirror list a list-originated event belongs to.
    pub fn list(&self) -> Option<ListId> {
        match self {
            HostEvent::ElementsAdded { list, .. }
            | HostEvent::ElementsRemoved { list, .. }
            | HostEvent::RecordChanged { list, .. } => Some(*list),
            _ => None,
        }
    }
}

/// Handler a notification is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Array -> list full resync.
    ArrayResync,
    /// Driven-state watch of one editor session.
    DriveMonitor(EditorSessionId),
    /// List -> array structural patching.
    ListBinding,
    /// List -> array per-record write-back.
    RecordBinding,
    /// Container and session teardown.
    Lifecycle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: HostEvent,
    pub listener: Listener,
}

/// Subscriber set of one observable. Subscribing twice delivers twice.
#[derive(Debug, Default, Clone)]
pub struct Signal {
    listeners: SmallVec<[Listener; 2]>,
}

impl Signal {
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Subscribes unless already present. Returns whether the listener was added.
    pub fn subscribe_unique(&mut self, listener: Listener) -> bool {
        if self.contains(listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Removes one subscription of `listener`. Returns whether one was present.
    pub fn unsubscribe(&mut self, listener: Listener) -> bool {
        match self.listeners.iter().position(|entry| *entry == listener) {
            Some(pos) => {
                self.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, listener: Listener) -> bool {
        self.listeners.contains(&listener)
    }

    /// Subscriptions of `listener`.
    pub fn count(&self, listener: Listener) -> usize {
        self.listeners.iter().filter(|entry| **entry == listener).count()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&self, event: HostEvent, queue: &mut EventQueue) {
        for listener in &self.listeners {
            queue.push(Notification { event: event.clone(), listener: *listener });
        }
    }
}

#[derive(Default, Debug)]
pub struct EventQueue {
    pending: VecDeque<Notification>,
}

impl EventQueue {
    pub fn push(&mut self, notification: Notification) {
        self.pending.push_back(notification);
    }

    pub fn pop(&mut self) -> Option<Notification> {
        self.pending.pop_front()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_fans_out_in_subscription_order() {
        let mut signal = Signal::default();
        signal.subscribe(Listener::ListBinding);
        signal.subscribe(Listener::ArrayResync);
        let mut queue = EventQueue::default();
        let event = HostEvent::ArrayChanged { array: ArrayId::from_raw(3) };
        signal.notify(event, &mut queue);
        let listeners: Vec<_> = queue.drain().into_iter().map(|n| n.listener).collect();
        assert_eq!(listeners, vec![Listener::ListBinding, Listener::ArrayResync]);
    }

    #[test]
    fn unsubscribe_removes_a_single_entry() {
        let mut signal = Signal::default();
        signal.subscribe(Listener::ArrayResync);
        signal.subscribe(Listener::ArrayResync);
        assert!(signal.unsubscribe(Listener::ArrayResync));
        assert_eq!(signal.len(), 1);
        assert!(!signal.subscribe_unique(Listener::ArrayResync));
        assert!(signal.unsubscribe(Listener::ArrayResync));
        assert!(!signal.unsubscribe(Listener::ArrayResync), "nothing left to remove");
    }
}
