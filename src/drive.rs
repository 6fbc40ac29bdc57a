//! Watches proxied arrays for external takeover.
//!
//! Once an array reports driven, its session tears down the list editor and the proxy
//! container and never comes back; the user has to reopen the editor.

use crate::editor::{EditorAdapter, WidgetHandle};
use crate::error::ProxyError;
use crate::events::Listener;
use crate::host::{ArrayId, EditorWorld, ListId, UserId};
use crate::registry::ProxyRegistry;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EditorSessionId(u64);

impl EditorSessionId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EditorSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveState {
    Editable,
    /// Terminal.
    Driven,
}

/// One open list editor for one viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSession {
    pub array: ArrayId,
    pub viewer: UserId,
    pub list: ListId,
    pub list_widget: Option<WidgetHandle>,
    pub driven_label: Option<WidgetHandle>,
    pub state: DriveState,
}

#[derive(Default)]
pub struct DriveMonitor {
    sessions: BTreeMap<EditorSessionId, EditorSession>,
    next: u64,
    takeovers: u64,
}

impl DriveMonitor {
    pub fn watch(
        &mut self,
        world: &mut EditorWorld,
        array: ArrayId,
        viewer: UserId,
        list: ListId,
        list_widget: WidgetHandle,
    ) -> Result<EditorSessionId, ProxyError> {
        let mut target = world.array_mut(array).ok_or(ProxyError::UnknownArray(array))?;
        self.next += 1;
        let id = EditorSessionId(self.next);
        target.subscribe(Listener::DriveMonitor(id));
        self.sessions.insert(
            id,
            EditorSession {
                array,
                viewer,
                list,
                list_widget: Some(list_widget),
                driven_label: None,
                state: DriveState::Editable,
            },
        );
        debug!("Watching {array} for {id}");
        Ok(id)
    }

    /// Reacts to a change of the watched array. Returns true when this call performed the
    /// takeover.
    pub fn on_array_changed(
        &mut self,
        id: EditorSessionId,
        world: &mut EditorWorld,
        registry: &mut ProxyRegistry,
        adapter: &mut impl EditorAdapter,
        driven_label: &str,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        if session.state == DriveState::Driven {
            return false;
        }
        let Some(mut array) = world.array_mut(session.array) else {
            return false;
        };
        if !array.is_driven() {
            return false;
        }
        array.unsubscribe(Listener::DriveMonitor(id));
        if let Some(widget) = session.list_widget.take() {
            adapter.destroy(widget);
        }
        session.driven_label = Some(adapter.build_label(driven_label));
        let destroyed = registry.destroy_for_array(world, session.array);
        session.state = DriveState::Driven;
        self.takeovers += 1;
        info!("{} became driven, closed {id} (container destroyed: {destroyed})", session.array);
        true
    }

    /// Closes every session of a disconnected viewer. Returns how many were closed.
    pub fn end_sessions_for(
        &mut self,
        user: UserId,
        world: &mut EditorWorld,
        adapter: &mut impl EditorAdapter,
    ) -> usize {
        let ended: Vec<EditorSessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.viewer == user)
            .map(|(id, _)| *id)
            .collect();
        for id in &ended {
            self.close(*id, world, adapter);
        }
        ended.len()
    }

    /// Closes sessions whose array no longer exists.
    pub fn prune(&mut self, world: &mut EditorWorld, adapter: &mut impl EditorAdapter) -> usize {
        let orphaned: Vec<EditorSessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| world.array(session.array).is_none())
            .map(|(id, _)| *id)
            .collect();
        for id in &orphaned {
            self.close(*id, world, adapter);
        }
        orphaned.len()
    }

    pub fn session(&self, id: EditorSessionId) -> Option<&EditorSession> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn takeover_count(&self) -> u64 {
        self.takeovers
    }

    fn close(
        &mut self,
        id: EditorSessionId,
        world: &mut EditorWorld,
        adapter: &mut impl EditorAdapter,
    ) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        if let Some(mut array) = world.array_mut(session.array) {
            array.unsubscribe(Listener::DriveMonitor(id));
        }
        for widget in [session.list_widget, session.driven_label].into_iter().flatten() {
            adapter.destroy(widget);
        }
        debug!("Closed {id}");
    }
}
