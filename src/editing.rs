use crate::config::ArrayEditingConfig;
use crate::drive::{DriveMonitor, EditorSessionId};
use crate::editor::{EditorAdapter, ListEdit, RecordingAdapter, WidgetHandle};
use crate::error::ProxyError;
use crate::events::{HostEvent, Listener, Notification};
use crate::gate::SuppressionGate;
use crate::host::{ArrayId, ArrayMut, EditorWorld, ListId, ListMut, UserId};
use crate::registry::ProxyRegistry;
use crate::sync::{SyncEngine, SyncStats};
use bevy_ecs::prelude::Entity;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// What [`ArrayEditing::open_editor`] built for an array.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorOutcome {
    /// Proxy editing is disabled; the host's stock control was built.
    Default { widget: WidgetHandle },
    /// The array is driven; only a static label was built and no container exists.
    Driven { header: WidgetHandle, label: WidgetHandle },
    /// The element kind cannot be mirrored; fell back to the stock control.
    Unsupported { header: WidgetHandle, widget: WidgetHandle, error: ProxyError },
    Proxied {
        header: WidgetHandle,
        list: ListId,
        widget: WidgetHandle,
        session: EditorSessionId,
        newly_created: bool,
    },
}

/// Editing host: owns the world, the proxy machinery and the widget adapter, and dispatches
/// every queued notification.
pub struct ArrayEditing<A: EditorAdapter = RecordingAdapter> {
    world: EditorWorld,
    engine: SyncEngine,
    registry: ProxyRegistry,
    monitor: DriveMonitor,
    adapter: A,
    config: ArrayEditingConfig,
    tick: u64,
}

impl<A: EditorAdapter + Default> Default for ArrayEditing<A> {
    fn default() -> Self {
        Self::new(EditorWorld::new(), A::default(), ArrayEditingConfig::default())
    }
}

impl<A: EditorAdapter> ArrayEditing<A> {
    pub fn new(world: EditorWorld, adapter: A, config: ArrayEditingConfig) -> Self {
        Self {
            world,
            engine: SyncEngine::default(),
            registry: ProxyRegistry::default(),
            monitor: DriveMonitor::default(),
            adapter,
            config,
            tick: 0,
        }
    }

    pub fn open_editor(
        &mut self,
        array: ArrayId,
        viewer: UserId,
    ) -> Result<EditorOutcome, ProxyError> {
        let source = self.world.array(array).ok_or(ProxyError::UnknownArray(array))?;
        let label = source.name().to_string();
        if !self.config.enabled {
            let widget = self.adapter.build_array_control(source, &label);
            return Ok(EditorOutcome::Default { widget });
        }
        let header = self.adapter.build_label(&self.config.header_for(&label));
        if source.is_driven() {
            let label = self.adapter.build_label(&self.config.driven_label);
            return Ok(EditorOutcome::Driven { header, label });
        }

        let policy = self.config.tangent_policy;
        let resolved = match self.registry.resolve(&mut self.world, array, viewer, policy) {
            Ok(resolved) => resolved,
            Err(error @ ProxyError::UnsupportedElementKind { .. }) => {
                let source = self.world.array(array).ok_or(ProxyError::UnknownArray(array))?;
                let widget = self.adapter.build_array_control(source, &label);
                return Ok(EditorOutcome::Unsupported { header, widget, error });
            }
            Err(err) => {
                self.adapter.destroy(header);
                return Err(err);
            }
        };
        let list = resolved.binding.list;
        let mirror = self.world.list(list).ok_or(ProxyError::UnknownList(list))?;
        let widget = self.adapter.build_list_control(mirror, &label, &self.config.list);
        let session = self.monitor.watch(&mut self.world, array, viewer, list, widget)?;
        if resolved.newly_created {
            if let Some(mut target) = self.world.array_mut(array) {
                target.subscribe_unique(Listener::ArrayResync);
            }
        }
        let newly_created = resolved.newly_created;
        Ok(EditorOutcome::Proxied { header, list, widget, session, newly_created })
    }

    /// Dispatches everything queued. Each queued root notification runs in its own tick,
    /// together with every notification it causes. Mirror lists edited directly are then
    /// checked against their arrays and rewritten if they drifted. Returns how many
    /// notifications ran.
    pub fn update(&mut self) -> usize {
        let roots = self.world.take_notifications();
        if roots.is_empty() {
            self.advance_tick();
            return 0;
        }
        let mut edited_lists = BTreeSet::new();
        let mut dispatched = 0;
        for root in roots {
            if let Some(list) = root.event.list() {
                edited_lists.insert(list);
            }
            dispatched += self.run_tick(root);
        }
        for list in edited_lists {
            self.advance_tick();
            if let Err(err) = self.engine.reconcile(&mut self.world, &self.registry, list) {
                debug!("Skipped reconcile of {list}: {err}");
            }
            dispatched += self.drain_cascade();
        }
        dispatched
    }

    /// Starts a new tick without dispatching anything, releasing a due suppression.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        self.engine.begin_tick(self.tick);
    }

    fn run_tick(&mut self, root: Notification) -> usize {
        self.advance_tick();
        self.dispatch(root);
        1 + self.drain_cascade()
    }

    fn drain_cascade(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(notification) = self.world.pop_notification() {
            self.dispatch(notification);
            dispatched += 1;
        }
        dispatched
    }

    /// No queued notifications and no direction suppressed.
    pub fn is_settled(&self) -> bool {
        self.world.pending_notifications() == 0 && self.engine.gate().is_idle()
    }

    /// Applies a user edit to an array and propagates it.
    pub fn edit_array<R>(
        &mut self,
        array: ArrayId,
        edit: impl FnOnce(&mut ArrayMut<'_>) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let mut target = self.world.array_mut(array).ok_or(ProxyError::UnknownArray(array))?;
        let result = edit(&mut target);
        self.update();
        result
    }

    /// Applies a user edit to a mirror list and propagates it.
    pub fn edit_list<R>(
        &mut self,
        list: ListId,
        edit: impl FnOnce(&mut ListMut<'_>) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let mut target = self.world.list_mut(list).ok_or(ProxyError::UnknownList(list))?;
        let result = edit(&mut target);
        self.update();
        result
    }

    pub fn apply_list_edit(&mut self, edit: ListEdit) -> Result<(), ProxyError> {
        match edit {
            ListEdit::Add { list } => {
                let binding = self
                    .registry
                    .binding_for_list(&self.world, list)
                    .ok_or_else(|| ProxyError::ProxyLookupFailure { name: list.to_string() })?;
                let blank = binding.codec.blank_record();
                self.edit_list(list, |target| Ok(target.add(blank)))?;
            }
            ListEdit::Remove { list, record } => {
                self.edit_list(list, |target| target.remove_record(record))?;
            }
            ListEdit::Set { list, record, data } => {
                self.edit_list(list, |target| target.set_record(record, data))?;
            }
        }
        Ok(())
    }

    pub fn destroy_object(&mut self, object: Entity) -> usize {
        let removed = self.world.destroy_object(object);
        self.update();
        removed
    }

    pub fn disconnect_user(&mut self, user: UserId) {
        self.world.disconnect_user(user);
        self.update();
    }

    /// Mirror list currently bound to `array`, if a proxy exists.
    pub fn mirror_list(&self, array: ArrayId) -> Option<ListId> {
        self.registry.binding_for_array(&self.world, array).map(|binding| binding.list)
    }

    pub fn verify_mirror(&self, array: ArrayId) -> Result<bool, ProxyError> {
        self.engine.verify_mirror(&self.world, &self.registry, array)
    }

    pub fn stats(&self) -> SyncStats {
        self.engine.stats()
    }

    pub fn gate(&self) -> &SuppressionGate {
        self.engine.gate()
    }

    pub fn registry(&self) -> &ProxyRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &DriveMonitor {
        &self.monitor
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn config(&self) -> &ArrayEditingConfig {
        &self.config
    }

    pub fn world(&self) -> &EditorWorld {
        &self.world
    }

    /// Direct world access. Mutations made here are queued and run on the next `update`.
    pub fn world_mut(&mut self) -> &mut EditorWorld {
        &mut self.world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    fn dispatch(&mut self, notification: Notification) {
        let Notification { event, listener } = notification;
        let result = match (&event, listener) {
            (HostEvent::ArrayChanged { array }, Listener::ArrayResync) => {
                self.engine.on_array_changed(&mut self.world, &self.registry, *array)
            }
            (HostEvent::ArrayChanged { .. }, Listener::DriveMonitor(session)) => {
                self.monitor.on_array_changed(
                    session,
                    &mut self.world,
                    &mut self.registry,
                    &mut self.adapter,
                    &self.config.driven_label,
                );
                Ok(())
            }
            (HostEvent::ElementsAdded { list, start, records }, Listener::ListBinding) => self
                .engine
                .on_elements_added(&mut self.world, &self.registry, *list, *start, records),
            (HostEvent::ElementsRemoved { list, start, count }, Listener::ListBinding) => self
                .engine
                .on_elements_removed(&mut self.world, &self.registry, *list, *start, *count),
            (HostEvent::RecordChanged { list, index, data, .. }, Listener::RecordBinding) => {
                self.engine.on_record_changed(&mut self.world, &self.registry, *list, *index, data)
            }
            (HostEvent::ObjectDestroyed { object }, Listener::Lifecycle) => {
                self.registry.on_object_destroyed(&mut self.world, *object);
                self.monitor.prune(&mut self.world, &mut self.adapter);
                Ok(())
            }
            (HostEvent::UserLeft { user }, Listener::Lifecycle) => {
                self.registry.on_user_left(&mut self.world, *user);
                self.monitor.end_sessions_for(*user, &mut self.world, &mut self.adapter);
                Ok(())
            }
            (event, listener) => {
                debug!("No route for {event} -> {listener:?}");
                Ok(())
            }
        };
        if let Err(err) = result {
            if err.is_stale() {
                debug!("Ignored stale {event}: {err}");
            } else {
                warn!("Failed to handle {event}: {err}");
            }
        }
    }
}

#[cfg(feature = "editor")]
impl ArrayEditing<crate::editor::EguiAdapter> {
    /// Draws every live widget and applies the list edits made during the frame.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.adapter.show(ui, &self.world);
        for edit in self.adapter.drain_edits() {
            if let Err(err) = self.apply_list_edit(edit) {
                warn!("List edit rejected: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::value::Value;

    #[test]
    fn idle_update_still_advances_the_tick() {
        let mut editing = ArrayEditing::<RecordingAdapter>::default();
        assert_eq!(editing.update(), 0);
        assert_eq!(editing.tick(), 1);
        assert!(editing.is_settled());
    }

    #[test]
    fn open_editor_attaches_one_resync_listener() {
        let mut editing = ArrayEditing::<RecordingAdapter>::default();
        let owner = editing.world_mut().spawn_object("Owner");
        let array = editing.world_mut().create_typed_array(owner, "Values", [1.0_f32, 2.0]);
        let viewer = UserId::new(1);
        let first = editing.open_editor(array, viewer).expect("first open");
        let second = editing.open_editor(array, viewer).expect("second open");
        assert!(matches!(first, EditorOutcome::Proxied { newly_created: true, .. }));
        assert!(matches!(second, EditorOutcome::Proxied { newly_created: false, .. }));
        let changed = editing.world().array(array).expect("array").changed();
        assert_eq!(changed.count(Listener::ArrayResync), 1);
        assert_eq!(editing.monitor().len(), 2);
    }

    #[test]
    fn disabled_config_builds_the_stock_control() {
        let config = ArrayEditingConfig { enabled: false, ..ArrayEditingConfig::default() };
        let mut editing =
            ArrayEditing::new(EditorWorld::new(), RecordingAdapter::default(), config);
        let owner = editing.world_mut().spawn_object("Owner");
        let array = editing.world_mut().create_typed_array(owner, "Flags", [true]);
        let outcome = editing.open_editor(array, UserId::new(1)).expect("open");
        assert!(matches!(outcome, EditorOutcome::Default { .. }));
        assert!(editing.registry().is_empty());
        editing
            .edit_array(array, |target| target.set(0, Element::Value(Value::Bool(false))))
            .expect("edit");
        assert_eq!(editing.stats(), SyncStats::default());
    }
}
