mod array;
mod list;

pub use array::{ArrayMut, SyncArray};
pub use list::{ListMut, MirrorList, Record};

use crate::codec::MirrorSource;
use crate::element::{ArrayElement, Element, ElementType};
use crate::events::{EventQueue, HostEvent, Listener, Notification};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use std::fmt;

// ---------- Identities ----------
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayId(u64);

impl ArrayId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArrayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListId(u64);

impl ListId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Identity of a record within its list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u64);

impl RecordId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(u32);

impl UserId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

// ---------- Components ----------
#[derive(Component, Clone, Debug)]
pub struct ObjectName(pub String);
#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);
#[derive(Component, Default)]
pub struct Children(pub Vec<Entity>);
/// Excluded from saves.
#[derive(Component, Clone, Copy, Default)]
pub struct NonPersistent;

// ---------- World container ----------
/// Host side of the mirror: scene objects, arrays and mirror lists, plus the queue every
/// change notification goes through.
pub struct EditorWorld {
    pub objects: World,
    arrays: HashMap<ArrayId, SyncArray>,
    lists: HashMap<ListId, MirrorList>,
    queue: EventQueue,
    next_id: u64,
    assets_root: Entity,
}

impl Default for EditorWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorWorld {
    pub fn new() -> Self {
        let mut objects = World::new();
        let assets_root =
            objects.spawn((ObjectName("Assets".to_string()), Children::default())).id();
        Self {
            objects,
            arrays: HashMap::new(),
            lists: HashMap::new(),
            queue: EventQueue::default(),
            next_id: 1,
            assets_root,
        }
    }

    /// Parent of every proxy container.
    pub fn assets_root(&self) -> Entity {
        self.assets_root
    }

    pub fn spawn_object(&mut self, name: impl Into<String>) -> Entity {
        self.objects.spawn((ObjectName(name.into()), Children::default())).id()
    }

    pub fn spawn_child(&mut self, parent: Entity, name: impl Into<String>) -> Entity {
        let child =
            self.objects.spawn((ObjectName(name.into()), Children::default(), Parent(parent))).id();
        if let Some(mut children) = self.objects.get_mut::<Children>(parent) {
            children.0.push(child);
        }
        child
    }

    pub fn object_exists(&self, object: Entity) -> bool {
        self.objects.get::<ObjectName>(object).is_some()
    }

    pub fn object_name(&self, object: Entity) -> Option<&str> {
        self.objects.get::<ObjectName>(object).map(|name| name.0.as_str())
    }

    pub fn children_of(&self, object: Entity) -> &[Entity] {
        self.objects.get::<Children>(object).map(|children| children.0.as_slice()).unwrap_or(&[])
    }

    /// Despawns `object` and its descendants, dropping the arrays they own. Returns how many
    /// objects were destroyed.
    pub fn destroy_object(&mut self, object: Entity) -> usize {
        if !self.object_exists(object) {
            return 0;
        }
        if let Some(parent) = self.objects.get::<Parent>(object).map(|parent| parent.0) {
            if let Some(mut children) = self.objects.get_mut::<Children>(parent) {
                children.0.retain(|child| *child != object);
            }
        }
        let mut stack = vec![object];
        let mut doomed = Vec::new();
        while let Some(entity) = stack.pop() {
            if let Some(children) = self.objects.get::<Children>(entity) {
                stack.extend(children.0.iter().copied());
            }
            doomed.push(entity);
        }
        for entity in &doomed {
            self.arrays.retain(|_, array| array.owner() != *entity);
            self.objects.despawn(*entity);
            self.queue.push(Notification {
                event: HostEvent::ObjectDestroyed { object: *entity },
                listener: Listener::Lifecycle,
            });
        }
        doomed.len()
    }

    pub fn disconnect_user(&mut self, user: UserId) {
        let event = HostEvent::UserLeft { user };
        self.queue.push(Notification { event, listener: Listener::Lifecycle });
    }

    // ---------- Arrays ----------
    pub fn create_array(
        &mut self,
        owner: Entity,
        name: impl Into<String>,
        element_type: ElementType,
        elements: Vec<Element>,
    ) -> ArrayId {
        let id = ArrayId(self.next_raw());
        self.arrays.insert(id, SyncArray::new(id, name.into(), owner, element_type, elements));
        id
    }

    pub fn create_typed_array<T, I>(
        &mut self,
        owner: Entity,
        name: impl Into<String>,
        values: I,
    ) -> ArrayId
    where
        T: ArrayElement,
        I: IntoIterator<Item = T>,
    {
        let elements = values.into_iter().map(ArrayElement::into_element).collect();
        self.create_array(owner, name, T::element_type(), elements)
    }

    pub fn array(&self, id: ArrayId) -> Option<&SyncArray> {
        self.arrays.get(&id)
    }

    pub fn array_mut(&mut self, id: ArrayId) -> Option<ArrayMut<'_>> {
        let array = self.arrays.get_mut(&id)?;
        Some(ArrayMut::new(array, &mut self.queue))
    }

    pub fn arrays_owned_by(&self, owner: Entity) -> Vec<ArrayId> {
        let mut ids: Vec<ArrayId> = self
            .arrays
            .values()
            .filter(|array| array.owner() == owner)
            .map(SyncArray::id)
            .collect();
        ids.sort();
        ids
    }

    // ---------- Mirror lists ----------
    pub fn create_list(&mut self, source: MirrorSource) -> ListId {
        let id = ListId(self.next_raw());
        self.lists.insert(id, MirrorList::new(id, source));
        id
    }

    pub fn list(&self, id: ListId) -> Option<&MirrorList> {
        self.lists.get(&id)
    }

    pub fn list_mut(&mut self, id: ListId) -> Option<ListMut<'_>> {
        let list = self.lists.get_mut(&id)?;
        Some(ListMut::new(list, &mut self.queue))
    }

    pub fn remove_list(&mut self, id: ListId) -> Option<MirrorList> {
        self.lists.remove(&id)
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    // ---------- Notifications ----------
    pub fn pending_notifications(&self) -> usize {
        self.queue.len()
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.queue.pop()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.queue.drain()
    }

    fn next_raw(&mut self) -> u64 {
        let raw = self.next_id;
        self.next_id += 1;
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn destroying_a_parent_takes_children_and_their_arrays() {
        let mut world = EditorWorld::new();
        let root = world.spawn_object("Root");
        let child = world.spawn_child(root, "Mesh");
        let array = world.create_typed_array(child, "Weights", [1.0_f32, 2.0]);
        world.take_notifications();

        assert_eq!(world.destroy_object(root), 2);
        assert!(world.array(array).is_none());
        assert!(!world.object_exists(child));
        let destroyed: Vec<_> = world
            .take_notifications()
            .into_iter()
            .filter_map(|n| match n.event {
                HostEvent::ObjectDestroyed { object } => Some(object),
                _ => None,
            })
            .collect();
        assert_eq!(destroyed.len(), 2);
        assert!(destroyed.contains(&root) && destroyed.contains(&child));
    }

    #[test]
    fn destroying_a_child_detaches_it_from_its_parent() {
        let mut world = EditorWorld::new();
        let root = world.spawn_object("Root");
        let child = world.spawn_child(root, "Child");
        world.destroy_object(child);
        assert!(world.children_of(root).is_empty());
        assert_eq!(world.destroy_object(child), 0, "second destroy is a no-op");
    }

    #[test]
    fn typed_arrays_carry_their_element_type() {
        let mut world = EditorWorld::new();
        let owner = world.spawn_object("Owner");
        let id = world.create_typed_array(owner, "Ints", [1_i32, 2, 3]);
        let array = world.array(id).expect("array");
        assert_eq!(array.count(), 3);
        assert_eq!(array.element_type().value_type, Some(ValueType::Int));
        assert_eq!(world.arrays_owned_by(owner), vec![id]);
    }
}
