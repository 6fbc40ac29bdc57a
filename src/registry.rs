use crate::codec::{ElementCodec, MirrorSource, RecordData, TangentPolicy};
use crate::element::resolve_kind;
use crate::error::ProxyError;
use crate::events::Listener;
use crate::host::{ArrayId, EditorWorld, ListId, NonPersistent, UserId};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ---------- Components ----------
/// Marks a proxy container and the array it mirrors.
#[derive(Component, Clone, Copy, Debug)]
pub struct ProxyContainer {
    pub array: ArrayId,
    pub codec: ElementCodec,
}

/// The single mirror-producing component of a container.
#[derive(Component, Clone, Copy, Debug)]
pub struct MirrorComponent {
    pub source: MirrorSource,
    pub list: ListId,
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestroyWithOwner(pub Entity);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestroyOnUserLeave(pub UserId);

/// Everything a sync handler needs to move data between an array and its mirror list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyBinding {
    pub container: Entity,
    pub array: ArrayId,
    pub list: ListId,
    pub codec: ElementCodec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedProxy {
    pub binding: ProxyBinding,
    /// True only for the call that created the container; the caller then attaches the
    /// array-side listener.
    pub newly_created: bool,
}

struct ContainerEntry {
    name: String,
    list: ListId,
}

pub fn proxy_name(field: &str, array: ArrayId) -> String {
    format!("{field}-{}-Proxy", array.raw())
}

/// Lazily creates and tracks one proxy container per (array, field name).
#[derive(Default)]
pub struct ProxyRegistry {
    by_name: HashMap<String, Entity>,
    by_list: HashMap<ListId, Entity>,
    entries: HashMap<Entity, ContainerEntry>,
    created: u64,
    destroyed: u64,
}

impl ProxyRegistry {
    pub fn resolve(
        &mut self,
        world: &mut EditorWorld,
        array: ArrayId,
        viewer: UserId,
        tangent_policy: TangentPolicy,
    ) -> Result<ResolvedProxy, ProxyError> {
        let name = {
            let source = world.array(array).ok_or(ProxyError::UnknownArray(array))?;
            proxy_name(source.name(), array)
        };
        if let Some(binding) = self.find(world, &name) {
            if let Some(mut hook) = world.objects.get_mut::<DestroyOnUserLeave>(binding.container) {
                hook.0 = viewer;
            }
            return Ok(ResolvedProxy { binding, newly_created: false });
        }
        let source = world.array(array).ok_or(ProxyError::UnknownArray(array))?;
        let owner = source.owner();
        let element_type = source.element_type().clone();
        let elements = source.elements().to_vec();

        let root = world.assets_root();
        let container = world.spawn_child(root, name.clone());
        world.objects.entity_mut(container).insert((
            NonPersistent,
            DestroyWithOwner(owner),
            DestroyOnUserLeave(viewer),
        ));
        self.created += 1;

        let kind = match resolve_kind(&element_type) {
            Ok(kind) => kind,
            Err(err) => {
                warn!("No proxy for '{name}': {err}");
                self.discard(world, container);
                return Err(err);
            }
        };
        let codec = ElementCodec::new(kind, tangent_policy);
        let seeded: Result<Vec<RecordData>, ProxyError> =
            elements.iter().map(|element| codec.seed(element)).collect();
        let seeded = match seeded {
            Ok(records) => records,
            Err(err) => {
                warn!("Could not seed '{name}': {err}");
                self.discard(world, container);
                return Err(err);
            }
        };

        let list = world.create_list(codec.source());
        {
            let mut mirror = world.list_mut(list).ok_or(ProxyError::UnknownList(list))?;
            // Seed before anything listens, so seeding never writes back.
            for data in seeded {
                mirror.add(data);
            }
            mirror.subscribe_structure(Listener::ListBinding);
            mirror.subscribe_records(Listener::RecordBinding);
        }
        let mirror = MirrorComponent { source: codec.source(), list };
        world.objects.entity_mut(container).insert((ProxyContainer { array, codec }, mirror));

        self.by_name.insert(name.clone(), container);
        self.by_list.insert(list, container);
        self.entries.insert(container, ContainerEntry { name: name.clone(), list });
        info!("Created proxy '{name}' ({kind}, {} via {})", list, codec.source().list_field());
        let binding = ProxyBinding { container, array, list, codec };
        Ok(ResolvedProxy { binding, newly_created: true })
    }

    pub fn find(&self, world: &EditorWorld, name: &str) -> Option<ProxyBinding> {
        let container = *self.by_name.get(name)?;
        Self::binding_of(world, container)
    }

    pub fn binding_for_array(&self, world: &EditorWorld, array: ArrayId) -> Option<ProxyBinding> {
        let source = world.array(array)?;
        self.find(world, &proxy_name(source.name(), array))
    }

    pub fn binding_for_list(&self, world: &EditorWorld, list: ListId) -> Option<ProxyBinding> {
        let container = *self.by_list.get(&list)?;
        Self::binding_of(world, container)
    }

    pub fn contains(&self, container: Entity) -> bool {
        self.entries.contains_key(&container)
    }

    /// Live containers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn created_count(&self) -> u64 {
        self.created
    }

    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }

    /// Destroys a container and its mirror list. Unknown or already destroyed containers are
    /// left alone.
    pub fn destroy_container(&mut self, world: &mut EditorWorld, container: Entity) -> bool {
        if !self.forget(world, container) {
            return false;
        }
        world.destroy_object(container);
        true
    }

    pub fn destroy_for_array(&mut self, world: &mut EditorWorld, array: ArrayId) -> bool {
        match self.binding_for_array(world, array) {
            Some(binding) => self.destroy_container(world, binding.container),
            None => false,
        }
    }

    /// Teardown for a destroyed scene object: the container itself, or containers whose
    /// owner it was.
    pub fn on_object_destroyed(&mut self, world: &mut EditorWorld, object: Entity) -> usize {
        let mut count = usize::from(self.forget(world, object));
        let mut query = world.objects.query::<(Entity, &DestroyWithOwner)>();
        let doomed: Vec<Entity> = query
            .iter(&world.objects)
            .filter(|(_, owner)| owner.0 == object)
            .map(|(entity, _)| entity)
            .collect();
        for container in doomed {
            if self.destroy_container(world, container) {
                count += 1;
            }
        }
        count
    }

    pub fn on_user_left(&mut self, world: &mut EditorWorld, user: UserId) -> usize {
        let mut query = world.objects.query::<(Entity, &DestroyOnUserLeave)>();
        let doomed: Vec<Entity> = query
            .iter(&world.objects)
            .filter(|(_, hook)| hook.0 == user)
            .map(|(entity, _)| entity)
            .collect();
        doomed.into_iter().filter(|container| self.destroy_container(world, *container)).count()
    }

    fn binding_of(world: &EditorWorld, container: Entity) -> Option<ProxyBinding> {
        let proxy = world.objects.get::<ProxyContainer>(container)?;
        let mirror = world.objects.get::<MirrorComponent>(container)?;
        Some(ProxyBinding { container, array: proxy.array, list: mirror.list, codec: proxy.codec })
    }

    fn forget(&mut self, world: &mut EditorWorld, container: Entity) -> bool {
        let Some(entry) = self.entries.remove(&container) else {
            return false;
        };
        self.by_name.remove(&entry.name);
        self.by_list.remove(&entry.list);
        world.remove_list(entry.list);
        self.destroyed += 1;
        info!("Destroyed proxy '{}'", entry.name);
        true
    }

    fn discard(&mut self, world: &mut EditorWorld, container: Entity) {
        world.destroy_object(container);
        self.destroyed += 1;
        debug!("Discarded proxy container {}", container.index());
    }
}
