use super::ArrayId;
use crate::element::{Element, ElementType};
use crate::error::ProxyError;
use crate::events::{EventQueue, HostEvent, Listener, Signal};
use bevy_ecs::prelude::Entity;
use std::ops::Deref;

/// Authoritative, randomly indexed element store. Any mutation raises one `ArrayChanged`
/// per subscriber.
#[derive(Debug)]
pub struct SyncArray {
    id: ArrayId,
    name: String,
    owner: Entity,
    element_type: ElementType,
    elements: Vec<Element>,
    driven: bool,
    changed: Signal,
}

impl SyncArray {
    pub(super) fn new(
        id: ArrayId,
        name: String,
        owner: Entity,
        element_type: ElementType,
        elements: Vec<Element>,
    ) -> Self {
        Self { id, name, owner, element_type, elements, driven: false, changed: Signal::default() }
    }

    pub fn id(&self) -> ArrayId {
        self.id
    }

    /// Field name the array is exposed under on its owner.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_driven(&self) -> bool {
        self.driven
    }

    pub fn changed(&self) -> &Signal {
        &self.changed
    }
}

pub struct ArrayMut<'a> {
    array: &'a mut SyncArray,
    queue: &'a mut EventQueue,
}

impl<'a> ArrayMut<'a> {
    pub(super) fn new(array: &'a mut SyncArray, queue: &'a mut EventQueue) -> Self {
        Self { array, queue }
    }

    pub fn set(&mut self, index: usize, element: Element) -> Result<(), ProxyError> {
        let len = self.array.elements.len();
        let slot =
            self.array.elements.get_mut(index).ok_or(ProxyError::IndexOutOfRange { index, len })?;
        *slot = element;
        self.notify();
        Ok(())
    }

    pub fn insert(&mut self, at: usize, elements: Vec<Element>) -> Result<(), ProxyError> {
        let len = self.array.elements.len();
        if at > len {
            return Err(ProxyError::IndexOutOfRange { index: at, len });
        }
        if elements.is_empty() {
            return Ok(());
        }
        self.array.elements.splice(at..at, elements);
        self.notify();
        Ok(())
    }

    pub fn push(&mut self, element: Element) {
        self.array.elements.push(element);
        self.notify();
    }

    pub fn remove(&mut self, at: usize, count: usize) -> Result<(), ProxyError> {
        let len = self.array.elements.len();
        let end = at.saturating_add(count);
        if end > len {
            return Err(ProxyError::StaleRemovalRange { start: at, end, len });
        }
        if count == 0 {
            return Ok(());
        }
        self.array.elements.drain(at..end);
        self.notify();
        Ok(())
    }

    pub fn clear(&mut self) {
        if self.array.elements.is_empty() {
            return;
        }
        self.array.elements.clear();
        self.notify();
    }

    /// Hands the array to (or takes it back from) an external driver.
    pub fn set_driven(&mut self, driven: bool) {
        if self.array.driven == driven {
            return;
        }
        self.array.driven = driven;
        self.notify();
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.array.changed.subscribe(listener);
    }

    pub fn subscribe_unique(&mut self, listener: Listener) -> bool {
        self.array.changed.subscribe_unique(listener)
    }

    pub fn unsubscribe(&mut self, listener: Listener) -> bool {
        self.array.changed.unsubscribe(listener)
    }

    fn notify(&mut self) {
        self.array.changed.notify(HostEvent::ArrayChanged { array: self.array.id }, self.queue);
    }
}

impl Deref for ArrayMut<'_> {
    type Target = SyncArray;

    fn deref(&self) -> &Self::Target {
        self.array
    }
}
