//! Two-way propagation between a host array and its mirror list.
//!
//! Array changes are mirrored by rewriting the whole list under `ArrayToList` suppression.
//! List changes are patched into the array one operation at a time, with the array's resync
//! listener detached for the duration of the write. Each list notification carries the data
//! and indices it was raised with, so replaying them in order rebuilds the list's edits.

use crate::codec::RecordData;
use crate::element::Element;
use crate::error::ProxyError;
use crate::events::Listener;
use crate::gate::{Direction, SuppressionGate};
use crate::host::{ArrayId, ArrayMut, EditorWorld, ListId};
use crate::registry::{proxy_name, ProxyBinding, ProxyRegistry};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Full array -> list rewrites.
    pub resyncs: u64,
    /// List -> array mutations applied.
    pub array_writes: u64,
    /// List notifications dropped because a resync was propagating.
    pub suppressed_list_events: u64,
    /// Removals skipped because the array was already shorter.
    pub stale_removals: u64,
    /// Notifications whose proxy container was already gone.
    pub lookup_failures: u64,
    /// Lists rewritten from their array after list edits failed to carry over.
    pub reconciles: u64,
}

#[derive(Default)]
pub struct SyncEngine {
    gate: SuppressionGate,
    stats: SyncStats,
}

impl SyncEngine {
    pub fn gate(&self) -> &SuppressionGate {
        &self.gate
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn begin_tick(&mut self, tick: u64) {
        self.gate.begin_tick(tick);
    }

    pub fn on_array_changed(
        &mut self,
        world: &mut EditorWorld,
        registry: &ProxyRegistry,
        array: ArrayId,
    ) -> Result<(), ProxyError> {
        debug!("Array changed: {array}");
        let mut target = world.array_mut(array).ok_or(ProxyError::UnknownArray(array))?;
        if target.is_driven() {
            target.unsubscribe(Listener::ArrayResync);
            debug!("{array} is driven, resync listener detached");
            return Ok(());
        }
        if self.gate.is_suppressed(Direction::ListToArray) {
            return Ok(());
        }
        let source = world.array(array).ok_or(ProxyError::UnknownArray(array))?;
        let binding = registry
            .binding_for_array(world, array)
            .ok_or_else(|| self.lookup_failed(proxy_name(source.name(), array)))?;
        self.rewrite_list(world, &binding)?;
        self.stats.resyncs += 1;
        Ok(())
    }

    /// Inserts the records a list gained at `start`. `records` is the data they were added
    /// with; later edits to them arrive as their own notifications.
    pub fn on_elements_added(
        &mut self,
        world: &mut EditorWorld,
        registry: &ProxyRegistry,
        list: ListId,
        start: usize,
        records: &[RecordData],
    ) -> Result<(), ProxyError> {
        if self.gate.is_suppressed(Direction::ArrayToList) {
            self.stats.suppressed_list_events += 1;
            return Ok(());
        }
        let binding = registry
            .binding_for_list(world, list)
            .ok_or_else(|| self.lookup_failed(list.to_string()))?;
        let target = world.array(binding.array).ok_or(ProxyError::UnknownArray(binding.array))?;
        if start > target.count() {
            return Err(ProxyError::IndexOutOfRange { index: start, len: target.count() });
        }
        let mut mapped: Vec<Element> = Vec::with_capacity(records.len());
        for data in records {
            let preceding = match mapped.last() {
                Some(element) => Some(element.clone()),
                None => start.checked_sub(1).and_then(|index| target.get(index)).cloned(),
            };
            mapped.push(binding.codec.inserted_element(data, preceding.as_ref())?);
        }
        self.write_detached(world, binding.array, |array| array.insert(start, mapped))
    }

    pub fn on_elements_removed(
        &mut self,
        world: &mut EditorWorld,
        registry: &ProxyRegistry,
        list: ListId,
        start: usize,
        count: usize,
    ) -> Result<(), ProxyError> {
        if self.gate.is_suppressed(Direction::ArrayToList) {
            self.stats.suppressed_list_events += 1;
            return Ok(());
        }
        let binding = registry
            .binding_for_list(world, list)
            .ok_or_else(|| self.lookup_failed(list.to_string()))?;
        let len =
            world.array(binding.array).ok_or(ProxyError::UnknownArray(binding.array))?.count();
        let end = start.saturating_add(count);
        if len < end {
            self.stats.stale_removals += 1;
            return Err(ProxyError::StaleRemovalRange { start, end, len });
        }
        self.write_detached(world, binding.array, |array| array.remove(start, count))
    }

    /// Writes back one record value. `index` is where the record sat when it changed, which
    /// is where the array holds its element once every earlier notification has run.
    pub fn on_record_changed(
        &mut self,
        world: &mut EditorWorld,
        registry: &ProxyRegistry,
        list: ListId,
        index: usize,
        data: &RecordData,
    ) -> Result<(), ProxyError> {
        if self.gate.is_suppressed(Direction::ArrayToList) {
            self.stats.suppressed_list_events += 1;
            return Ok(());
        }
        let binding = registry
            .binding_for_list(world, list)
            .ok_or_else(|| self.lookup_failed(list.to_string()))?;
        let target = world.array(binding.array).ok_or(ProxyError::UnknownArray(binding.array))?;
        if index >= target.count() {
            return Err(ProxyError::IndexOutOfRange { index, len: target.count() });
        }
        let element = binding.codec.to_array_element(data, index, target.get(index))?;
        self.write_detached(world, binding.array, |array| array.set(index, element))
    }

    /// Rewrites `list` from its array if the two disagree after list edits were dispatched.
    /// Returns whether a rewrite happened. Driven arrays and torn-down proxies are left alone.
    pub fn reconcile(
        &mut self,
        world: &mut EditorWorld,
        registry: &ProxyRegistry,
        list: ListId,
    ) -> Result<bool, ProxyError> {
        let Some(binding) = registry.binding_for_list(world, list) else {
            return Ok(false);
        };
        let source = world.array(binding.array).ok_or(ProxyError::UnknownArray(binding.array))?;
        if source.is_driven() || self.verify_mirror(world, registry, binding.array)? {
            return Ok(false);
        }
        warn!("{list} diverged from {}, rewriting it from the array", binding.array);
        self.rewrite_list(world, &binding)?;
        self.stats.reconciles += 1;
        Ok(true)
    }

    /// Whether the mirror list of `array` matches it record for record. Tangents of curve
    /// keyframes are not part of the comparison.
    pub fn verify_mirror(
        &self,
        world: &EditorWorld,
        registry: &ProxyRegistry,
        array: ArrayId,
    ) -> Result<bool, ProxyError> {
        let source = world.array(array).ok_or(ProxyError::UnknownArray(array))?;
        let name = proxy_name(source.name(), array);
        let binding = registry
            .binding_for_array(world, array)
            .ok_or(ProxyError::ProxyLookupFailure { name })?;
        let mirror = world.list(binding.list).ok_or(ProxyError::UnknownList(binding.list))?;
        if mirror.len() != source.count() {
            return Ok(false);
        }
        for (element, record) in source.elements().iter().zip(mirror.records()) {
            if binding.codec.seed(element)? != *record.data() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn lookup_failed(&mut self, name: String) -> ProxyError {
        self.stats.lookup_failures += 1;
        ProxyError::ProxyLookupFailure { name }
    }

    /// Full array -> list rewrite under `ArrayToList` suppression.
    fn rewrite_list(
        &mut self,
        world: &mut EditorWorld,
        binding: &ProxyBinding,
    ) -> Result<(), ProxyError> {
        let codec = binding.codec;
        let source = world.array(binding.array).ok_or(ProxyError::UnknownArray(binding.array))?;
        let records: Vec<RecordData> =
            source.elements().iter().map(|element| codec.seed(element)).collect::<Result<_, _>>()?;

        let mut list = world.list_mut(binding.list).ok_or(ProxyError::UnknownList(binding.list))?;
        self.gate.with_suppressed(Direction::ArrayToList, || {
            list.coerce_length(records.len(), || codec.blank_record());
            for (index, data) in records.into_iter().enumerate() {
                list.set_data(index, data)?;
            }
            Ok::<(), ProxyError>(())
        })
    }

    /// Runs one list-originated array mutation with the array's resync listener detached.
    fn write_detached(
        &mut self,
        world: &mut EditorWorld,
        array: ArrayId,
        write: impl FnOnce(&mut ArrayMut<'_>) -> Result<(), ProxyError>,
    ) -> Result<(), ProxyError> {
        let mut target = world.array_mut(array).ok_or(ProxyError::UnknownArray(array))?;
        let attached = target.unsubscribe(Listener::ArrayResync);
        let result = self.gate.with_suppressed(Direction::ListToArray, || write(&mut target));
        if attached {
            target.subscribe(Listener::ArrayResync);
        }
        if result.is_ok() {
            self.stats.array_writes += 1;
        }
        result
    }
}
