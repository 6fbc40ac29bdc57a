use super::{ListId, RecordId};
use crate::codec::{MirrorSource, RecordData};
use crate::error::ProxyError;
use crate::events::{EventQueue, HostEvent, Listener, Signal};
use std::ops::Deref;

#[derive(Debug)]
pub struct Record {
    id: RecordId,
    data: RecordData,
    changed: Signal,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    pub fn changed(&self) -> &Signal {
        &self.changed
    }
}

/// Resizable list of editable records owned by a proxy container.
#[derive(Debug)]
pub struct MirrorList {
    id: ListId,
    source: MirrorSource,
    records: Vec<Record>,
    structure: Signal,
    /// Value listeners every record gets, including records created later.
    record_listeners: Signal,
    next_record: u64,
}

impl MirrorList {
    pub(super) fn new(id: ListId, source: MirrorSource) -> Self {
        Self {
            id,
            source,
            records: Vec::new(),
            structure: Signal::default(),
            record_listeners: Signal::default(),
            next_record: 1,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn source(&self) -> MirrorSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn data(&self, index: usize) -> Option<&RecordData> {
        self.records.get(index).map(Record::data)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn index_of(&self, record: RecordId) -> Option<usize> {
        self.records.iter().position(|entry| entry.id == record)
    }

    /// Listeners of `elements added` / `elements removed`.
    pub fn structure(&self) -> &Signal {
        &self.structure
    }
}

pub struct ListMut<'a> {
    list: &'a mut MirrorList,
    queue: &'a mut EventQueue,
}

impl<'a> ListMut<'a> {
    pub(super) fn new(list: &'a mut MirrorList, queue: &'a mut EventQueue) -> Self {
        Self { list, queue }
    }

    pub fn add(&mut self, data: RecordData) -> RecordId {
        let start = self.list.records.len();
        let id = self.push_record(data);
        self.notify_added(start, 1);
        id
    }

    pub fn insert(&mut self, at: usize, data: RecordData) -> Result<RecordId, ProxyError> {
        let len = self.list.records.len();
        if at > len {
            return Err(ProxyError::IndexOutOfRange { index: at, len });
        }
        let record = self.new_record(data);
        let id = record.id;
        self.list.records.insert(at, record);
        self.notify_added(at, 1);
        Ok(id)
    }

    pub fn remove_range(&mut self, at: usize, count: usize) -> Result<(), ProxyError> {
        let len = self.list.records.len();
        let end = at.saturating_add(count);
        if end > len {
            return Err(ProxyError::IndexOutOfRange { index: end, len });
        }
        if count == 0 {
            return Ok(());
        }
        self.list.records.drain(at..end);
        self.notify_removed(at, count);
        Ok(())
    }

    /// Grows with `blank` records or trims the tail until the list holds exactly `target`.
    pub fn coerce_length(&mut self, target: usize, mut blank: impl FnMut() -> RecordData) {
        let len = self.list.records.len();
        if target > len {
            for _ in len..target {
                let data = blank();
                self.push_record(data);
            }
            self.notify_added(len, target - len);
        } else if target < len {
            self.list.records.truncate(target);
            self.notify_removed(target, len - target);
        }
    }

    /// Replaces the data at `index`. Returns whether anything changed; only changes notify.
    pub fn set_data(&mut self, index: usize, data: RecordData) -> Result<bool, ProxyError> {
        let len = self.list.records.len();
        let record =
            self.list.records.get_mut(index).ok_or(ProxyError::IndexOutOfRange { index, len })?;
        if record.data == data {
            return Ok(false);
        }
        record.data = data;
        if !record.changed.is_empty() {
            let event = HostEvent::RecordChanged {
                list: self.list.id,
                record: record.id,
                index,
                data: record.data.clone(),
            };
            record.changed.notify(event, self.queue);
        }
        Ok(true)
    }

    pub fn set_record(&mut self, record: RecordId, data: RecordData) -> Result<bool, ProxyError> {
        let index = self
            .list
            .index_of(record)
            .ok_or(ProxyError::UnknownRecord { list: self.list.id, record: record.raw() })?;
        self.set_data(index, data)
    }

    pub fn subscribe_structure(&mut self, listener: Listener) -> bool {
        self.list.structure.subscribe_unique(listener)
    }

    /// Subscribes `listener` to the value changes of every record, present and future, so a
    /// record is listened to from the moment it exists. Returns how many present records
    /// gained the subscription.
    pub fn subscribe_records(&mut self, listener: Listener) -> usize {
        self.list.record_listeners.subscribe_unique(listener);
        let mut added = 0;
        for record in &mut self.list.records {
            if record.changed.subscribe_unique(listener) {
                added += 1;
            }
        }
        added
    }

    pub fn remove_record(&mut self, record: RecordId) -> Result<(), ProxyError> {
        let index = self
            .list
            .index_of(record)
            .ok_or(ProxyError::UnknownRecord { list: self.list.id, record: record.raw() })?;
        self.remove_range(index, 1)
    }

    fn new_record(&mut self, data: RecordData) -> Record {
        let id = RecordId(self.list.next_record);
        self.list.next_record += 1;
        Record { id, data, changed: self.list.record_listeners.clone() }
    }

    fn push_record(&mut self, data: RecordData) -> RecordId {
        let record = self.new_record(data);
        let id = record.id;
        self.list.records.push(record);
        id
    }

    fn notify_added(&mut self, start: usize, count: usize) {
        if self.list.structure.is_empty() {
            return;
        }
        let added = &self.list.records[start..start + count];
        let records = added.iter().map(|record| record.data.clone()).collect();
        let event = HostEvent::ElementsAdded { list: self.list.id, start, records };
        self.list.structure.notify(event, self.queue);
    }

    fn notify_removed(&mut self, start: usize, count: usize) {
        let event = HostEvent::ElementsRemoved { list: self.list.id, start, count };
        self.list.structure.notify(event, self.queue);
    }
}

impl Deref for ListMut<'_> {
    type Target = MirrorList;

    fn deref(&self) -> &Self::Target {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{MirrorSource, RecordData};
    use crate::events::{HostEvent, Listener};
    use crate::host::EditorWorld;
    use crate::value::{Value, ValueType};

    fn field(value: f32) -> RecordData {
        RecordData::Field(Value::Float(value))
    }

    #[test]
    fn coerce_grows_and_trims_with_single_events() {
        let mut world = EditorWorld::new();
        let id = world.create_list(MirrorSource::ValueMultiplexer(ValueType::Float));
        let mut list = world.list_mut(id).expect("list");
        list.subscribe_structure(Listener::ListBinding);
        list.coerce_length(3, || field(0.0));
        list.coerce_length(1, || field(0.0));
        list.coerce_length(1, || field(0.0));
        assert_eq!(list.len(), 1);
        drop(list);
        let events: Vec<_> = world.take_notifications().into_iter().map(|n| n.event).collect();
        assert_eq!(
            events,
            vec![
                HostEvent::ElementsAdded { list: id, start: 0, records: vec![field(0.0); 3] },
                HostEvent::ElementsRemoved { list: id, start: 1, count: 2 },
            ]
        );
    }

    #[test]
    fn value_change_fires_only_for_real_changes() {
        let mut world = EditorWorld::new();
        let id = world.create_list(MirrorSource::ValueMultiplexer(ValueType::Float));
        let mut list = world.list_mut(id).expect("list");
        let record = list.add(field(1.0));
        assert_eq!(list.subscribe_records(Listener::RecordBinding), 1);
        assert_eq!(list.subscribe_records(Listener::RecordBinding), 0, "already subscribed");
        assert!(!list.set_record(record, field(1.0)).expect("same value"));
        assert!(list.set_record(record, field(2.0)).expect("new value"));
        drop(list);
        let events: Vec<_> = world.take_notifications().into_iter().map(|n| n.event).collect();
        let expected = HostEvent::RecordChanged { list: id, record, index: 0, data: field(2.0) };
        assert_eq!(events, vec![expected]);
    }

    #[test]
    fn later_records_are_listened_to_from_creation() {
        let mut world = EditorWorld::new();
        let id = world.create_list(MirrorSource::ValueMultiplexer(ValueType::Float));
        let mut list = world.list_mut(id).expect("list");
        list.subscribe_structure(Listener::ListBinding);
        list.subscribe_records(Listener::RecordBinding);
        list.add(field(1.0));
        let second = list.insert(0, field(2.0)).expect("insert");
        list.set_data(0, field(3.0)).expect("set new record");
        list.remove_range(1, 1).expect("remove");
        let listeners =
            list.record(0).map(|record| record.changed().count(Listener::RecordBinding));
        assert_eq!(listeners, Some(1));
        drop(list);

        // Payloads describe the list as it was when each event was raised.
        let events: Vec<_> = world.take_notifications().into_iter().map(|n| n.event).collect();
        assert_eq!(
            events,
            vec![
                HostEvent::ElementsAdded { list: id, start: 0, records: vec![field(1.0)] },
                HostEvent::ElementsAdded { list: id, start: 0, records: vec![field(2.0)] },
                HostEvent::RecordChanged { list: id, record: second, index: 0, data: field(3.0) },
                HostEvent::ElementsRemoved { list: id, start: 1, count: 1 },
            ]
        );
    }

    #[test]
    fn records_keep_identity_across_inserts() {
        let mut world = EditorWorld::new();
        let id = world.create_list(MirrorSource::ValueMultiplexer(ValueType::Float));
        let mut list = world.list_mut(id).expect("list");
        let first = list.add(field(1.0));
        let second = list.insert(0, field(0.0)).expect("insert");
        assert_eq!(list.index_of(first), Some(1));
        assert_eq!(list.index_of(second), Some(0));
        list.remove_record(second).expect("remove");
        assert_eq!(list.index_of(second), None);
        assert_eq!(list.index_of(first), Some(0));
        assert!(list.remove_record(second).is_err(), "already gone");
        assert!(list.remove_range(1, 1).is_err());
    }
}
