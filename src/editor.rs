#[cfg(feature = "editor")]
mod egui_adapter;

#[cfg(feature = "editor")]
pub use egui_adapter::EguiAdapter;

use crate::codec::RecordData;
use crate::host::{ArrayId, ListId, MirrorList, RecordId, SyncArray};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetHandle(u64);

impl WidgetHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// Row layout hints for list controls.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ListStyle {
    #[serde(default = "ListStyle::default_min_row_height")]
    pub min_row_height: f32,
    #[serde(default = "ListStyle::default_min_row_width")]
    pub min_row_width: f32,
}

impl ListStyle {
    const fn default_min_row_height() -> f32 {
        24.0
    }

    const fn default_min_row_width() -> f32 {
        48.0
    }
}

impl Default for ListStyle {
    fn default() -> Self {
        Self {
            min_row_height: Self::default_min_row_height(),
            min_row_width: Self::default_min_row_width(),
        }
    }
}

/// Widget factory the editing host draws through.
pub trait EditorAdapter {
    /// The host's stock, unproxied array editor.
    fn build_array_control(&mut self, array: &SyncArray, label: &str) -> WidgetHandle;
    fn build_list_control(
        &mut self,
        list: &MirrorList,
        label: &str,
        style: &ListStyle,
    ) -> WidgetHandle;
    fn build_label(&mut self, text: &str) -> WidgetHandle;
    /// Unknown or already destroyed handles are ignored.
    fn destroy(&mut self, widget: WidgetHandle);
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetKind {
    ArrayControl { array: ArrayId, label: String },
    ListControl { list: ListId, label: String, style: ListStyle },
    Label { text: String },
}

/// Edits a user made in a list control, applied by the host after drawing. Records are
/// addressed by id, so edits queued in one frame stay valid while earlier ones shift rows.
#[derive(Clone, Debug, PartialEq)]
pub enum ListEdit {
    /// Appends a blank record.
    Add { list: ListId },
    Remove { list: ListId, record: RecordId },
    Set { list: ListId, record: RecordId, data: RecordData },
}

impl ListEdit {
    pub fn list(&self) -> ListId {
        match self {
            ListEdit::Add { list }
            | ListEdit::Remove { list, .. }
            | ListEdit::Set { list, .. } => *list,
        }
    }
}

/// Headless adapter that keeps a table of live widgets.
#[derive(Default)]
pub struct RecordingAdapter {
    widgets: BTreeMap<WidgetHandle, WidgetKind>,
    destroyed: Vec<WidgetHandle>,
    next: u64,
}

impl RecordingAdapter {
    pub fn widget(&self, handle: WidgetHandle) -> Option<&WidgetKind> {
        self.widgets.get(&handle)
    }

    pub fn is_live(&self, handle: WidgetHandle) -> bool {
        self.widgets.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.widgets.len()
    }

    /// Live widgets in creation order.
    pub fn widgets(&self) -> impl Iterator<Item = (WidgetHandle, &WidgetKind)> {
        self.widgets.iter().map(|(handle, kind)| (*handle, kind))
    }

    /// Handles in the order they were destroyed.
    pub fn destroyed(&self) -> &[WidgetHandle] {
        &self.destroyed
    }

    pub fn labels(&self) -> Vec<&str> {
        self.widgets
            .values()
            .filter_map(|kind| match kind {
                WidgetKind::Label { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn list_controls(&self) -> Vec<(WidgetHandle, ListId)> {
        self.widgets
            .iter()
            .filter_map(|(handle, kind)| match kind {
                WidgetKind::ListControl { list, .. } => Some((*handle, *list)),
                _ => None,
            })
            .collect()
    }

    fn insert(&mut self, kind: WidgetKind) -> WidgetHandle {
        self.next += 1;
        let handle = WidgetHandle(self.next);
        self.widgets.insert(handle, kind);
        handle
    }
}

impl EditorAdapter for RecordingAdapter {
    fn build_array_control(&mut self, array: &SyncArray, label: &str) -> WidgetHandle {
        self.insert(WidgetKind::ArrayControl { array: array.id(), label: label.to_string() })
    }

    fn build_list_control(
        &mut self,
        list: &MirrorList,
        label: &str,
        style: &ListStyle,
    ) -> WidgetHandle {
        let label = label.to_string();
        self.insert(WidgetKind::ListControl { list: list.id(), label, style: *style })
    }

    fn build_label(&mut self, text: &str) -> WidgetHandle {
        self.insert(WidgetKind::Label { text: text.to_string() })
    }

    fn destroy(&mut self, widget: WidgetHandle) {
        if self.widgets.remove(&widget).is_some() {
            self.destroyed.push(widget);
        }
    }
}
