use super::{EditorAdapter, ListEdit, ListStyle, RecordingAdapter, WidgetHandle, WidgetKind};
use crate::codec::RecordData;
use crate::host::{EditorWorld, ListId, MirrorList, SyncArray};
use crate::value::Value;
use egui::{self, Ui};
use glam::{Quat, Vec2, Vec3, Vec4};

/// Draws the retained widget table with egui. User edits to list controls are queued as
/// [`ListEdit`]s and drained by the host after the frame.
#[derive(Default)]
pub struct EguiAdapter {
    widgets: RecordingAdapter,
    pending_edits: Vec<ListEdit>,
}

impl EguiAdapter {
    pub fn widgets(&self) -> &RecordingAdapter {
        &self.widgets
    }

    pub fn drain_edits(&mut self) -> Vec<ListEdit> {
        std::mem::take(&mut self.pending_edits)
    }

    pub fn show(&mut self, ui: &mut Ui, world: &EditorWorld) {
        let handles: Vec<(WidgetHandle, WidgetKind)> =
            self.widgets.widgets().map(|(handle, kind)| (handle, kind.clone())).collect();
        for (handle, kind) in handles {
            ui.push_id(handle.raw(), |ui| match kind {
                WidgetKind::Label { text } => {
                    ui.label(text);
                }
                WidgetKind::ArrayControl { array, label } => match world.array(array) {
                    Some(array) => Self::render_array(ui, array, &label),
                    None => {
                        ui.weak(format!("{label}: array removed"));
                    }
                },
                WidgetKind::ListControl { list, label, style } => {
                    if let Some(list) = world.list(list) {
                        self.render_list(ui, list, &label, &style);
                    }
                }
            });
        }
    }

    fn render_array(ui: &mut Ui, array: &SyncArray, label: &str) {
        egui::CollapsingHeader::new(format!("{label} [{}]", array.count())).show(ui, |ui| {
            for (index, element) in array.elements().iter().enumerate() {
                ui.label(format!("{index}: {element:?}"));
            }
        });
    }

    fn render_list(&mut self, ui: &mut Ui, list: &MirrorList, label: &str, style: &ListStyle) {
        ui.strong(label);
        let id = list.id();
        let size = egui::vec2(style.min_row_width, style.min_row_height);
        for record in list.records() {
            let mut data = record.data().clone();
            let mut remove = false;
            ui.push_id(record.id().raw(), |ui| {
                ui.horizontal(|ui| {
                    ui.set_min_height(style.min_row_height);
                    if edit_record(ui, &mut data, size) {
                        self.pending_edits.push(ListEdit::Set {
                            list: id,
                            record: record.id(),
                            data: data.clone(),
                        });
                    }
                    remove = ui.small_button("-").clicked();
                });
            });
            if remove {
                self.pending_edits.push(ListEdit::Remove { list: id, record: record.id() });
            }
        }
        if ui.button("Add").clicked() {
            self.pending_edits.push(ListEdit::Add { list: id });
        }
    }
}

impl EditorAdapter for EguiAdapter {
    fn build_array_control(&mut self, array: &SyncArray, label: &str) -> WidgetHandle {
        self.widgets.build_array_control(array, label)
    }

    fn build_list_control(
        &mut self,
        list: &MirrorList,
        label: &str,
        style: &ListStyle,
    ) -> WidgetHandle {
        self.widgets.build_list_control(list, label, style)
    }

    fn build_label(&mut self, text: &str) -> WidgetHandle {
        self.widgets.build_label(text)
    }

    fn destroy(&mut self, widget: WidgetHandle) {
        self.widgets.destroy(widget);
        let live: Vec<ListId> =
            self.widgets.list_controls().into_iter().map(|(_, list)| list).collect();
        self.pending_edits.retain(|edit| live.contains(&edit.list()));
    }
}

fn edit_record(ui: &mut Ui, data: &mut RecordData, size: egui::Vec2) -> bool {
    match data {
        RecordData::Field(value) => edit_value(ui, value, size),
        RecordData::Reference(target) => {
            let text = match target {
                Some(entity) => format!("Entity {}", entity.index()),
                None => "None".to_string(),
            };
            ui.label(text);
            if target.is_some() && ui.small_button("Clear").clicked() {
                *target = None;
                return true;
            }
            false
        }
        RecordData::Point { position, value } => {
            let moved = ui.add_sized(size, egui::DragValue::new(position).speed(0.01)).changed();
            let edited = edit_value(ui, value, size);
            moved || edited
        }
    }
}

fn edit_value(ui: &mut Ui, value: &mut Value, size: egui::Vec2) -> bool {
    match value {
        Value::Bool(flag) => ui.checkbox(flag, "").changed(),
        Value::Int(number) => ui.add_sized(size, egui::DragValue::new(number)).changed(),
        Value::Float(number) => {
            ui.add_sized(size, egui::DragValue::new(number).speed(0.01)).changed()
        }
        Value::Float2(vector) => {
            let mut parts = vector.to_array();
            let changed = edit_components(ui, &mut parts, size);
            *vector = Vec2::from_array(parts);
            changed
        }
        Value::Float3(vector) => {
            let mut parts = vector.to_array();
            let changed = edit_components(ui, &mut parts, size);
            *vector = Vec3::from_array(parts);
            changed
        }
        Value::Float4(vector) | Value::Color(vector) => {
            let mut parts = vector.to_array();
            let changed = edit_components(ui, &mut parts, size);
            *vector = Vec4::from_array(parts);
            changed
        }
        Value::Quat(rotation) => {
            let mut parts = rotation.to_array();
            let changed = edit_components(ui, &mut parts, size);
            if changed {
                *rotation = Quat::from_array(parts).normalize();
            }
            changed
        }
        Value::String(text) => {
            let wide = egui::vec2(size.x * 2.0, size.y);
            ui.add_sized(wide, egui::TextEdit::singleline(text)).changed()
        }
    }
}

fn edit_components(ui: &mut Ui, parts: &mut [f32], size: egui::Vec2) -> bool {
    let mut changed = false;
    for part in parts.iter_mut() {
        changed |= ui.add_sized(size, egui::DragValue::new(part).speed(0.01)).changed();
    }
    changed
}
