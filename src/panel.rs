//! Property panel rendering value models with egui

use std::cell::Cell;
use std::rc::Rc;

use egui::{ComboBox, DragValue, TextEdit};

use crate::constants;
use crate::events::Subscription;
use crate::model::ItemValueModel;
use crate::stage::{AttributeValue, ValueKind};

/// One line of the panel: a name and one widget per value model
pub struct PropertyRow {
    name: Rc<dyn ItemValueModel>,
    values: Vec<Rc<dyn ItemValueModel>>,
    /// Text being typed, per value, while a text field has focus
    buffers: Vec<Option<String>>,
    _subscriptions: Vec<Subscription>,
}

impl PropertyRow {
    pub fn name(&self) -> &Rc<dyn ItemValueModel> {
        &self.name
    }

    pub fn values(&self) -> &[Rc<dyn ItemValueModel>] {
        &self.values
    }

    pub fn is_default(&self) -> bool {
        self.values.iter().all(|value| value.is_default())
    }
}

/// Rows of bound properties, repainted when a model reports a change
pub struct PropertyPanel {
    rows: Vec<PropertyRow>,
    dirty: Rc<Cell<bool>>,
}

impl PropertyPanel {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            dirty: Rc::new(Cell::new(false)),
        }
    }

    pub fn add_row(&mut self, name: Rc<dyn ItemValueModel>, values: Vec<Rc<dyn ItemValueModel>>) {
        let subscriptions = values
            .iter()
            .map(|value| {
                let dirty = self.dirty.clone();
                value.subscribe_value_changed(Box::new(move || dirty.set(true)))
            })
            .collect();
        self.rows.push(PropertyRow {
            name,
            buffers: vec![None; values.len()],
            values,
            _subscriptions: subscriptions,
        });
    }

    pub fn rows(&self) -> &[PropertyRow] {
        &self.rows
    }

    /// Whether a model changed since the last call
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        if self.take_dirty() {
            ui.ctx().request_repaint();
        }
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                ui.add_sized(
                    [constants::ui::NAME_COLUMN_WIDTH, ui.spacing().interact_size.y],
                    egui::Label::new(row.name.value_as_string()),
                )
                .on_hover_text(row.name.tooltip());

                for (value_index, value) in row.values.iter().enumerate() {
                    let id = ui.id().with((row_index, value_index));
                    let buffer = &mut row.buffers[value_index];
                    ui.add_enabled_ui(!value.is_read_only(), |ui| {
                        show_value(ui, id, value.as_ref(), buffer);
                    });
                }

                if !row.is_default() && ui.small_button("⟲").on_hover_text("Reset to default").clicked() {
                    for value in &row.values {
                        value.reset_default_value();
                    }
                }
            });
        }
    }
}

impl Default for PropertyPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn show_value(ui: &mut egui::Ui, id: egui::Id, model: &dyn ItemValueModel, buffer: &mut Option<String>) {
    if let Some(options) = model.options() {
        show_options(ui, id, model, &options);
        return;
    }
    match model.widget_kind() {
        Some(ValueKind::Bool) => {
            let mut checked = model.get_value().and_then(|value| value.as_bool()).unwrap_or_default();
            let response = ui.checkbox(&mut checked, "").on_hover_text(model.tooltip());
            if response.changed() {
                model.begin_edit();
                model.set_value(AttributeValue::Bool(checked));
                model.end_edit();
            }
        }
        Some(kind @ (ValueKind::Int | ValueKind::Float | ValueKind::Double)) => {
            let mut number = model.get_value().and_then(|value| value.as_f64()).unwrap_or_default();
            let mut drag = DragValue::new(&mut number).speed(if kind == ValueKind::Int { 1.0 } else { 0.01 });
            if model.is_mixed() {
                drag = drag.custom_formatter(|_, _| constants::tooltip::MIXED_PLACEHOLDER.to_string());
            }
            let response = ui
                .add_sized([constants::ui::CHANNEL_WIDTH, ui.spacing().interact_size.y], drag)
                .on_hover_text(model.tooltip());
            if response.drag_started() || response.gained_focus() {
                model.begin_edit();
            }
            if response.changed() {
                let value = match kind {
                    ValueKind::Int => AttributeValue::Int(number.round() as i32),
                    ValueKind::Float => AttributeValue::Float(number as f32),
                    _ => AttributeValue::Double(number),
                };
                model.set_value(value);
            }
            if response.drag_stopped() || response.lost_focus() {
                model.end_edit();
            }
        }
        _ => show_text(ui, id, model, buffer),
    }
}

fn show_options(ui: &mut egui::Ui, id: egui::Id, model: &dyn ItemValueModel, options: &[String]) {
    let current = model.value_as_string();
    ComboBox::from_id_salt(id)
        .selected_text(current.as_str())
        .show_ui(ui, |ui| {
            for option in options {
                if ui.selectable_label(*option == current, option.as_str()).clicked() {
                    model.begin_edit();
                    model.set_value(AttributeValue::String(option.clone()));
                    model.end_edit();
                }
            }
        })
        .response
        .on_hover_text(model.tooltip());
}

fn show_text(ui: &mut egui::Ui, id: egui::Id, model: &dyn ItemValueModel, buffer: &mut Option<String>) {
    let mut text = buffer.clone().unwrap_or_else(|| model.value_as_string());
    let response = ui
        .add(TextEdit::singleline(&mut text).id(id).desired_width(constants::picker::FIELD_WIDTH))
        .on_hover_text(model.tooltip());
    if response.gained_focus() {
        model.begin_edit();
    }
    if response.has_focus() {
        *buffer = Some(text.clone());
    }
    if response.lost_focus() {
        *buffer = None;
        model.set_value(AttributeValue::String(text));
        model.end_edit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomFileAttributeValueModel;

    #[test]
    fn test_model_changes_mark_panel_dirty() {
        let mut panel = PropertyPanel::new();
        let value = Rc::new(CustomFileAttributeValueModel::new("draft".into()));
        panel.add_row(Rc::new(CustomFileAttributeValueModel::new("Status".into())), vec![value.clone() as Rc<dyn ItemValueModel>]);
        assert!(!panel.take_dirty());

        value.set_value("final".into());
        assert!(panel.take_dirty());
        assert!(!panel.take_dirty());
        assert_eq!(panel.rows()[0].values()[0].value_as_string(), "final");
    }
}
