//! Name column models

use std::cell::RefCell;

use crate::constants;
use crate::events::{Event, Subscription};
use crate::stage::{AttributeValue, SdfPath, StageHandle};

use super::ItemValueModel;

/// Displayed name of an attribute. Never refreshes from the stage.
pub struct AttributeNameModel {
    attribute_path: SdfPath,
    display_name: RefCell<Option<String>>,
    display_tooltip: RefCell<Option<String>>,
    value_changed: Event<()>,
}

impl AttributeNameModel {
    pub fn new(attribute_path: SdfPath) -> Self {
        Self {
            attribute_path,
            display_name: RefCell::new(None),
            display_tooltip: RefCell::new(None),
            value_changed: Event::new(),
        }
    }

    /// Name model using the attribute's `displayName` metadata when it has one
    pub fn for_attribute(stage: &StageHandle, attribute_path: SdfPath) -> Self {
        let display_name = stage
            .attribute_info(&attribute_path)
            .and_then(|info| info.metadata.display_name);
        let model = Self::new(attribute_path);
        *model.display_name.borrow_mut() = display_name;
        model
    }

    pub fn with_display_name(self, display_name: impl Into<String>) -> Self {
        *self.display_name.borrow_mut() = Some(display_name.into());
        self
    }

    pub fn with_tooltip(self, tooltip: impl Into<String>) -> Self {
        *self.display_tooltip.borrow_mut() = Some(tooltip.into());
        self
    }

    pub fn attribute_path(&self) -> &SdfPath {
        &self.attribute_path
    }

    pub fn set_display_name(&self, display_name: Option<String>) {
        *self.display_name.borrow_mut() = display_name;
        self.value_changed.emit(&());
    }

    pub fn set_display_tooltip(&self, tooltip: Option<String>) {
        *self.display_tooltip.borrow_mut() = tooltip;
    }

    pub fn name(&self) -> String {
        self.display_name
            .borrow()
            .clone()
            .unwrap_or_else(|| self.attribute_path.name().to_string())
    }
}

impl ItemValueModel for AttributeNameModel {
    fn get_value(&self) -> Option<AttributeValue> {
        Some(AttributeValue::String(self.name()))
    }

    fn set_value(&self, _value: AttributeValue) -> bool {
        false
    }

    fn value_as_string(&self) -> String {
        self.name()
    }

    fn tooltip(&self) -> String {
        self.display_tooltip
            .borrow()
            .clone()
            .unwrap_or_else(|| self.attribute_path.name().to_string())
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.value_changed.subscribe(move |_| callback())
    }
}

/// Name of an attribute that doesn't exist yet
pub struct VirtualAttributeNameModel(AttributeNameModel);

impl VirtualAttributeNameModel {
    pub fn new(attribute_path: SdfPath) -> Self {
        Self(AttributeNameModel::new(attribute_path))
    }

    pub fn with_display_name(self, display_name: impl Into<String>) -> Self {
        Self(self.0.with_display_name(display_name))
    }
}

impl ItemValueModel for VirtualAttributeNameModel {
    fn get_value(&self) -> Option<AttributeValue> {
        self.0.get_value()
    }

    fn set_value(&self, _value: AttributeValue) -> bool {
        false
    }

    fn value_as_string(&self) -> String {
        self.0.name()
    }

    fn tooltip(&self) -> String {
        format!("{}{}", constants::tooltip::VIRTUAL_PREFIX, self.0.attribute_path.name())
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.0.subscribe_value_changed(callback)
    }
}
