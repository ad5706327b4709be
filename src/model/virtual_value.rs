//! Value model of attributes that don't exist yet
//!
//! The model shows a default value until the first committed edit with a
//! different value, then creates the attributes and behaves like a regular
//! [`AttributeValueModel`] from then on.

use crate::events::{Event, Subscription};
use crate::listener::ListenedModel;
use crate::stage::{AttributeValue, SdfPath, StageHandle, ValueKind};

use super::attr_value::{AttributeValueModel, ModelOptions};
use super::binding::AttributeBinding;
use super::ItemValueModel;

/// Creates the attributes of a virtual model, receives the committed value
pub type CreateCallback = Box<dyn Fn(&AttributeValue)>;

pub struct VirtualAttributeValueModel {
    inner: AttributeValueModel,
    kind: ValueKind,
    default_value: AttributeValue,
    create_callback: Option<CreateCallback>,
    attribute_created: Event<Vec<SdfPath>>,
}

impl VirtualAttributeValueModel {
    /// Model over attributes of `kind` that will be created when edited
    pub fn new(binding: AttributeBinding, kind: ValueKind, default_value: AttributeValue, settings: ModelOptions) -> Self {
        let inner = AttributeValueModel::new_virtual(binding, kind, default_value.clone(), settings);
        Self {
            inner,
            kind,
            default_value,
            create_callback: None,
            attribute_created: Event::new(),
        }
    }

    /// Create the attributes with `callback` instead of one create command per path
    pub fn with_create_callback(mut self, callback: impl Fn(&AttributeValue) + 'static) -> Self {
        self.create_callback = Some(Box::new(callback));
        self
    }

    /// Whether the attributes still have to be created
    pub fn is_virtual(&self) -> bool {
        self.inner.is_virtual()
    }

    pub fn default_value(&self) -> &AttributeValue {
        &self.default_value
    }

    pub fn attribute_paths(&self) -> &[SdfPath] {
        self.inner.attribute_paths()
    }

    pub fn get_value(&self) -> Option<AttributeValue> {
        self.inner.get_value()
    }

    pub fn set_value(&self, value: AttributeValue) -> bool {
        self.inner.set_value(value)
    }

    pub fn is_default(&self) -> bool {
        self.is_virtual() || self.inner.is_default()
    }

    pub fn is_mixed(&self) -> bool {
        !self.is_virtual() && self.inner.is_mixed()
    }

    pub fn is_overriden(&self) -> bool {
        !self.is_virtual() && self.inner.is_overriden()
    }

    /// Attributes created by someone else turn the model live
    pub fn refresh(&self) -> bool {
        if self.is_virtual() && self.attributes_exist() {
            log::debug!("Attributes {:?} appeared, leaving virtual mode", self.attribute_paths());
            self.inner.go_live();
        }
        self.inner.refresh()
    }

    /// Commit the edit, creating the attributes if the value left the default
    pub fn end_edit(&self) {
        if !self.is_virtual() {
            self.inner.end_edit();
            return;
        }
        let Some(value) = self.inner.cached_value() else {
            return;
        };
        if value == self.default_value {
            return;
        }
        self.inner.end_edit();
        self.materialize(&value);
    }

    fn attributes_exist(&self) -> bool {
        let binding = self.inner.binding();
        binding
            .attribute_paths()
            .iter()
            .any(|path| binding.writable_info(path).is_some())
    }

    fn materialize(&self, value: &AttributeValue) {
        let binding = self.inner.binding();
        let created = match &self.create_callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => {
                let mut created = false;
                for path in binding.attribute_paths().iter().filter(|path| path.is_property_path()) {
                    match binding.create_attribute(path, self.kind, value.clone()) {
                        Ok(()) => created = true,
                        Err(e) => log::error!("Failed to create {}: {}", path, e),
                    }
                }
                created
            }
        };
        if !created {
            if self.inner.read_value_from_stage() {
                self.inner.notify_changed();
            }
            return;
        }

        self.inner.go_live();
        self.inner.read_value_from_stage();
        self.inner.notify_changed();
        self.attribute_created.emit(&binding.attribute_paths().to_vec());
    }

    /// Called once with the bound paths when the attributes get created
    pub fn subscribe_attribute_created(&self, callback: impl Fn(&[SdfPath]) + 'static) -> Subscription {
        self.attribute_created.subscribe(move |paths: &Vec<SdfPath>| callback(paths))
    }
}

impl ListenedModel for VirtualAttributeValueModel {
    fn stage(&self) -> &StageHandle {
        self.inner.binding().stage()
    }

    fn refresh(&self) -> bool {
        VirtualAttributeValueModel::refresh(self)
    }
}

impl ItemValueModel for VirtualAttributeValueModel {
    fn get_value(&self) -> Option<AttributeValue> {
        VirtualAttributeValueModel::get_value(self)
    }

    fn set_value(&self, value: AttributeValue) -> bool {
        VirtualAttributeValueModel::set_value(self, value)
    }

    fn value_as_string(&self) -> String {
        self.inner.value_as_string()
    }

    fn tooltip(&self) -> String {
        self.inner.tooltip()
    }

    fn refresh(&self) -> bool {
        VirtualAttributeValueModel::refresh(self)
    }

    fn begin_edit(&self) {
        self.inner.begin_edit()
    }

    fn end_edit(&self) {
        VirtualAttributeValueModel::end_edit(self)
    }

    fn is_read_only(&self) -> bool {
        ItemValueModel::is_read_only(&self.inner)
    }

    fn is_default(&self) -> bool {
        VirtualAttributeValueModel::is_default(self)
    }

    fn is_mixed(&self) -> bool {
        VirtualAttributeValueModel::is_mixed(self)
    }

    fn is_overriden(&self) -> bool {
        VirtualAttributeValueModel::is_overriden(self)
    }

    fn reset_default_value(&self) {
        if !self.is_virtual() {
            self.inner.reset_default_value();
        }
    }

    fn widget_kind(&self) -> Option<ValueKind> {
        Some(self.kind.component_kind())
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.inner.subscribe_value_changed(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{AttributeSpec, InMemoryStage, Stage};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn virtual_model(stage: &Rc<InMemoryStage>) -> VirtualAttributeValueModel {
        let binding = AttributeBinding::new(stage.clone(), "", vec![SdfPath::new("/World/Mat.roughness")]);
        VirtualAttributeValueModel::new(binding, ValueKind::Float, AttributeValue::Float(0.5), ModelOptions::default())
    }

    fn stage() -> Rc<InMemoryStage> {
        let stage = Rc::new(InMemoryStage::new());
        stage.define_prim("/World/Mat");
        stage
    }

    #[test]
    fn test_default_edit_creates_nothing() {
        let stage = stage();
        let model = virtual_model(&stage);
        let created = Rc::new(Cell::new(0));
        let sink = created.clone();
        let _subscription = model.subscribe_attribute_created(move |_| sink.set(sink.get() + 1));

        model.begin_edit();
        assert!(!model.set_value(AttributeValue::Float(0.5)));
        model.end_edit();

        assert!(model.is_virtual());
        assert_eq!(created.get(), 0);
        assert!(stage.executed_commands().is_empty());
    }

    #[test]
    fn test_constant_state_while_virtual() {
        let stage = stage();
        let model = virtual_model(&stage);
        model.set_value("0.9".into());
        assert!(model.is_default());
        assert!(!model.is_mixed());
        assert!(!model.is_overriden());

        // Still absent: the cache snaps back to the default
        assert!(model.refresh());
        assert_eq!(model.get_value(), Some(AttributeValue::Float(0.5)));
    }

    #[test]
    fn test_create_callback_replaces_create_command() {
        let stage = stage();
        let received = Rc::new(RefCell::new(None));
        let sink = received.clone();
        let callback_stage = stage.clone();
        let model = virtual_model(&stage).with_create_callback(move |value| {
            *sink.borrow_mut() = Some(value.clone());
            callback_stage
                .declare_attribute("/World/Mat.roughness", AttributeSpec::new(ValueKind::Float))
                .unwrap();
            callback_stage
                .set_attribute("/World/Mat.roughness", value.clone())
                .unwrap();
        });

        model.set_value(AttributeValue::Float(0.25));
        model.end_edit();

        assert_eq!(*received.borrow(), Some(AttributeValue::Float(0.25)));
        assert!(!model.is_virtual());
        assert!(stage.executed_commands().is_empty());
        assert_eq!(model.get_value(), Some(AttributeValue::Float(0.25)));
    }

    #[test]
    fn test_external_creation_turns_model_live() {
        let stage = stage();
        let model = virtual_model(&stage);
        stage
            .declare_attribute("/World/Mat.roughness", AttributeSpec::new(ValueKind::Float))
            .unwrap();
        stage.set_attribute("/World/Mat.roughness", AttributeValue::Float(0.75)).unwrap();

        assert!(model.refresh());
        assert!(!model.is_virtual());
        assert_eq!(model.get_value(), Some(AttributeValue::Float(0.75)));
    }

    #[test]
    fn test_failed_creation_stays_virtual() {
        let stage = Rc::new(InMemoryStage::new());
        let model = virtual_model(&stage);
        model.set_value(AttributeValue::Float(0.9));
        model.end_edit();
        assert!(model.is_virtual());
        assert_eq!(model.get_value(), Some(AttributeValue::Float(0.5)));
        assert!(stage.get(&SdfPath::new("/World/Mat.roughness")).is_none());
    }
}
