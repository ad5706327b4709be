//! Attribute value model
//!
//! Caches the value of one or more attributes for a widget. The first
//! readable path provides the displayed value, every other readable path is
//! only compared against it to detect mixed values. Edits are coerced to the
//! attribute kind, cached, then written through stage commands to every path
//! that doesn't hold the value yet.

use std::cell::{Cell, RefCell};

use serde_json::Value;

use crate::config::PropertyConfig;
use crate::constants;
use crate::events::{Event, Subscription};
use crate::listener::ListenedModel;
use crate::path_utils::{is_file_path_valid, normalize_path};
use crate::stage::{AssetPath, AttributeValue, SdfPath, StageHandle, ValueKind};

use super::binding::AttributeBinding;
use super::serialize::ValueSerializer;
use super::ItemValueModel;

/// Construction options of an [`AttributeValueModel`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Channel edited by this model for multi-component kinds
    pub channel_index: usize,
    pub read_only: bool,
    /// Attribute kinds without a proper editor yet, displayed but never written
    pub not_implemented: bool,
    pub tooltip_summary_limit: usize,
    pub tooltip_separate_lines_threshold: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            channel_index: 0,
            read_only: false,
            not_implemented: false,
            tooltip_summary_limit: constants::tooltip::SUMMARY_LIMIT,
            tooltip_separate_lines_threshold: constants::tooltip::SEPARATE_LINES_THRESHOLD,
        }
    }
}

impl ModelOptions {
    pub fn from_config(config: &PropertyConfig) -> Self {
        Self {
            tooltip_summary_limit: config.tooltip_summary_limit,
            tooltip_separate_lines_threshold: config.tooltip_separate_lines_threshold,
            ..Default::default()
        }
    }

    pub fn channel(mut self, channel_index: usize) -> Self {
        self.channel_index = channel_index;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn not_implemented(mut self) -> Self {
        self.not_implemented = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindingMode {
    /// Values are read from the stage
    Live,
    /// The attributes don't exist yet, the cache holds `default` until edited
    Virtual { default: AttributeValue },
}

#[derive(Debug, Default)]
struct CachedState {
    value: Option<AttributeValue>,
    /// Normalized value of every readable path, in binding order
    values: Vec<AttributeValue>,
    is_mixed: bool,
}

/// Raises a flag for as long as it lives, restoring the previous state on drop
struct RefreshGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> RefreshGuard<'a> {
    fn new(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Two-way binding between a widget value and stage attributes
pub struct AttributeValueModel {
    binding: AttributeBinding,
    serializer: ValueSerializer,
    kind: Option<ValueKind>,
    /// Option strings of integer attributes presented as a list
    options: Option<Vec<String>>,
    settings: ModelOptions,
    state: RefCell<CachedState>,
    has_wrong_value: Cell<bool>,
    ignore_refresh: Cell<bool>,
    mode: RefCell<BindingMode>,
    value_changed: Event<()>,
}

impl AttributeValueModel {
    /// Bind to existing attributes, the kind is read from the first one found
    pub fn new(binding: AttributeBinding, settings: ModelOptions) -> Self {
        let kind = binding.declared_kind();
        Self::build(binding, kind, None, settings, BindingMode::Live)
    }

    /// Bind to integer attributes displayed as one of `options`
    pub fn with_options(binding: AttributeBinding, options: Vec<String>, settings: ModelOptions) -> Self {
        let kind = binding.declared_kind();
        Self::build(binding, kind, Some(options), settings, BindingMode::Live)
    }

    pub(crate) fn new_virtual(
        binding: AttributeBinding,
        kind: ValueKind,
        default: AttributeValue,
        settings: ModelOptions,
    ) -> Self {
        Self::build(binding, Some(kind), None, settings, BindingMode::Virtual { default })
    }

    fn build(
        binding: AttributeBinding,
        kind: Option<ValueKind>,
        options: Option<Vec<String>>,
        settings: ModelOptions,
        mode: BindingMode,
    ) -> Self {
        let serializer = ValueSerializer::new(binding.stage().clone());
        let model = Self {
            binding,
            serializer,
            kind,
            options,
            settings,
            state: RefCell::new(CachedState::default()),
            has_wrong_value: Cell::new(false),
            ignore_refresh: Cell::new(false),
            mode: RefCell::new(mode),
            value_changed: Event::new(),
        };
        model.read_value_from_stage();
        model
    }

    pub fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    pub fn attribute_paths(&self) -> &[SdfPath] {
        self.binding.attribute_paths()
    }

    pub fn context_name(&self) -> &str {
        self.binding.context_name()
    }

    /// Declared kind of the bound attributes
    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    pub fn channel_index(&self) -> usize {
        self.settings.channel_index
    }

    pub fn read_only(&self) -> bool {
        self.settings.read_only
    }

    /// Whether the last write was rejected by validation
    pub fn has_wrong_value(&self) -> bool {
        self.has_wrong_value.get()
    }

    /// Normalized value of every readable path at the last read
    pub fn values(&self) -> Vec<AttributeValue> {
        self.state.borrow().values.clone()
    }

    pub fn is_mixed(&self) -> bool {
        !self.is_virtual() && self.state.borrow().is_mixed
    }

    pub fn is_overriden(&self) -> bool {
        !self.is_virtual() && self.binding.is_overriden()
    }

    pub(crate) fn is_virtual(&self) -> bool {
        matches!(*self.mode.borrow(), BindingMode::Virtual { .. })
    }

    /// Start reading the stage, used once virtual attributes exist
    pub(crate) fn go_live(&self) {
        *self.mode.borrow_mut() = BindingMode::Live;
    }

    pub(crate) fn cached_value(&self) -> Option<AttributeValue> {
        self.state.borrow().value.clone()
    }

    pub(crate) fn notify_changed(&self) {
        self.value_changed.emit(&());
    }

    fn is_multichannel(&self) -> bool {
        self.options.is_none() && self.kind.is_some_and(ValueKind::is_multichannel)
    }

    fn is_asset(&self) -> bool {
        self.options.is_none() && self.kind == Some(ValueKind::Asset)
    }

    /// Scene value converted to what the cache holds
    fn read_attribute_value(&self, path: &SdfPath) -> Option<AttributeValue> {
        let raw = self.binding.stage().get(path)?;
        if let (Some(options), AttributeValue::Int(index)) = (&self.options, &raw) {
            if let Some(option) = usize::try_from(*index).ok().and_then(|index| options.get(index)) {
                return Some(AttributeValue::String(option.clone()));
            }
        }
        Some(match self.kind {
            Some(kind) => kind.normalize(raw),
            None => raw,
        })
    }

    /// Re-read every bound path, returns whether the cached value or the mixed state changed
    pub(crate) fn read_value_from_stage(&self) -> bool {
        if let BindingMode::Virtual { default } = &*self.mode.borrow() {
            let mut state = self.state.borrow_mut();
            if state.value.as_ref() == Some(default) {
                return false;
            }
            state.value = Some(default.clone());
            state.values.clear();
            state.is_mixed = false;
            return true;
        }

        let mut first: Option<AttributeValue> = None;
        let mut values = Vec::new();
        let mut is_mixed = false;
        for path in self.binding.attribute_paths() {
            if self.binding.readable_info(path).is_none() {
                continue;
            }
            let Some(value) = self.read_attribute_value(path) else {
                continue;
            };
            match &first {
                None => first = Some(value.clone()),
                Some(first) if *first != value => is_mixed = true,
                Some(_) => {}
            }
            values.push(value);
        }

        let mut state = self.state.borrow_mut();
        let mut value_was_set = false;
        if let Some(first) = first {
            if state.value.as_ref() != Some(&first) {
                state.value = Some(first);
                value_was_set = true;
            }
        }
        if is_mixed != state.is_mixed {
            value_was_set = true;
        }
        state.is_mixed = is_mixed;
        state.values = values;
        value_was_set
    }

    /// Re-read the stage and notify the widget if anything changed.
    /// Ignored while this model is writing.
    pub fn refresh(&self) -> bool {
        if self.ignore_refresh.get() {
            return false;
        }
        let changed = self.read_value_from_stage();
        if changed {
            self.notify_changed();
        }
        changed
    }

    /// Widget-facing value: the selected channel of vectors, the authored asset path record for assets
    pub fn get_value(&self) -> Option<AttributeValue> {
        let value = self.state.borrow().value.clone()?;
        if self.is_asset() && !self.is_virtual() {
            return self.binding.raw_value(self.settings.channel_index);
        }
        if self.is_multichannel() {
            return value.component(self.settings.channel_index).or(Some(value));
        }
        Some(value)
    }

    fn skip_set_value(&self, value: &AttributeValue) -> bool {
        if self.settings.read_only || self.settings.not_implemented {
            return true;
        }
        match value {
            AttributeValue::String(text) | AttributeValue::Token(text) => {
                text == constants::model::NULL_SENTINEL
                    || (text.trim().is_empty() && !self.kind.is_some_and(ValueKind::accepts_empty_string))
            }
            _ => false,
        }
    }

    /// `None` when the value can't be written to the attribute kind
    fn coerce_input(&self, value: AttributeValue) -> Option<AttributeValue> {
        if self.options.is_some() {
            return Some(match value.as_text() {
                Some(text) => AttributeValue::String(text.to_string()),
                None => value,
            });
        }
        let Some(kind) = self.kind else {
            return Some(value);
        };
        match kind.coerce(value.clone()) {
            Ok(coerced) => Some(coerced),
            Err(e) => {
                log::warn!("Failed to coerce value {}: {}", value, e);
                // The asset setter rejects unsupported values loudly
                (kind == ValueKind::Asset).then_some(value)
            }
        }
    }

    fn set_internal_value(&self, new_value: AttributeValue) {
        let mut state = self.state.borrow_mut();
        let kind = match self.kind {
            Some(kind) if self.is_multichannel() && new_value.kind() != kind => kind,
            _ => {
                state.value = Some(new_value);
                return;
            }
        };
        let base = state
            .value
            .clone()
            .filter(|value| value.kind() == kind)
            .unwrap_or_else(|| kind.zero_value());
        match base.with_component(self.settings.channel_index, &new_value) {
            Some(updated) => state.value = Some(updated),
            None => log::warn!(
                "Cannot set channel {} of a {} value to {}",
                self.settings.channel_index,
                kind,
                new_value
            ),
        }
    }

    /// Push a widget value to every bound attribute.
    /// Returns whether a stage command succeeded.
    pub fn set_value(&self, value: AttributeValue) -> bool {
        if self.skip_set_value(&value) {
            return false;
        }
        let Some(new_value) = self.coerce_input(value) else {
            self.notify_changed();
            return false;
        };
        self.set_internal_value(new_value);
        let Some(cached) = self.cached_value() else {
            return false;
        };

        let mut need_refresh = false;
        let mut changed = false;
        for path in self.binding.attribute_paths() {
            if self.binding.writable_info(path).is_none() {
                continue;
            }
            if self.read_attribute_value(path).as_ref() == Some(&cached) {
                continue;
            }
            need_refresh = true;
            let _guard = RefreshGuard::new(&self.ignore_refresh);
            changed |= self.set_attribute_value(path, &cached);
        }
        if need_refresh {
            self.refresh();
            return changed;
        }
        // Nothing to write, the widget still repaints
        self.notify_changed();
        false
    }

    /// Write one attribute through a stage command, returns whether it succeeded
    fn set_attribute_value(&self, path: &SdfPath, value: &AttributeValue) -> bool {
        let value = if let Some(options) = &self.options {
            let text = value.as_text().unwrap_or_default();
            match options.iter().position(|option| option == text) {
                Some(index) => AttributeValue::Int(index as i32),
                None => {
                    log::warn!("{:?} is not an option of {}", text, path);
                    return false;
                }
            }
        } else if self.is_asset() {
            match self.asset_value(path, value) {
                Some(asset) => asset,
                None => return false,
            }
        } else {
            value.clone()
        };
        self.has_wrong_value.set(false);

        match self.binding.change_property(path, value) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to change {}: {}", path, e);
                false
            }
        }
    }

    /// Build the asset path record, validating texture paths against the edit target
    fn asset_value(&self, path: &SdfPath, value: &AttributeValue) -> Option<AttributeValue> {
        let is_texture = self.binding.metadata().color_space.is_some();
        let layer = self.binding.stage().edit_target();
        match value {
            AttributeValue::String(text) | AttributeValue::Token(text) => {
                let text = text.trim();
                if !is_texture {
                    return Some(AttributeValue::Asset(AssetPath::new(text)));
                }
                if !text.is_empty() && !is_file_path_valid(text, &layer) {
                    self.has_wrong_value.set(true);
                    log::warn!("Invalid file path {:?} for {}", text, path);
                    return None;
                }
                let absolute = normalize_path(&layer.compute_absolute_path(text));
                Some(AttributeValue::Asset(AssetPath::with_resolved(
                    text.replace('\\', "/"),
                    absolute,
                )))
            }
            AttributeValue::Asset(asset) => {
                if is_texture && !is_file_path_valid(&asset.path, &layer) {
                    self.has_wrong_value.set(true);
                    log::warn!("Invalid file path {:?} for {}", asset.path, path);
                    return None;
                }
                Some(value.clone())
            }
            other => panic!("Unsupported {} value for asset attribute {}", other.kind(), path),
        }
    }

    /// Whether every bound attribute holds its default. Attributes without a default are skipped.
    pub fn is_default(&self) -> bool {
        if self.is_virtual() {
            return true;
        }
        for (index, path) in self.binding.attribute_paths().iter().enumerate() {
            let Some(default) = self.binding.default_value(path) else {
                continue;
            };
            match self.binding.raw_value(index) {
                Some(raw) if default.kind().equals(&default, &raw) => {}
                _ => return false,
            }
        }
        true
    }

    /// Write the default of every bound attribute that declares one
    pub fn reset_default_value(&self) {
        if self.is_virtual() {
            return;
        }
        for path in self.binding.attribute_paths() {
            let Some(default) = self.binding.default_value(path) else {
                continue;
            };
            let value = match default {
                AttributeValue::Int(index) if self.options.is_some() => self
                    .options
                    .as_ref()
                    .and_then(|options| usize::try_from(index).ok().and_then(|i| options.get(i)))
                    .map(|option| AttributeValue::String(option.clone()))
                    .unwrap_or(AttributeValue::Int(index)),
                AttributeValue::Asset(asset) => AttributeValue::String(asset.path),
                default if self.is_multichannel() => default
                    .component(self.settings.channel_index)
                    .unwrap_or(default),
                default => default,
            };
            self.set_value(value);
        }
    }

    /// Read before editing, other widgets may have written while refreshes were ignored
    pub fn begin_edit(&self) {
        if self.read_value_from_stage() {
            self.notify_changed();
        }
    }

    /// Snap back to the stage value when the last write was rejected
    pub fn end_edit(&self) {
        if self.has_wrong_value.get() && self.read_value_from_stage() {
            self.notify_changed();
        }
    }

    pub fn tooltip(&self) -> String {
        if !self.is_mixed() {
            return self.value_as_string();
        }
        let rendered_len = self
            .get_value()
            .map(|value| value.to_string().chars().count())
            .unwrap_or_default();
        let separate_lines = rendered_len > self.settings.tooltip_separate_lines_threshold;

        let mut tooltip = constants::tooltip::MIXED_PREFIX.to_string();
        if separate_lines {
            tooltip.push('\n');
        }
        let state = self.state.borrow();
        let limit = self.settings.tooltip_summary_limit;
        let separator = if separate_lines { "\n" } else { ", " };
        let listed: Vec<String> = state.values.iter().take(limit).map(ToString::to_string).collect();
        tooltip.push_str(&listed.join(separator));
        if state.values.len() > limit {
            tooltip.push_str(constants::tooltip::TRUNCATION_SUFFIX);
        }
        tooltip
    }

    pub fn value_as_string(&self) -> String {
        if self.is_mixed() {
            return constants::tooltip::MIXED_PLACEHOLDER.to_string();
        }
        match self.get_value() {
            None => String::new(),
            Some(AttributeValue::Asset(asset)) => asset.path,
            Some(AttributeValue::String(text)) | Some(AttributeValue::Token(text)) => text,
            Some(value) => value.to_string(),
        }
    }

    pub fn value_as_f64(&self) -> f64 {
        self.get_value()
            .and_then(|value| value.as_f64().or_else(|| value.as_text()?.trim().parse().ok()))
            .unwrap_or_default()
    }

    pub fn value_as_bool(&self) -> bool {
        self.get_value().and_then(|value| value.as_bool()).unwrap_or_default()
    }

    pub fn value_as_i64(&self) -> i64 {
        self.value_as_f64() as i64
    }

    /// Current value in its persistence form
    pub fn serialize_value(&self) -> Option<Value> {
        self.get_value().map(|value| self.serializer.serialize(&value))
    }

    /// Apply a value stored with [`Self::serialize_value`]
    pub fn deserialize_value(&self, data: &Value) -> bool {
        let Some(kind) = self.kind else {
            return false;
        };
        // Channel models store a single component
        let kind = if self.is_multichannel() && !data.is_object() {
            kind.component_kind()
        } else {
            kind
        };
        match self.serializer.deserialize(kind, data) {
            Ok(value) => self.set_value(value),
            Err(e) => {
                log::warn!("Failed to deserialize value: {}", e);
                false
            }
        }
    }

    pub fn subscribe_value_changed(&self, callback: impl Fn() + 'static) -> Subscription {
        self.value_changed.subscribe(move |_| callback())
    }
}

impl ListenedModel for AttributeValueModel {
    fn stage(&self) -> &StageHandle {
        self.binding.stage()
    }

    fn refresh(&self) -> bool {
        AttributeValueModel::refresh(self)
    }
}

impl ItemValueModel for AttributeValueModel {
    fn get_value(&self) -> Option<AttributeValue> {
        AttributeValueModel::get_value(self)
    }

    fn set_value(&self, value: AttributeValue) -> bool {
        AttributeValueModel::set_value(self, value)
    }

    fn value_as_string(&self) -> String {
        AttributeValueModel::value_as_string(self)
    }

    fn tooltip(&self) -> String {
        AttributeValueModel::tooltip(self)
    }

    fn refresh(&self) -> bool {
        AttributeValueModel::refresh(self)
    }

    fn begin_edit(&self) {
        AttributeValueModel::begin_edit(self)
    }

    fn end_edit(&self) {
        AttributeValueModel::end_edit(self)
    }

    fn is_read_only(&self) -> bool {
        self.settings.read_only || self.settings.not_implemented
    }

    fn is_default(&self) -> bool {
        AttributeValueModel::is_default(self)
    }

    fn is_mixed(&self) -> bool {
        AttributeValueModel::is_mixed(self)
    }

    fn is_overriden(&self) -> bool {
        AttributeValueModel::is_overriden(self)
    }

    fn reset_default_value(&self) {
        AttributeValueModel::reset_default_value(self)
    }

    fn widget_kind(&self) -> Option<ValueKind> {
        if self.options.is_some() {
            return None;
        }
        self.kind.map(ValueKind::component_kind)
    }

    fn options(&self) -> Option<Vec<String>> {
        self.options.clone()
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        AttributeValueModel::subscribe_value_changed(self, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{AttributeSpec, InMemoryStage, Stage};
    use glam::Vec3;
    use std::rc::Rc;

    fn stage_with(attributes: &[(&str, AttributeSpec)]) -> Rc<InMemoryStage> {
        let stage = Rc::new(InMemoryStage::new());
        for (path, spec) in attributes {
            let path = SdfPath::new(*path);
            if !stage.is_prim_valid(&path.prim_path()) {
                stage.define_prim(path.prim_path());
            }
            stage.declare_attribute(path, spec.clone()).unwrap();
        }
        stage
    }

    fn model(stage: &Rc<InMemoryStage>, paths: &[&str], settings: ModelOptions) -> AttributeValueModel {
        let binding = AttributeBinding::new(stage.clone(), "", paths.iter().map(|p| SdfPath::new(*p)).collect());
        AttributeValueModel::new(binding, settings)
    }

    #[test]
    fn test_hidden_and_invalid_paths_are_excluded() {
        let stage = stage_with(&[
            ("/World/A.size", AttributeSpec::new(ValueKind::Double)),
            ("/World/B.size", AttributeSpec::new(ValueKind::Double).hidden()),
        ]);
        stage.set_attribute("/World/A.size", AttributeValue::Double(1.0)).unwrap();
        stage.set_attribute("/World/B.size", AttributeValue::Double(2.0)).unwrap();

        let model = model(&stage, &["/World/Missing.size", "/World/B.size", "/World/A.size"], ModelOptions::default());
        assert_eq!(model.get_value(), Some(AttributeValue::Double(1.0)));
        assert_eq!(model.values(), vec![AttributeValue::Double(1.0)]);
        assert!(!model.is_mixed());
    }

    #[test]
    fn test_no_readable_path_keeps_value_unset() {
        let stage = stage_with(&[]);
        let model = model(&stage, &["/World/A.size"], ModelOptions::default());
        assert_eq!(model.get_value(), None);
        assert_eq!(model.value_as_string(), "");
        assert_eq!(model.value_as_f64(), 0.0);
        assert!(!model.value_as_bool());
        assert!(!model.refresh());
    }

    #[test]
    fn test_multichannel_edits_one_channel() {
        let stage = stage_with(&[("/World/Light.color", AttributeSpec::new(ValueKind::Color3f))]);
        stage
            .set_attribute("/World/Light.color", AttributeValue::Color3f(Vec3::new(1.0, 1.0, 1.0)))
            .unwrap();
        let green = model(&stage, &["/World/Light.color"], ModelOptions::default().channel(1));
        assert_eq!(green.get_value(), Some(AttributeValue::Float(1.0)));

        assert!(green.set_value("0.5".into()));
        assert_eq!(green.get_value(), Some(AttributeValue::Float(0.5)));
        assert_eq!(
            stage.get(&SdfPath::new("/World/Light.color")),
            Some(AttributeValue::Color3f(Vec3::new(1.0, 0.5, 1.0)))
        );
    }

    #[test]
    fn test_coercion_failure_keeps_stage_value() {
        let stage = stage_with(&[("/World/A.count", AttributeSpec::new(ValueKind::Int))]);
        stage.set_attribute("/World/A.count", AttributeValue::Int(4)).unwrap();
        let model = model(&stage, &["/World/A.count"], ModelOptions::default());

        assert!(!model.set_value("four".into()));
        assert_eq!(model.get_value(), Some(AttributeValue::Int(4)));
        assert_eq!(stage.get(&SdfPath::new("/World/A.count")), Some(AttributeValue::Int(4)));
    }

    #[test]
    fn test_null_sentinel_is_always_rejected() {
        let stage = stage_with(&[("/World/A.label", AttributeSpec::new(ValueKind::String))]);
        let model = model(&stage, &["/World/A.label"], ModelOptions::default());
        assert!(!model.set_value(".".into()));
        assert!(stage.executed_commands().is_empty());

        // Blank strings are legitimate string values
        assert!(model.set_value("  ".into()));
        assert_eq!(model.get_value(), Some(AttributeValue::String("  ".into())));
    }

    #[test]
    fn test_same_value_notifies_without_writing() {
        let stage = stage_with(&[("/World/A.size", AttributeSpec::new(ValueKind::Double))]);
        let model = model(&stage, &["/World/A.size"], ModelOptions::default());
        let notified = Rc::new(Cell::new(0));
        let sink = notified.clone();
        let _subscription = model.subscribe_value_changed(move || sink.set(sink.get() + 1));

        assert!(!model.set_value(AttributeValue::Double(0.0)));
        assert_eq!(notified.get(), 1);
        assert!(stage.executed_commands().is_empty());
    }

    #[test]
    fn test_self_inflicted_notices_are_ignored_while_writing() {
        let stage = stage_with(&[("/World/A.size", AttributeSpec::new(ValueKind::Double))]);
        let model = Rc::new(model(&stage, &["/World/A.size"], ModelOptions::default()));
        let weak = Rc::downgrade(&model);
        let refreshed_during_write = Rc::new(Cell::new(false));
        let sink = refreshed_during_write.clone();
        let _subscription = stage.subscribe(Rc::new(move |_: &crate::stage::ObjectsChanged| {
            if let Some(model) = weak.upgrade() {
                sink.set(sink.get() || model.refresh());
            }
        }));

        assert!(model.set_value(AttributeValue::Double(3.0)));
        assert!(!refreshed_during_write.get());
        assert!(!model.ignore_refresh.get());
    }

    #[test]
    fn test_is_default_and_reset() {
        let stage = stage_with(&[
            ("/World/A.size", AttributeSpec::new(ValueKind::Double).schema_default(AttributeValue::Double(2.0))),
            ("/World/B.size", AttributeSpec::new(ValueKind::Double).custom_default(AttributeValue::Double(2.0))),
        ]);
        let model = model(&stage, &["/World/A.size", "/World/B.size"], ModelOptions::default());
        assert!(model.is_default());

        assert!(model.set_value(AttributeValue::Double(5.0)));
        assert!(!model.is_default());

        model.reset_default_value();
        assert!(model.is_default());
        assert_eq!(model.get_value(), Some(AttributeValue::Double(2.0)));
    }

    #[test]
    fn test_option_list() {
        let stage = stage_with(&[("/World/A.mode", AttributeSpec::new(ValueKind::Int))]);
        stage.set_attribute("/World/A.mode", AttributeValue::Int(1)).unwrap();
        let binding = AttributeBinding::new(stage.clone(), "", vec![SdfPath::new("/World/A.mode")]);
        let options = vec!["off".to_string(), "auto".to_string(), "on".to_string()];
        let model = AttributeValueModel::with_options(binding, options, ModelOptions::default());

        assert_eq!(model.value_as_string(), "auto");
        assert!(model.set_value("on".into()));
        assert_eq!(stage.get(&SdfPath::new("/World/A.mode")), Some(AttributeValue::Int(2)));
        assert!(!model.set_value("sometimes".into()));
        assert_eq!(model.value_as_string(), "on");
    }

    #[test]
    fn test_asset_without_color_space_is_not_validated() {
        let stage = stage_with(&[("/World/A.file", AttributeSpec::new(ValueKind::Asset))]);
        let model = model(&stage, &["/World/A.file"], ModelOptions::default());
        assert!(model.set_value(" ./missing.usda ".into()));
        assert_eq!(
            model.get_value(),
            Some(AttributeValue::Asset(AssetPath::new("./missing.usda")))
        );
        assert_eq!(model.value_as_string(), "./missing.usda");
    }

    #[test]
    fn test_texture_asset_resolves_against_edit_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wood.png"), b"png").unwrap();
        let stage = Rc::new(InMemoryStage::open(dir.path().join("scene.usda")));
        stage.define_prim("/World/Mat");
        stage
            .declare_attribute("/World/Mat.diffuse", AttributeSpec::new(ValueKind::Asset).color_space("auto"))
            .unwrap();
        let model = model(&stage, &["/World/Mat.diffuse"], ModelOptions::default());

        assert!(model.set_value("wood.png".into()));
        let Some(AttributeValue::Asset(asset)) = model.get_value() else {
            panic!("expected an asset value");
        };
        assert_eq!(asset.path, "wood.png");
        assert!(asset.resolved_path.ends_with("/wood.png"));
        assert!(!model.has_wrong_value());
    }

    #[test]
    #[should_panic]
    fn test_unsupported_asset_value_is_fatal() {
        let stage = stage_with(&[("/World/A.file", AttributeSpec::new(ValueKind::Asset))]);
        let model = model(&stage, &["/World/A.file"], ModelOptions::default());
        model.set_value(AttributeValue::Int(3));
    }

    #[test]
    fn test_not_implemented_is_read_only() {
        let stage = stage_with(&[("/World/A.size", AttributeSpec::new(ValueKind::Double))]);
        let model = model(&stage, &["/World/A.size"], ModelOptions::default().not_implemented());
        assert!(ItemValueModel::is_read_only(&model));
        assert!(!model.set_value(AttributeValue::Double(1.0)));
        assert!(stage.executed_commands().is_empty());
    }

    #[test]
    fn test_channel_value_round_trip() {
        let stage = stage_with(&[
            ("/World/A.color", AttributeSpec::new(ValueKind::Color3f)),
            ("/World/B.color", AttributeSpec::new(ValueKind::Color3f)),
        ]);
        stage
            .set_attribute("/World/A.color", AttributeValue::Color3f(Vec3::new(0.1, 0.2, 0.3)))
            .unwrap();
        let source = model(&stage, &["/World/A.color"], ModelOptions::default().channel(1));
        let target = model(&stage, &["/World/B.color"], ModelOptions::default().channel(1));

        let data = source.serialize_value().unwrap();
        assert!(target.deserialize_value(&data));
        assert_eq!(
            stage.get(&SdfPath::new("/World/B.color")),
            Some(AttributeValue::Color3f(Vec3::new(0.0, 0.2, 0.0)))
        );

        // Whole vectors are still accepted
        assert!(target.deserialize_value(&serde_json::json!({"type": "color3f", "value": [1.0, 0.5, 0.25]})));
        assert_eq!(
            stage.get(&SdfPath::new("/World/B.color")),
            Some(AttributeValue::Color3f(Vec3::new(1.0, 0.5, 0.25)))
        );
    }

    #[test]
    fn test_asset_value_round_trip_keeps_path() {
        let stage = stage_with(&[("/World/A.file", AttributeSpec::new(ValueKind::Asset))]);
        let model = model(&stage, &["/World/A.file"], ModelOptions::default());
        assert!(model.set_value("./ref.usda".into()));

        let data = model.serialize_value().unwrap();
        assert_eq!(data, serde_json::json!("./ref.usda"));
        model.deserialize_value(&data);
        assert_eq!(
            stage.get(&SdfPath::new("/World/A.file")),
            Some(AttributeValue::Asset(AssetPath::new("./ref.usda")))
        );
    }

    #[test]
    fn test_asset_value_round_trip_through_layer_directory() {
        let stage = Rc::new(InMemoryStage::open("/project/scene.usda"));
        stage.define_prim("/World/A");
        stage
            .declare_attribute("/World/A.file", AttributeSpec::new(ValueKind::Asset))
            .unwrap();
        let model = model(&stage, &["/World/A.file"], ModelOptions::default());
        assert!(model.set_value("./ref.usda".into()));

        let data = model.serialize_value().unwrap();
        assert_eq!(data, serde_json::json!("/project/ref.usda"));

        assert!(model.set_value("./other.usda".into()));
        assert!(model.deserialize_value(&data));
        assert_eq!(model.value_as_string(), "./ref.usda");
    }

    fn mixed_model(values: &[AttributeValue], settings: ModelOptions) -> AttributeValueModel {
        let stage = Rc::new(InMemoryStage::new());
        let mut paths = Vec::new();
        for (index, value) in values.iter().enumerate() {
            let prim = format!("/World/P{}", index);
            let path = format!("{}.value", prim);
            stage.define_prim(prim.as_str());
            stage
                .declare_attribute(path.as_str(), AttributeSpec::new(value.kind()))
                .unwrap();
            stage.set_attribute(path.as_str(), value.clone()).unwrap();
            paths.push(path);
        }
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        model(&stage, &paths, settings)
    }

    #[test]
    fn test_tooltip_truncates_to_summary_limit() {
        let values: Vec<AttributeValue> = (1..=27).map(|v| AttributeValue::Double(v as f64)).collect();
        let model = mixed_model(&values, ModelOptions::default());
        let tooltip = model.tooltip();
        assert!(tooltip.starts_with("Mixed Values: 1, 2, 3"));
        assert!(tooltip.ends_with(", 24, 25..."));

        let model = mixed_model(
            &values[..4],
            ModelOptions {
                tooltip_summary_limit: 2,
                ..ModelOptions::default()
            },
        );
        assert_eq!(model.tooltip(), "Mixed Values: 1, 2...");
    }

    #[test]
    fn test_tooltip_lists_long_values_on_separate_lines() {
        let values = [
            AttributeValue::String("textures/wood_albedo.png".into()),
            AttributeValue::String("textures/oak.png".into()),
        ];
        let model = mixed_model(&values, ModelOptions::default());
        assert_eq!(
            model.tooltip(),
            "Mixed Values: \ntextures/wood_albedo.png\ntextures/oak.png"
        );
    }

    /// Counts every command sent to the stage, accepted or not
    struct RecordingStage {
        inner: InMemoryStage,
        attempts: Cell<usize>,
    }

    impl Stage for RecordingStage {
        fn id(&self) -> crate::stage::StageId {
            self.inner.id()
        }

        fn is_prim_valid(&self, prim_path: &SdfPath) -> bool {
            self.inner.is_prim_valid(prim_path)
        }

        fn attribute_info(&self, attribute_path: &SdfPath) -> Option<crate::stage::AttributeInfo> {
            self.inner.attribute_info(attribute_path)
        }

        fn get(&self, attribute_path: &SdfPath) -> Option<AttributeValue> {
            self.inner.get(attribute_path)
        }

        fn default_value(&self, attribute_path: &SdfPath) -> Option<AttributeValue> {
            self.inner.default_value(attribute_path)
        }

        fn property_stack(&self, attribute_path: &SdfPath) -> Vec<crate::stage::Layer> {
            self.inner.property_stack(attribute_path)
        }

        fn root_layer(&self) -> crate::stage::Layer {
            self.inner.root_layer()
        }

        fn edit_target(&self) -> crate::stage::Layer {
            self.inner.edit_target()
        }

        fn find_defining_session_layer(&self, prim_path: &SdfPath) -> Option<crate::stage::Layer> {
            self.inner.find_defining_session_layer(prim_path)
        }

        fn execute(&self, command: crate::stage::StageCommand) -> Result<(), crate::error::StageError> {
            self.attempts.set(self.attempts.get() + 1);
            self.inner.execute(command)
        }

        fn subscribe(&self, callback: crate::stage::NoticeCallback) -> Subscription {
            self.inner.subscribe(callback)
        }
    }

    #[test]
    fn test_uncoercible_value_is_never_sent() {
        let inner = InMemoryStage::new();
        inner.define_prim("/World/A");
        inner
            .declare_attribute("/World/A.count", AttributeSpec::new(ValueKind::Int))
            .unwrap();
        let stage = Rc::new(RecordingStage {
            inner,
            attempts: Cell::new(0),
        });
        let binding = AttributeBinding::new(stage.clone(), "", vec![SdfPath::new("/World/A.count")]);
        let model = AttributeValueModel::new(binding, ModelOptions::default());

        assert!(!model.set_value("four".into()));
        assert_eq!(stage.attempts.get(), 0);
        assert!(model.set_value("4".into()));
        assert_eq!(stage.attempts.get(), 1);
    }
}
