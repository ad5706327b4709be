//! In-process stage with layered opinions and undo
//!
//! Layers are kept strongest first: the session layer and its sublayers,
//! then the root layer and its sublayers. Every mutation notifies the
//! subscribers synchronously, after the internal borrow is released, so
//! callbacks are free to read the stage again.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::StageError;
use crate::events::Subscription;

use super::{
    AttributeInfo, AttributeMetadata, AttributeValue, Layer, NoticeCallback, ObjectsChanged, SdfPath, Stage,
    StageCommand, StageId, ValueKind,
};

const SESSION_LAYER: &str = "anon:session.usda";
const ROOT_LAYER: &str = "anon:root.usda";

/// How a layer declares a prim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier {
    Def,
    Over,
}

/// Declaration of an attribute: its kind, visibility and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub kind: ValueKind,
    pub hidden: bool,
    pub metadata: AttributeMetadata,
    /// Default stored in the attribute's custom data, wins over the schema default
    pub custom_default: Option<AttributeValue>,
    /// Fallback declared by the prim's schema
    pub schema_default: Option<AttributeValue>,
}

impl AttributeSpec {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            hidden: false,
            metadata: AttributeMetadata::default(),
            custom_default: None,
            schema_default: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn color_space(mut self, color_space: impl Into<String>) -> Self {
        self.metadata.color_space = Some(color_space.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.metadata.display_name = Some(display_name.into());
        self
    }

    pub fn custom_default(mut self, value: AttributeValue) -> Self {
        self.custom_default = Some(value);
        self
    }

    pub fn schema_default(mut self, value: AttributeValue) -> Self {
        self.schema_default = Some(value);
        self
    }

    fn default_value(&self) -> AttributeValue {
        self.custom_default
            .clone()
            .or_else(|| self.schema_default.clone())
            .unwrap_or_else(|| self.kind.zero_value())
    }
}

struct LayerData {
    layer: Layer,
    prims: HashMap<SdfPath, Specifier>,
    values: HashMap<SdfPath, AttributeValue>,
}

impl LayerData {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            prims: HashMap::new(),
            values: HashMap::new(),
        }
    }
}

/// Layers are recorded by identifier, inserting sublayers shifts indices
enum UndoEntry {
    Value {
        layer: String,
        path: SdfPath,
        previous: Option<AttributeValue>,
    },
    Created {
        layer: String,
        path: SdfPath,
    },
}

struct StageData {
    layers: Vec<LayerData>,
    /// Number of layers belonging to the session stack, the root layer follows them
    session_layer_count: usize,
    edit_target: usize,
    attributes: HashMap<SdfPath, AttributeSpec>,
    history: Vec<UndoEntry>,
    executed: Vec<StageCommand>,
}

impl StageData {
    fn layer_index(&self, identifier: &str) -> Result<usize, StageError> {
        self.layers
            .iter()
            .position(|data| data.layer.identifier == identifier)
            .ok_or_else(|| StageError::UnknownLayer(identifier.to_string()))
    }

    fn is_prim_valid(&self, prim_path: &SdfPath) -> bool {
        self.layers.iter().any(|data| data.prims.contains_key(prim_path))
    }

    fn attribute(&self, path: &SdfPath) -> Option<&AttributeSpec> {
        if !path.is_property_path() || !self.is_prim_valid(&path.prim_path()) {
            return None;
        }
        self.attributes.get(path)
    }

    fn check_kind(&self, path: &SdfPath, value: &AttributeValue) -> Result<(), StageError> {
        let spec = self
            .attribute(path)
            .ok_or_else(|| StageError::UnknownAttribute(path.clone()))?;
        if spec.kind != value.kind() {
            return Err(StageError::KindMismatch {
                path: path.clone(),
                expected: spec.kind,
                actual: value.kind(),
            });
        }
        Ok(())
    }
}

type SubscriberList = Rc<RefCell<Vec<(u64, NoticeCallback)>>>;

/// Stage living entirely in memory
pub struct InMemoryStage {
    id: StageId,
    data: RefCell<StageData>,
    subscribers: SubscriberList,
    next_subscriber: Cell<u64>,
}

impl InMemoryStage {
    /// Stage with an anonymous session layer and an anonymous root layer
    pub fn new() -> Self {
        Self::with_root_layer(Layer::anonymous(ROOT_LAYER))
    }

    pub fn with_root_layer(root: Layer) -> Self {
        Self {
            id: StageId::new(),
            data: RefCell::new(StageData {
                layers: vec![LayerData::new(Layer::anonymous(SESSION_LAYER)), LayerData::new(root)],
                session_layer_count: 1,
                edit_target: 1,
                attributes: HashMap::new(),
                history: Vec::new(),
                executed: Vec::new(),
            }),
            subscribers: Rc::new(RefCell::new(Vec::new())),
            next_subscriber: Cell::new(0),
        }
    }

    /// Stage whose root layer is backed by a file, so relative assets resolve
    pub fn open(root_path: impl Into<PathBuf>) -> Self {
        Self::with_root_layer(Layer::from_file(root_path))
    }

    /// Add a sublayer below every existing layer of the root stack
    pub fn add_sublayer(&self, layer: Layer) {
        self.data.borrow_mut().layers.push(LayerData::new(layer));
    }

    /// Add a sublayer at the bottom of the session stack
    pub fn add_session_sublayer(&self, layer: Layer) {
        let mut data = self.data.borrow_mut();
        let index = data.session_layer_count;
        data.layers.insert(index, LayerData::new(layer));
        data.session_layer_count += 1;
        if data.edit_target >= index {
            data.edit_target += 1;
        }
    }

    pub fn session_layer(&self) -> Layer {
        self.data.borrow().layers[0].layer.clone()
    }

    pub fn set_edit_target(&self, identifier: &str) -> Result<(), StageError> {
        let mut data = self.data.borrow_mut();
        let index = data.layer_index(identifier)?;
        data.edit_target = index;
        Ok(())
    }

    /// Define a prim in the root layer
    pub fn define_prim(&self, path: impl Into<SdfPath>) {
        let path = path.into();
        {
            let mut data = self.data.borrow_mut();
            let root = data.session_layer_count;
            data.layers[root].prims.insert(path.clone(), Specifier::Def);
        }
        self.emit_resync(path);
    }

    /// Author a prim spec in a specific layer
    pub fn author_prim(&self, layer: &str, path: impl Into<SdfPath>, specifier: Specifier) -> Result<(), StageError> {
        let path = path.into();
        {
            let mut data = self.data.borrow_mut();
            let index = data.layer_index(layer)?;
            data.layers[index].prims.insert(path.clone(), specifier);
        }
        self.emit_resync(path);
        Ok(())
    }

    /// Remove the prim and everything below it from every layer
    pub fn remove_prim(&self, path: impl Into<SdfPath>) {
        let path = path.into();
        let child_prefix = format!("{}/", path);
        let property_prefix = format!("{}.", path);
        let owned = |candidate: &SdfPath| {
            candidate == &path
                || candidate.as_str().starts_with(&child_prefix)
                || candidate.as_str().starts_with(&property_prefix)
        };
        {
            let mut data = self.data.borrow_mut();
            for layer in data.layers.iter_mut() {
                layer.prims.retain(|prim, _| !owned(prim));
                layer.values.retain(|attr, _| !owned(attr));
            }
            data.attributes.retain(|attr, _| !owned(attr));
        }
        self.emit_resync(path);
    }

    /// Declare an attribute on an existing prim
    pub fn declare_attribute(&self, path: impl Into<SdfPath>, spec: AttributeSpec) -> Result<(), StageError> {
        let path = path.into();
        {
            let mut data = self.data.borrow_mut();
            let prim_path = path.prim_path();
            if !path.is_property_path() || !data.is_prim_valid(&prim_path) {
                return Err(StageError::UnknownPrim(prim_path));
            }
            data.attributes.insert(path.clone(), spec);
        }
        self.emit_resync(path);
        Ok(())
    }

    pub fn remove_attribute(&self, path: impl Into<SdfPath>) {
        let path = path.into();
        {
            let mut data = self.data.borrow_mut();
            data.attributes.remove(&path);
            for layer in data.layers.iter_mut() {
                layer.values.remove(&path);
            }
        }
        self.emit_resync(path);
    }

    /// Author a value in the edit target outside of the command history
    pub fn set_attribute(&self, path: impl Into<SdfPath>, value: AttributeValue) -> Result<(), StageError> {
        let identifier = self.edit_target().identifier;
        self.set_attribute_in(&identifier, path, value)
    }

    pub fn set_attribute_in(
        &self,
        layer: &str,
        path: impl Into<SdfPath>,
        value: AttributeValue,
    ) -> Result<(), StageError> {
        let path = path.into();
        {
            let mut data = self.data.borrow_mut();
            data.check_kind(&path, &value)?;
            let index = data.layer_index(layer)?;
            data.layers[index].values.insert(path.clone(), value);
        }
        self.emit(&ObjectsChanged {
            changed_info_only_paths: vec![path],
            ..Default::default()
        });
        Ok(())
    }

    /// Revert the last executed command
    pub fn undo(&self) -> Result<(), StageError> {
        let entry = self.data.borrow_mut().history.pop().ok_or(StageError::NothingToUndo)?;
        match entry {
            UndoEntry::Value { layer, path, previous } => {
                {
                    let mut data = self.data.borrow_mut();
                    let layer_index = data.layer_index(&layer)?;
                    let values = &mut data.layers[layer_index].values;
                    match previous {
                        Some(previous) => values.insert(path.clone(), previous),
                        None => values.remove(&path),
                    };
                }
                self.emit(&ObjectsChanged {
                    changed_info_only_paths: vec![path],
                    ..Default::default()
                });
            }
            UndoEntry::Created { layer, path } => {
                {
                    let mut data = self.data.borrow_mut();
                    let layer_index = data.layer_index(&layer)?;
                    data.attributes.remove(&path);
                    data.layers[layer_index].values.remove(&path);
                }
                self.emit_resync(path);
            }
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.data.borrow().history.is_empty()
    }

    /// Every command executed so far, oldest first
    pub fn executed_commands(&self) -> Vec<StageCommand> {
        self.data.borrow().executed.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver a notice to every subscriber
    pub fn emit(&self, notice: &ObjectsChanged) {
        let snapshot: Vec<NoticeCallback> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback(notice);
        }
    }

    fn emit_resync(&self, path: SdfPath) {
        self.emit(&ObjectsChanged {
            resynced_paths: vec![path],
            ..Default::default()
        });
    }

    fn change_property(&self, prop_path: &SdfPath, value: AttributeValue, target_layer: &str) -> Result<(), StageError> {
        let mut data = self.data.borrow_mut();
        data.check_kind(prop_path, &value)?;
        let layer_index = data.layer_index(target_layer)?;
        let previous = data.layers[layer_index].values.insert(prop_path.clone(), value);
        let layer = data.layers[layer_index].layer.identifier.clone();
        data.history.push(UndoEntry::Value {
            layer,
            path: prop_path.clone(),
            previous,
        });
        Ok(())
    }

    fn create_attribute(&self, prim_path: &SdfPath, attr_name: &str, kind: ValueKind, value: AttributeValue) -> Result<SdfPath, StageError> {
        let mut data = self.data.borrow_mut();
        if !data.is_prim_valid(prim_path) {
            return Err(StageError::UnknownPrim(prim_path.clone()));
        }
        let path = prim_path.append_property(attr_name);
        if data.attributes.contains_key(&path) {
            return Err(StageError::AttributeExists(path));
        }
        if value.kind() != kind {
            return Err(StageError::KindMismatch {
                path,
                expected: kind,
                actual: value.kind(),
            });
        }
        let layer_index = data.edit_target;
        data.attributes.insert(path.clone(), AttributeSpec::new(kind));
        data.layers[layer_index].values.insert(path.clone(), value);
        let layer = data.layers[layer_index].layer.identifier.clone();
        data.history.push(UndoEntry::Created {
            layer,
            path: path.clone(),
        });
        Ok(path)
    }
}

impl Default for InMemoryStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for InMemoryStage {
    fn id(&self) -> StageId {
        self.id
    }

    fn is_prim_valid(&self, prim_path: &SdfPath) -> bool {
        self.data.borrow().is_prim_valid(prim_path)
    }

    fn attribute_info(&self, attribute_path: &SdfPath) -> Option<AttributeInfo> {
        let data = self.data.borrow();
        data.attribute(attribute_path).map(|spec| AttributeInfo {
            kind: spec.kind,
            hidden: spec.hidden,
            metadata: spec.metadata.clone(),
        })
    }

    fn get(&self, attribute_path: &SdfPath) -> Option<AttributeValue> {
        let data = self.data.borrow();
        let spec = data.attribute(attribute_path)?;
        data.layers
            .iter()
            .find_map(|layer| layer.values.get(attribute_path).cloned())
            .or_else(|| Some(spec.default_value()))
    }

    fn default_value(&self, attribute_path: &SdfPath) -> Option<AttributeValue> {
        self.data.borrow().attribute(attribute_path).map(AttributeSpec::default_value)
    }

    fn property_stack(&self, attribute_path: &SdfPath) -> Vec<Layer> {
        self.data
            .borrow()
            .layers
            .iter()
            .filter(|layer| layer.values.contains_key(attribute_path))
            .map(|layer| layer.layer.clone())
            .collect()
    }

    fn root_layer(&self) -> Layer {
        let data = self.data.borrow();
        data.layers[data.session_layer_count].layer.clone()
    }

    fn edit_target(&self) -> Layer {
        let data = self.data.borrow();
        data.layers[data.edit_target].layer.clone()
    }

    fn find_defining_session_layer(&self, prim_path: &SdfPath) -> Option<Layer> {
        let data = self.data.borrow();
        data.layers[..data.session_layer_count]
            .iter()
            .find(|layer| layer.prims.get(prim_path) == Some(&Specifier::Def))
            .map(|layer| layer.layer.clone())
    }

    fn execute(&self, command: StageCommand) -> Result<(), StageError> {
        let notice = match &command {
            StageCommand::ChangeProperty {
                prop_path,
                value,
                target_layer,
                ..
            } => {
                self.change_property(prop_path, value.clone(), target_layer)?;
                ObjectsChanged {
                    changed_info_only_paths: vec![prop_path.clone()],
                    ..Default::default()
                }
            }
            StageCommand::CreateAttribute {
                prim_path,
                attr_name,
                kind,
                value,
            } => {
                let path = self.create_attribute(prim_path, attr_name, *kind, value.clone())?;
                ObjectsChanged {
                    resynced_paths: vec![path],
                    ..Default::default()
                }
            }
        };
        log::debug!("Executed {:?}", command);
        self.data.borrow_mut().executed.push(command);
        self.emit(&notice);
        Ok(())
    }

    fn subscribe(&self, callback: NoticeCallback) -> Subscription {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers.borrow_mut().push((id, callback));
        let subscribers = Rc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.borrow_mut().retain(|(subscriber, _)| *subscriber != id);
            }
        })
    }
}
