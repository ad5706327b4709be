//! Scene engine interface
//!
//! Models and listeners never own the scene graph. They hold a
//! [`StageHandle`] handed to them at construction, read through the
//! [`Stage`] trait, and mutate exclusively through [`StageCommand`]s.

pub mod memory;
mod path;
mod value;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use uuid::Uuid;

use crate::error::StageError;
use crate::events::Subscription;

pub use memory::{AttributeSpec, InMemoryStage};
pub use path::{SdfPath, PROPERTY_SEPARATOR};
pub use value::{AssetPath, AttributeValue, ValueKind};

/// Identity of an open stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(Uuid);

impl StageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::new()
    }
}

/// One layer of a stage's composition stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub identifier: String,
    /// File backing the layer, `None` for anonymous layers
    pub real_path: Option<PathBuf>,
}

impl Layer {
    pub fn anonymous(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            real_path: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            identifier: path.display().to_string(),
            real_path: Some(path),
        }
    }

    /// Directory relative asset paths are resolved against
    pub fn directory(&self) -> Option<&Path> {
        self.real_path.as_deref().and_then(Path::parent)
    }

    /// Anchor an asset path to this layer
    pub fn compute_absolute_path(&self, asset_path: &str) -> String {
        let path = Path::new(asset_path);
        if asset_path.is_empty() || path.is_absolute() || asset_path.contains("://") {
            return asset_path.to_string();
        }
        match self.directory() {
            Some(directory) => directory.join(path).display().to_string(),
            None => asset_path.to_string(),
        }
    }
}

/// Metadata of an attribute relevant to editing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMetadata {
    /// Set on texture attributes; their paths are validated before writing
    pub color_space: Option<String>,
    pub display_name: Option<String>,
}

/// What a stage knows about an existing attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub kind: ValueKind,
    pub hidden: bool,
    pub metadata: AttributeMetadata,
}

/// Undoable edit executed by the scene engine
#[derive(Debug, Clone, PartialEq)]
pub enum StageCommand {
    /// Author `value` on an existing attribute in `target_layer`
    ChangeProperty {
        prop_path: SdfPath,
        value: AttributeValue,
        target_layer: String,
        context_name: String,
    },
    /// Create an attribute on an existing prim in the edit target
    CreateAttribute {
        prim_path: SdfPath,
        attr_name: String,
        kind: ValueKind,
        value: AttributeValue,
    },
}

/// Mutation notice sent to subscribers after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectsChanged {
    /// Structural changes: prims or properties added, removed or reparented
    pub resynced_paths: Vec<SdfPath>,
    /// Value edits that leave the structure untouched
    pub changed_info_only_paths: Vec<SdfPath>,
}

pub type NoticeCallback = Rc<dyn Fn(&ObjectsChanged)>;

/// Scene engine collaborator
pub trait Stage {
    fn id(&self) -> StageId;

    fn is_prim_valid(&self, prim_path: &SdfPath) -> bool;

    /// Declaration of the attribute, `None` if it doesn't exist
    fn attribute_info(&self, attribute_path: &SdfPath) -> Option<AttributeInfo>;

    /// Composed value of the attribute
    fn get(&self, attribute_path: &SdfPath) -> Option<AttributeValue>;

    /// Engine-level default of the attribute
    fn default_value(&self, attribute_path: &SdfPath) -> Option<AttributeValue>;

    /// Layers holding an opinion for the attribute, strongest first
    fn property_stack(&self, attribute_path: &SdfPath) -> Vec<Layer>;

    fn root_layer(&self) -> Layer;

    fn edit_target(&self) -> Layer;

    /// Strongest session-stack layer where the prim is defined (not just overridden)
    fn find_defining_session_layer(&self, prim_path: &SdfPath) -> Option<Layer>;

    fn execute(&self, command: StageCommand) -> Result<(), StageError>;

    /// Register for change notices until the subscription is dropped
    fn subscribe(&self, callback: NoticeCallback) -> Subscription;
}

pub type StageHandle = Rc<dyn Stage>;
