//! USD property models
//!
//! Value models binding property widgets to attributes of one or more prims
//! on a live stage, a listener keeping them in sync with scene changes and
//! a file picker widget.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod listener;
pub mod model;
pub mod panel;
pub mod path_utils;
pub mod picker;
pub mod stage;

// Re-export commonly used types
pub use config::PropertyConfig;
pub use error::{CoercionError, ConfigError, StageError};
pub use events::{Event, Subscription};
pub use listener::{ListenedModel, UsdListener};
pub use model::{
    AttributeBinding, AttributeNameModel, AttributeValueModel, ItemValueModel, ModelOptions,
    VirtualAttributeNameModel, VirtualAttributeValueModel,
};
pub use panel::PropertyPanel;
pub use picker::FilePickerWidget;
pub use stage::{AttributeValue, InMemoryStage, SdfPath, Stage, StageHandle, ValueKind};
