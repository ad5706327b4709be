//! Value models bridging property widgets and stage attributes
//!
//! Widgets only talk to [`ItemValueModel`]. Attribute-backed models keep a
//! cached display value in sync with one or more attributes, other models
//! (names, file metadata) share the same surface so a panel can render a
//! row without knowing where its data comes from.

mod attr_name;
mod attr_value;
mod binding;
mod file_value;
mod serialize;
mod virtual_value;

pub use attr_name::{AttributeNameModel, VirtualAttributeNameModel};
pub use attr_value::{AttributeValueModel, ModelOptions};
pub use binding::AttributeBinding;
pub use file_value::{CustomFileAttributeValueModel, FileAttribute, FileAttributeValueModel};
pub use serialize::ValueSerializer;
pub use virtual_value::{CreateCallback, VirtualAttributeValueModel};

use crate::events::Subscription;
use crate::stage::{AttributeValue, ValueKind};

/// Model behind a single property widget
pub trait ItemValueModel {
    /// Value in the form the widget edits, `None` when nothing was read yet
    fn get_value(&self) -> Option<AttributeValue>;

    /// Push a widget value, returns whether the underlying data changed
    fn set_value(&self, value: AttributeValue) -> bool;

    fn value_as_string(&self) -> String;

    fn tooltip(&self) -> String {
        self.value_as_string()
    }

    /// Re-read the source, returns whether the value changed
    fn refresh(&self) -> bool {
        false
    }

    fn begin_edit(&self) {}

    fn end_edit(&self) {}

    fn is_read_only(&self) -> bool {
        false
    }

    fn is_default(&self) -> bool {
        true
    }

    fn is_mixed(&self) -> bool {
        false
    }

    fn is_overriden(&self) -> bool {
        false
    }

    fn reset_default_value(&self) {}

    /// Kind of the values accepted by `set_value`, `None` for free text
    fn widget_kind(&self) -> Option<ValueKind> {
        None
    }

    /// Choices of list-backed models
    fn options(&self) -> Option<Vec<String>> {
        None
    }

    /// Called every time the displayed value should be repainted
    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription;
}
