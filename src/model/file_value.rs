//! Read-only models over file metadata

use std::cell::RefCell;
use std::path::PathBuf;

use crate::events::{Event, Subscription};
use crate::stage::AttributeValue;

use super::ItemValueModel;

/// Metadata field of a file shown by [`FileAttributeValueModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAttribute {
    Name,
    /// Size in bytes
    Size,
    /// Last modification time, RFC 3339
    Modified,
    ReadOnly,
}

impl std::fmt::Display for FileAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileAttribute::Name => write!(f, "Name"),
            FileAttribute::Size => write!(f, "Size"),
            FileAttribute::Modified => write!(f, "Modified"),
            FileAttribute::ReadOnly => write!(f, "Read Only"),
        }
    }
}

/// One metadata field of a file, re-read on refresh
pub struct FileAttributeValueModel {
    path: PathBuf,
    attribute: FileAttribute,
    value: RefCell<Option<AttributeValue>>,
    value_changed: Event<()>,
}

impl FileAttributeValueModel {
    pub fn new(path: impl Into<PathBuf>, attribute: FileAttribute) -> Self {
        let model = Self {
            path: path.into(),
            attribute,
            value: RefCell::new(None),
            value_changed: Event::new(),
        };
        model.read_value_from_file();
        model
    }

    pub fn attribute(&self) -> FileAttribute {
        self.attribute
    }

    /// Returns true if the cached value was updated
    fn read_value_from_file(&self) -> bool {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return false,
        };
        let value = match self.attribute {
            FileAttribute::Name => self
                .path
                .file_name()
                .map(|name| AttributeValue::String(name.to_string_lossy().into_owned())),
            FileAttribute::Size => Some(AttributeValue::Double(metadata.len() as f64)),
            FileAttribute::Modified => metadata
                .modified()
                .ok()
                .map(|time| AttributeValue::String(chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339())),
            FileAttribute::ReadOnly => Some(AttributeValue::Bool(metadata.permissions().readonly())),
        };
        let Some(value) = value else {
            return false;
        };
        let mut cached = self.value.borrow_mut();
        if cached.as_ref() == Some(&value) {
            return false;
        }
        *cached = Some(value);
        true
    }
}

impl ItemValueModel for FileAttributeValueModel {
    fn get_value(&self) -> Option<AttributeValue> {
        self.value.borrow().clone()
    }

    fn set_value(&self, _value: AttributeValue) -> bool {
        false
    }

    fn value_as_string(&self) -> String {
        self.value.borrow().as_ref().map(ToString::to_string).unwrap_or_default()
    }

    fn refresh(&self) -> bool {
        let changed = self.read_value_from_file();
        if changed {
            self.value_changed.emit(&());
        }
        changed
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.value_changed.subscribe(move |_| callback())
    }
}

/// Caller-provided value displayed next to file metadata
pub struct CustomFileAttributeValueModel {
    value: RefCell<AttributeValue>,
    /// Line count of a multiline field, `None` for single line
    multiline: Option<usize>,
    value_changed: Event<()>,
}

impl CustomFileAttributeValueModel {
    pub fn new(value: AttributeValue) -> Self {
        Self {
            value: RefCell::new(value),
            multiline: None,
            value_changed: Event::new(),
        }
    }

    pub fn multiline(mut self, lines: usize) -> Self {
        self.multiline = Some(lines);
        self
    }

    pub fn multiline_lines(&self) -> Option<usize> {
        self.multiline
    }
}

impl ItemValueModel for CustomFileAttributeValueModel {
    fn get_value(&self) -> Option<AttributeValue> {
        Some(self.value.borrow().clone())
    }

    fn set_value(&self, value: AttributeValue) -> bool {
        if *self.value.borrow() == value {
            return false;
        }
        *self.value.borrow_mut() = value;
        self.value_changed.emit(&());
        true
    }

    fn value_as_string(&self) -> String {
        match &*self.value.borrow() {
            AttributeValue::String(text) | AttributeValue::Token(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn subscribe_value_changed(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.value_changed.subscribe(move |_| callback())
    }
}
