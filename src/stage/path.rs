//! Scene paths addressing prims and their properties

use serde::{Deserialize, Serialize};

/// Separator between a prim path and a property name
pub const PROPERTY_SEPARATOR: char = '.';

/// Absolute path of a prim (`/World/Cube`) or a property (`/World/Cube.size`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SdfPath(String);

impl SdfPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Byte offset of the property separator, only looked up in the last element
    fn separator_index(&self) -> Option<usize> {
        let last_element = self.0.rfind('/').map(|i| i + 1).unwrap_or(0);
        self.0[last_element..]
            .find(PROPERTY_SEPARATOR)
            .map(|i| last_element + i)
    }

    /// True if the path addresses a property rather than a prim
    pub fn is_property_path(&self) -> bool {
        self.separator_index().is_some()
    }

    /// The prim owning this path (the path itself for prim paths)
    pub fn prim_path(&self) -> SdfPath {
        match self.separator_index() {
            Some(index) => SdfPath(self.0[..index].to_string()),
            None => self.clone(),
        }
    }

    /// Property name for property paths, last element for prim paths
    pub fn name(&self) -> &str {
        match self.separator_index() {
            Some(index) => &self.0[index + 1..],
            None => self.0.rsplit('/').next().unwrap_or(""),
        }
    }

    /// Parent prim, `None` for the pseudo-root
    pub fn parent(&self) -> Option<SdfPath> {
        if self.is_property_path() {
            return Some(self.prim_path());
        }
        match self.0.rfind('/') {
            Some(0) if self.0.len() > 1 => Some(SdfPath::new("/")),
            Some(0) | None => None,
            Some(index) => Some(SdfPath(self.0[..index].to_string())),
        }
    }

    /// Path of the property `name` on this prim
    pub fn append_property(&self, name: &str) -> SdfPath {
        SdfPath(format!("{}{}{}", self.prim_path().0, PROPERTY_SEPARATOR, name))
    }
}

impl std::fmt::Display for SdfPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SdfPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SdfPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}
