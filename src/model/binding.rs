//! Live binding of a model to a set of attribute paths

use crate::error::StageError;
use crate::stage::{
    AttributeInfo, AttributeMetadata, AttributeValue, Layer, SdfPath, StageCommand, StageHandle, ValueKind,
};

/// Stage handle plus the fixed, ordered attribute paths a model edits
#[derive(Clone)]
pub struct AttributeBinding {
    stage: StageHandle,
    context_name: String,
    attribute_paths: Vec<SdfPath>,
}

impl AttributeBinding {
    pub fn new(stage: StageHandle, context_name: impl Into<String>, attribute_paths: Vec<SdfPath>) -> Self {
        Self {
            stage,
            context_name: context_name.into(),
            attribute_paths,
        }
    }

    pub fn stage(&self) -> &StageHandle {
        &self.stage
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn attribute_paths(&self) -> &[SdfPath] {
        &self.attribute_paths
    }

    /// Declaration of an attribute that exists on a valid prim
    pub fn writable_info(&self, path: &SdfPath) -> Option<AttributeInfo> {
        if !self.stage.is_prim_valid(&path.prim_path()) {
            return None;
        }
        self.stage.attribute_info(path)
    }

    /// Same as [`Self::writable_info`], hidden attributes excluded
    pub fn readable_info(&self, path: &SdfPath) -> Option<AttributeInfo> {
        self.writable_info(path).filter(|info| !info.hidden)
    }

    /// Unconverted scene value of the n-th bound path
    pub fn raw_value(&self, index: usize) -> Option<AttributeValue> {
        let path = self.attribute_paths.get(index)?;
        self.readable_info(path)?;
        self.stage.get(path)
    }

    /// Metadata of the first bound attribute that exists
    pub fn metadata(&self) -> AttributeMetadata {
        self.attribute_paths
            .iter()
            .find_map(|path| self.writable_info(path))
            .map(|info| info.metadata)
            .unwrap_or_default()
    }

    /// Declared kind of the first bound attribute that exists
    pub fn declared_kind(&self) -> Option<ValueKind> {
        self.attribute_paths
            .iter()
            .find_map(|path| self.writable_info(path))
            .map(|info| info.kind)
    }

    pub fn default_value(&self, path: &SdfPath) -> Option<AttributeValue> {
        self.writable_info(path)?;
        self.stage.default_value(path)
    }

    /// Whether any bound attribute has an opinion outside of the root layer
    pub fn is_overriden(&self) -> bool {
        let root = self.stage.root_layer();
        self.attribute_paths
            .iter()
            .filter(|path| self.writable_info(path).is_some())
            .any(|path| {
                self.stage
                    .property_stack(path)
                    .iter()
                    .any(|layer| layer.identifier != root.identifier)
            })
    }

    /// Layer receiving edits of the attribute.
    /// Prims defined in the session stack are edited there, so the edit isn't shadowed.
    pub fn target_layer(&self, path: &SdfPath) -> Layer {
        self.stage
            .find_defining_session_layer(&path.prim_path())
            .unwrap_or_else(|| self.stage.edit_target())
    }

    pub fn change_property(&self, path: &SdfPath, value: AttributeValue) -> Result<(), StageError> {
        let target_layer = self.target_layer(path);
        self.stage.execute(StageCommand::ChangeProperty {
            prop_path: path.clone(),
            value,
            target_layer: target_layer.identifier,
            context_name: self.context_name.clone(),
        })
    }

    pub fn create_attribute(&self, path: &SdfPath, kind: ValueKind, value: AttributeValue) -> Result<(), StageError> {
        self.stage.execute(StageCommand::CreateAttribute {
            prim_path: path.prim_path(),
            attr_name: path.name().to_string(),
            kind,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::memory::Specifier;
    use crate::stage::{AttributeSpec, InMemoryStage, Stage};
    use std::rc::Rc;

    fn binding() -> (Rc<InMemoryStage>, AttributeBinding) {
        let stage = Rc::new(InMemoryStage::new());
        stage.define_prim("/World/A");
        stage.define_prim("/World/B");
        stage
            .declare_attribute("/World/A.size", AttributeSpec::new(ValueKind::Double))
            .unwrap();
        stage
            .declare_attribute("/World/B.size", AttributeSpec::new(ValueKind::Double).hidden())
            .unwrap();
        let binding = AttributeBinding::new(
            stage.clone(),
            "",
            vec![SdfPath::new("/World/A.size"), SdfPath::new("/World/B.size")],
        );
        (stage, binding)
    }

    #[test]
    fn test_hidden_attributes_are_writable_but_not_readable() {
        let (_stage, binding) = binding();
        let hidden = SdfPath::new("/World/B.size");
        assert!(binding.writable_info(&hidden).is_some());
        assert!(binding.readable_info(&hidden).is_none());
        assert_eq!(binding.raw_value(0), Some(AttributeValue::Double(0.0)));
        assert_eq!(binding.raw_value(1), None);
        assert_eq!(binding.raw_value(2), None);
    }

    #[test]
    fn test_overriden_outside_root_layer() {
        let (stage, binding) = binding();
        let path = SdfPath::new("/World/A.size");
        stage.set_attribute(path.clone(), AttributeValue::Double(1.0)).unwrap();
        assert!(!binding.is_overriden());

        stage
            .set_attribute_in(&stage.session_layer().identifier, path, AttributeValue::Double(2.0))
            .unwrap();
        assert!(binding.is_overriden());
    }

    #[test]
    fn test_target_layer_prefers_defining_session_layer() {
        let (stage, binding) = binding();
        let path = SdfPath::new("/World/A.size");
        assert_eq!(binding.target_layer(&path), stage.edit_target());

        let session = stage.session_layer();
        stage.author_prim(&session.identifier, "/World/A", Specifier::Def).unwrap();
        assert_eq!(binding.target_layer(&path), session);

        binding.change_property(&path, AttributeValue::Double(3.0)).unwrap();
        assert_eq!(stage.property_stack(&path), vec![session]);
    }
}
