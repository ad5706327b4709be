//! Persistence form of attribute values, independent from the live binding

use std::path::Path;

use serde_json::{json, Value};

use crate::error::CoercionError;
use crate::path_utils::{make_relative_to_layer, normalize_path};
use crate::stage::{AssetPath, AttributeValue, StageHandle, ValueKind};

/// Converts model values to and from JSON
#[derive(Clone)]
pub struct ValueSerializer {
    stage: StageHandle,
}

impl ValueSerializer {
    pub fn new(stage: StageHandle) -> Self {
        Self { stage }
    }

    pub fn serialize(&self, value: &AttributeValue) -> Value {
        match value {
            AttributeValue::Bool(b) => json!(b),
            AttributeValue::Int(i) => json!(i),
            AttributeValue::Float(f) => json!(f),
            AttributeValue::Double(d) => json!(d),
            AttributeValue::String(s) | AttributeValue::Token(s) => json!(s),
            AttributeValue::Asset(asset) => json!(self.resolve_asset(asset)),
            AttributeValue::Float2(_)
            | AttributeValue::Float3(_)
            | AttributeValue::Float4(_)
            | AttributeValue::Double3(_)
            | AttributeValue::Color3f(_)
            | AttributeValue::Color4f(_) => json!({
                "type": value.kind().type_name(),
                "value": value.components().unwrap_or_default(),
            }),
        }
    }

    /// Resolved path of an asset, anchored to the edit target when the value was never resolved
    fn resolve_asset(&self, asset: &AssetPath) -> String {
        if !asset.resolved_path.is_empty() {
            return asset.resolved_path.replace('\\', "/");
        }
        let absolute = self.stage.edit_target().compute_absolute_path(&asset.path);
        if Path::new(&absolute).is_absolute() {
            normalize_path(&absolute)
        } else {
            absolute.replace('\\', "/")
        }
    }

    /// Rebuild a value of `kind`. Assets come back as a path relative to the edit target.
    pub fn deserialize(&self, kind: ValueKind, data: &Value) -> Result<AttributeValue, CoercionError> {
        let fail = || CoercionError::new(kind, data);
        if kind.is_multichannel() {
            let stored_kind = data
                .get("type")
                .and_then(Value::as_str)
                .and_then(ValueKind::from_type_name)
                .ok_or_else(fail)?;
            let components: Option<Vec<f64>> = data
                .get("value")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(Value::as_f64).collect());
            return components
                .and_then(|components| stored_kind.from_components(&components))
                .ok_or_else(fail);
        }
        match (kind, data) {
            (ValueKind::Asset, Value::String(path)) => {
                let path = path.replace('\\', "/");
                if Path::new(&path).is_absolute() {
                    Ok(AttributeValue::String(make_relative_to_layer(&path, &self.stage.edit_target())))
                } else {
                    Ok(AttributeValue::String(path))
                }
            }
            (_, Value::Bool(b)) => kind.coerce(AttributeValue::Bool(*b)),
            (_, Value::Number(n)) => match n.as_i64() {
                Some(i) if kind == ValueKind::Int => i32::try_from(i).map(AttributeValue::Int).map_err(|_| fail()),
                _ => n.as_f64().ok_or_else(fail).and_then(|f| kind.coerce(AttributeValue::Double(f))),
            },
            (_, Value::String(s)) => kind.coerce(AttributeValue::String(s.clone())),
            _ => Err(fail()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::InMemoryStage;
    use glam::Vec3;
    use std::rc::Rc;

    fn serializer() -> ValueSerializer {
        ValueSerializer::new(Rc::new(InMemoryStage::open("/project/scene.usda")))
    }

    #[test]
    fn test_vectors_keep_their_kind() {
        let serializer = serializer();
        let color = AttributeValue::Color3f(Vec3::new(1.0, 0.5, 0.25));
        let data = serializer.serialize(&color);
        assert_eq!(data, json!({"type": "color3f", "value": [1.0, 0.5, 0.25]}));
        assert_eq!(serializer.deserialize(ValueKind::Color3f, &data).unwrap(), color);
        assert!(serializer.deserialize(ValueKind::Float3, &json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_assets_use_the_resolved_path() {
        let serializer = serializer();
        let asset = AttributeValue::Asset(AssetPath::with_resolved("./tex.png", r"C:\project\tex.png"));
        assert_eq!(serializer.serialize(&asset), json!("C:/project/tex.png"));
        assert_eq!(
            serializer.deserialize(ValueKind::Asset, &json!("/project/textures/tex.png")).unwrap(),
            AttributeValue::String("./textures/tex.png".into())
        );
        assert_eq!(
            serializer.deserialize(ValueKind::Asset, &json!(r"textures\tex.png")).unwrap(),
            AttributeValue::String("textures/tex.png".into())
        );
    }

    #[test]
    fn test_unresolved_assets_resolve_against_edit_target() {
        let serializer = serializer();
        let asset = AttributeValue::Asset(AssetPath::new("./ref.usda"));
        assert_eq!(serializer.serialize(&asset), json!("/project/ref.usda"));

        let anonymous = ValueSerializer::new(Rc::new(InMemoryStage::new()));
        assert_eq!(anonymous.serialize(&asset), json!("./ref.usda"));
        assert_eq!(
            anonymous.deserialize(ValueKind::Asset, &json!("./ref.usda")).unwrap(),
            AttributeValue::String("./ref.usda".into())
        );
    }

    #[test]
    fn test_scalars() {
        let serializer = serializer();
        assert_eq!(serializer.serialize(&AttributeValue::Int(3)), json!(3));
        assert_eq!(serializer.deserialize(ValueKind::Int, &json!(3)).unwrap(), AttributeValue::Int(3));
        assert_eq!(serializer.deserialize(ValueKind::Float, &json!(0.5)).unwrap(), AttributeValue::Float(0.5));
        assert_eq!(serializer.deserialize(ValueKind::Bool, &json!(true)).unwrap(), AttributeValue::Bool(true));
        assert_eq!(
            serializer.deserialize(ValueKind::Token, &json!("auto")).unwrap(),
            AttributeValue::Token("auto".into())
        );
        assert!(serializer.deserialize(ValueKind::Int, &json!(null)).is_err());
    }
}
