//! Attribute values and the per-kind conversion table
//!
//! Every attribute declares a [`ValueKind`]. The kind decides how widget
//! input is coerced, how scene values are normalized for display and
//! comparison, how text is parsed and how values are formatted. All of it
//! is dispatched through exhaustive matches, so adding a kind without
//! handling it everywhere doesn't compile.

use glam::{DVec3, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::CoercionError;

/// Reference to an external file as authored plus its resolved location
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPath {
    /// Path as authored, usually relative to the layer
    pub path: String,
    /// Absolute location, empty when unresolved
    pub resolved_path: String,
}

impl AssetPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resolved_path: String::new(),
        }
    }

    pub fn with_resolved(path: impl Into<String>, resolved_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resolved_path: resolved_path.into(),
        }
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}@", self.path)
    }
}

/// Value held by an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    Token(String),
    Asset(AssetPath),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Double3(DVec3),
    Color3f(Vec3),
    Color4f(Vec4),
}

impl AttributeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Bool(_) => ValueKind::Bool,
            AttributeValue::Int(_) => ValueKind::Int,
            AttributeValue::Float(_) => ValueKind::Float,
            AttributeValue::Double(_) => ValueKind::Double,
            AttributeValue::String(_) => ValueKind::String,
            AttributeValue::Token(_) => ValueKind::Token,
            AttributeValue::Asset(_) => ValueKind::Asset,
            AttributeValue::Float2(_) => ValueKind::Float2,
            AttributeValue::Float3(_) => ValueKind::Float3,
            AttributeValue::Float4(_) => ValueKind::Float4,
            AttributeValue::Double3(_) => ValueKind::Double3,
            AttributeValue::Color3f(_) => ValueKind::Color3f,
            AttributeValue::Color4f(_) => ValueKind::Color4f,
        }
    }

    /// Components of vector values, `None` for scalars
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValue::Float2(v) => Some(v.to_array().iter().map(|c| *c as f64).collect()),
            AttributeValue::Float3(v) | AttributeValue::Color3f(v) => {
                Some(v.to_array().iter().map(|c| *c as f64).collect())
            }
            AttributeValue::Float4(v) | AttributeValue::Color4f(v) => {
                Some(v.to_array().iter().map(|c| *c as f64).collect())
            }
            AttributeValue::Double3(v) => Some(v.to_array().to_vec()),
            _ => None,
        }
    }

    /// One channel of a vector value as a scalar
    pub fn component(&self, index: usize) -> Option<AttributeValue> {
        match self {
            AttributeValue::Double3(v) => (index < 3).then(|| AttributeValue::Double(v[index])),
            _ => {
                let components = self.components()?;
                components.get(index).map(|c| AttributeValue::Float(*c as f32))
            }
        }
    }

    /// Copy of a vector value with one channel replaced
    pub fn with_component(&self, index: usize, component: &AttributeValue) -> Option<AttributeValue> {
        let mut components = self.components()?;
        let slot = components.get_mut(index)?;
        *slot = component.as_f64()?;
        self.kind().from_components(&components)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f as f64),
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => self.as_f64().map(|v| v != 0.0),
        }
    }

    /// Text of string-like values (the authored path for assets)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Token(s) => Some(s),
            AttributeValue::Asset(asset) => Some(&asset.path),
            _ => None,
        }
    }
}

fn fmt_components(f: &mut std::fmt::Formatter<'_>, components: &[f64]) -> std::fmt::Result {
    let parts: Vec<String> = components.iter().map(|c| c.to_string()).collect();
    write!(f, "({})", parts.join(", "))
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Double(v) => write!(f, "{}", v),
            AttributeValue::String(s) | AttributeValue::Token(s) => f.write_str(s),
            AttributeValue::Asset(asset) => write!(f, "{}", asset),
            // f32 channels are printed as f32 to avoid widening noise
            AttributeValue::Float2(v) => write!(f, "({}, {})", v.x, v.y),
            AttributeValue::Float3(v) | AttributeValue::Color3f(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            AttributeValue::Float4(v) | AttributeValue::Color4f(v) => {
                write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w)
            }
            AttributeValue::Double3(v) => fmt_components(f, &v.to_array()),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Double,
    String,
    Token,
    Asset,
    Float2,
    Float3,
    Float4,
    Double3,
    Color3f,
    Color4f,
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ValueKind {
    pub const ALL: [ValueKind; 13] = [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::Token,
        ValueKind::Asset,
        ValueKind::Float2,
        ValueKind::Float3,
        ValueKind::Float4,
        ValueKind::Double3,
        ValueKind::Color3f,
        ValueKind::Color4f,
    ];

    /// Scene type name, as found in attribute declarations
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Token => "token",
            ValueKind::Asset => "asset",
            ValueKind::Float2 => "float2",
            ValueKind::Float3 => "float3",
            ValueKind::Float4 => "float4",
            ValueKind::Double3 => "double3",
            ValueKind::Color3f => "color3f",
            ValueKind::Color4f => "color4f",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.type_name() == name)
    }

    pub fn channel_count(self) -> usize {
        match self {
            ValueKind::Bool
            | ValueKind::Int
            | ValueKind::Float
            | ValueKind::Double
            | ValueKind::String
            | ValueKind::Token
            | ValueKind::Asset => 1,
            ValueKind::Float2 => 2,
            ValueKind::Float3 | ValueKind::Double3 | ValueKind::Color3f => 3,
            ValueKind::Float4 | ValueKind::Color4f => 4,
        }
    }

    /// Multi-component kinds are edited one channel at a time
    pub fn is_multichannel(self) -> bool {
        self.channel_count() > 1
    }

    /// Kind of a single channel
    pub fn component_kind(self) -> ValueKind {
        match self {
            ValueKind::Float2 | ValueKind::Float3 | ValueKind::Float4 | ValueKind::Color3f | ValueKind::Color4f => {
                ValueKind::Float
            }
            ValueKind::Double3 => ValueKind::Double,
            scalar => scalar,
        }
    }

    /// Whether a blank string is a legitimate value
    pub fn accepts_empty_string(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Asset)
    }

    pub fn zero_value(self) -> AttributeValue {
        match self {
            ValueKind::Bool => AttributeValue::Bool(false),
            ValueKind::Int => AttributeValue::Int(0),
            ValueKind::Float => AttributeValue::Float(0.0),
            ValueKind::Double => AttributeValue::Double(0.0),
            ValueKind::String => AttributeValue::String(String::new()),
            ValueKind::Token => AttributeValue::Token(String::new()),
            ValueKind::Asset => AttributeValue::Asset(AssetPath::default()),
            ValueKind::Float2 => AttributeValue::Float2(Vec2::ZERO),
            ValueKind::Float3 => AttributeValue::Float3(Vec3::ZERO),
            ValueKind::Float4 => AttributeValue::Float4(Vec4::ZERO),
            ValueKind::Double3 => AttributeValue::Double3(DVec3::ZERO),
            ValueKind::Color3f => AttributeValue::Color3f(Vec3::ZERO),
            ValueKind::Color4f => AttributeValue::Color4f(Vec4::ZERO),
        }
    }

    /// Build a vector value of this kind, `None` for scalars or a wrong component count
    pub fn from_components(self, c: &[f64]) -> Option<AttributeValue> {
        if c.len() != self.channel_count() || !self.is_multichannel() {
            return None;
        }
        let f = |i: usize| c[i] as f32;
        Some(match self {
            ValueKind::Float2 => AttributeValue::Float2(Vec2::new(f(0), f(1))),
            ValueKind::Float3 => AttributeValue::Float3(Vec3::new(f(0), f(1), f(2))),
            ValueKind::Float4 => AttributeValue::Float4(Vec4::new(f(0), f(1), f(2), f(3))),
            ValueKind::Double3 => AttributeValue::Double3(DVec3::new(c[0], c[1], c[2])),
            ValueKind::Color3f => AttributeValue::Color3f(Vec3::new(f(0), f(1), f(2))),
            ValueKind::Color4f => AttributeValue::Color4f(Vec4::new(f(0), f(1), f(2), f(3))),
            ValueKind::Bool
            | ValueKind::Int
            | ValueKind::Float
            | ValueKind::Double
            | ValueKind::String
            | ValueKind::Token
            | ValueKind::Asset => return None,
        })
    }

    /// Scene value to the form models cache and compare.
    /// Assets only expose their authored path.
    pub fn normalize(self, raw: AttributeValue) -> AttributeValue {
        match (self, raw) {
            (ValueKind::Asset, AttributeValue::Asset(asset)) => AttributeValue::String(asset.path),
            (_, raw) => raw,
        }
    }

    /// Compare two scene values the way models do
    pub fn equals(self, a: &AttributeValue, b: &AttributeValue) -> bool {
        self.normalize(a.clone()) == self.normalize(b.clone())
    }

    /// Convert widget input to this kind.
    /// Multi-component kinds take a single channel unless given a whole value.
    pub fn coerce(self, value: AttributeValue) -> Result<AttributeValue, CoercionError> {
        if value.kind() == self {
            return Ok(value);
        }
        let fail = |value: &AttributeValue| CoercionError::new(self, value);
        match self {
            ValueKind::Bool => match &value {
                AttributeValue::String(s) | AttributeValue::Token(s) => {
                    parse_bool(s).map(AttributeValue::Bool).ok_or_else(|| fail(&value))
                }
                other => other.as_bool().map(AttributeValue::Bool).ok_or_else(|| fail(&value)),
            },
            ValueKind::Int => match &value {
                AttributeValue::String(s) | AttributeValue::Token(s) => s
                    .trim()
                    .parse::<i32>()
                    .map(AttributeValue::Int)
                    .map_err(|_| fail(&value)),
                other => match other.as_f64() {
                    Some(v) if v.is_finite() && v.trunc() >= i32::MIN as f64 && v.trunc() <= i32::MAX as f64 => {
                        Ok(AttributeValue::Int(v.trunc() as i32))
                    }
                    _ => Err(fail(&value)),
                },
            },
            ValueKind::Float => match &value {
                AttributeValue::String(s) | AttributeValue::Token(s) => s
                    .trim()
                    .parse::<f32>()
                    .map(AttributeValue::Float)
                    .map_err(|_| fail(&value)),
                other => other
                    .as_f64()
                    .map(|v| AttributeValue::Float(v as f32))
                    .ok_or_else(|| fail(&value)),
            },
            ValueKind::Double => match &value {
                AttributeValue::String(s) | AttributeValue::Token(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(AttributeValue::Double)
                    .map_err(|_| fail(&value)),
                other => other.as_f64().map(AttributeValue::Double).ok_or_else(|| fail(&value)),
            },
            ValueKind::String => Ok(AttributeValue::String(
                value.as_text().map(str::to_string).unwrap_or_else(|| value.to_string()),
            )),
            ValueKind::Token => Ok(AttributeValue::Token(
                value.as_text().map(str::to_string).unwrap_or_else(|| value.to_string()),
            )),
            ValueKind::Asset => match &value {
                AttributeValue::String(s) | AttributeValue::Token(s) => Ok(AttributeValue::String(s.clone())),
                _ => Err(fail(&value)),
            },
            ValueKind::Float2
            | ValueKind::Float3
            | ValueKind::Float4
            | ValueKind::Double3
            | ValueKind::Color3f
            | ValueKind::Color4f => self.component_kind().coerce(value),
        }
    }

    /// Parse text typed by a user. Vectors accept `(1, 2, 3)` or `1 2 3`.
    pub fn parse(self, text: &str) -> Result<AttributeValue, CoercionError> {
        if !self.is_multichannel() {
            return self.coerce(AttributeValue::String(text.to_string()));
        }
        let components: Result<Vec<f64>, _> = text
            .trim()
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']'])
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse::<f64>)
            .collect();
        components
            .ok()
            .and_then(|components| self.from_components(&components))
            .ok_or_else(|| CoercionError::new(self, text))
    }

    /// Render a scene value for display
    pub fn format(self, value: &AttributeValue) -> String {
        match self.normalize(value.clone()) {
            AttributeValue::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
