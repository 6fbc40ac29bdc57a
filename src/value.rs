use glam::{Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-primitive value types that can live directly in an array or a mirror record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Float2,
    Float3,
    Float4,
    Quat,
    Color,
    String,
}

impl ValueType {
    pub fn label(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Float2 => "float2",
            ValueType::Float3 => "float3",
            ValueType::Float4 => "float4",
            ValueType::Quat => "floatQ",
            ValueType::Color => "color",
            ValueType::String => "string",
        }
    }

    /// Whether keyframes of this type can be interpolated.
    pub fn supports_lerp(self) -> bool {
        !matches!(self, ValueType::Bool | ValueType::String)
    }

    /// Value a freshly created field holds.
    pub fn default_value(self) -> Value {
        match self {
            ValueType::Quat => Value::Quat(Quat::IDENTITY),
            ValueType::Color => Value::Color(Vec4::ONE),
            other => other.zero_value(),
        }
    }

    /// Additive zero, used for curve tangents that have no source element.
    pub fn zero_value(self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Float2 => Value::Float2(Vec2::ZERO),
            ValueType::Float3 => Value::Float3(Vec3::ZERO),
            ValueType::Float4 => Value::Float4(Vec4::ZERO),
            ValueType::Quat => Value::Quat(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)),
            ValueType::Color => Value::Color(Vec4::ZERO),
            ValueType::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Quat(Quat),
    Color(Vec4),
    String(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Float2(_) => ValueType::Float2,
            Value::Float3(_) => ValueType::Float3,
            Value::Float4(_) => ValueType::Float4,
            Value::Quat(_) => ValueType::Quat,
            Value::Color(_) => ValueType::Color,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<Vec3> {
        match self {
            Value::Float3(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.3}"),
            Value::Float2(v) => write!(f, "[{:.3}; {:.3}]", v.x, v.y),
            Value::Float3(v) => write!(f, "[{:.3}; {:.3}; {:.3}]", v.x, v.y, v.z),
            Value::Float4(v) | Value::Color(v) => {
                write!(f, "[{:.3}; {:.3}; {:.3}; {:.3}]", v.x, v.y, v.z, v.w)
            }
            Value::Quat(q) => write!(f, "[{:.3}; {:.3}; {:.3}; {:.3}]", q.x, q.y, q.z, q.w),
            Value::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Rust types that map one-to-one onto a [`ValueType`].
pub trait PrimitiveValue: Sized {
    const VALUE_TYPE: ValueType;

    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! primitive_value {
    ($ty:ty, $variant:ident) => {
        impl PrimitiveValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

primitive_value!(bool, Bool);
primitive_value!(i32, Int);
primitive_value!(f32, Float);
primitive_value!(Vec2, Float2);
primitive_value!(Vec3, Float3);
primitive_value!(Vec4, Float4);
primitive_value!(Quat, Quat);
primitive_value!(String, String);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
