//! Dynamically typed values exchanged with scripts.

use crate::object::ObjectId;

/// A script-visible value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    PackedFloat32Array(Vec<f32>),
    PackedInt64Array(Vec<i64>),
    Array(Vec<Variant>),
    Object(ObjectId),
}

impl Variant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Nil => "Nil",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::String(_) => "String",
            Variant::PackedFloat32Array(_) => "PackedFloat32Array",
            Variant::PackedInt64Array(_) => "PackedInt64Array",
            Variant::Array(_) => "Array",
            Variant::Object(_) => "Object",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Variant::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_float32_array(&self) -> Option<&[f32]> {
        match self {
            Variant::PackedFloat32Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Float(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

impl From<Vec<f32>> for Variant {
    fn from(v: Vec<f32>) -> Self {
        Variant::PackedFloat32Array(v)
    }
}

impl From<Vec<i64>> for Variant {
    fn from(v: Vec<i64>) -> Self {
        Variant::PackedInt64Array(v)
    }
}

impl From<Vec<Variant>> for Variant {
    fn from(v: Vec<Variant>) -> Self {
        Variant::Array(v)
    }
}

impl From<ObjectId> for Variant {
    fn from(v: ObjectId) -> Self {
        Variant::Object(v)
    }
}
