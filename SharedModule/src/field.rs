//! # Field Values
//!
//! Typed values a component schema field can hold, and their JSON
//! encoding. Decoding is strict per field: a value that does not fit the
//! declared type is rejected with [`SyncError::InvalidField`] so the caller
//! can skip just that field.

use serde_json::{json, Map, Value};

use crate::error::{SyncError, SyncResult};
use crate::types::{Quat, Vector3};

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    /// Whole number; fractional JSON numbers are rejected
    Int,
    /// Floating point number
    Number,
    String,
    /// `#rrggbb` or `#rgb` hex string, stored verbatim
    Color,
    /// One of a fixed set of string values
    Enum(&'static [&'static str]),
    /// `{x, y, z}`; missing components keep their current value
    Vector3,
    /// `{x, y, z, w}`, all four required
    Quat,
    /// Any JSON value, carried opaquely
    Json,
}

impl FieldType {
    /// Human-readable type name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Color => "hex color",
            Self::Enum(_) => "enum string",
            Self::Vector3 => "vector3",
            Self::Quat => "quaternion",
            Self::Json => "json",
        }
    }

    /// Whether a locally supplied value is acceptable for this type
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::Bool, FieldValue::Bool(_)) => true,
            (Self::Int, FieldValue::Int(_)) => true,
            (Self::Number, FieldValue::Number(n)) => n.is_finite(),
            (Self::String, FieldValue::String(_)) => true,
            (Self::Color, FieldValue::Color(c)) => is_hex_color(c),
            (Self::Enum(allowed), FieldValue::Enum(s)) => allowed.contains(&s.as_str()),
            (Self::Vector3, FieldValue::Vector3(v)) => {
                v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
            }
            (Self::Quat, FieldValue::Quat(q)) => {
                q.x.is_finite() && q.y.is_finite() && q.z.is_finite() && q.w.is_finite()
            }
            (Self::Json, FieldValue::Json(_)) => true,
            _ => false,
        }
    }

    /// Decode a wire value for `field`.
    ///
    /// `current` is the field's value before this update; partial vectors
    /// take their missing components from it.
    pub fn decode(&self, field: &str, value: &Value, current: &FieldValue) -> SyncResult<FieldValue> {
        let invalid = || SyncError::InvalidField {
            field: field.to_string(),
            expected: self.name(),
        };

        match self {
            Self::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(invalid),
            Self::Int => value.as_i64().map(FieldValue::Int).ok_or_else(invalid),
            Self::Number => value.as_f64().map(FieldValue::Number).ok_or_else(invalid),
            Self::String => value
                .as_str()
                .map(|s| FieldValue::String(s.to_string()))
                .ok_or_else(invalid),
            Self::Color => match value.as_str() {
                Some(s) if is_hex_color(s) => Ok(FieldValue::Color(s.to_string())),
                _ => Err(invalid()),
            },
            Self::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(FieldValue::Enum(s.to_string())),
                _ => Err(invalid()),
            },
            Self::Vector3 => {
                let map = value.as_object().ok_or_else(invalid)?;
                let base = match current {
                    FieldValue::Vector3(v) => *v,
                    _ => Vector3::zero(),
                };
                Ok(FieldValue::Vector3(Vector3 {
                    x: parse_f64_field(map, "x", base.x).ok_or_else(invalid)?,
                    y: parse_f64_field(map, "y", base.y).ok_or_else(invalid)?,
                    z: parse_f64_field(map, "z", base.z).ok_or_else(invalid)?,
                }))
            }
            Self::Quat => {
                // All four components are required; an {x, y, z} here is
                // almost always an Euler triple that leaked onto the wire.
                let map = value.as_object().ok_or_else(invalid)?;
                let get = |key: &str| map.get(key).and_then(Value::as_f64);
                Ok(FieldValue::Quat(Quat {
                    x: get("x").ok_or_else(invalid)?,
                    y: get("y").ok_or_else(invalid)?,
                    z: get("z").ok_or_else(invalid)?,
                    w: get("w").ok_or_else(invalid)?,
                }))
            }
            Self::Json => Ok(FieldValue::Json(value.clone())),
        }
    }
}

/// Value held by a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
    Color(String),
    Enum(String),
    Vector3(Vector3),
    Quat(Quat),
    Json(Value),
}

impl FieldValue {
    /// Name of this value's variant, matching [`FieldType::name`]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Color(_) => "hex color",
            Self::Enum(_) => "enum string",
            Self::Vector3(_) => "vector3",
            Self::Quat(_) => "quaternion",
            Self::Json(_) => "json",
        }
    }

    /// Encode for the wire
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => json!(*b),
            Self::Int(i) => json!(*i),
            Self::Number(n) => json!(*n),
            Self::String(s) | Self::Color(s) | Self::Enum(s) => json!(s),
            Self::Vector3(v) => json!({
                "x": v.x,
                "y": v.y,
                "z": v.z
            }),
            Self::Quat(q) => json!({
                "x": q.x,
                "y": q.y,
                "z": q.z,
                "w": q.w
            }),
            Self::Json(v) => v.clone(),
        }
    }

    /// Equality on the stored representation: `-0.0` and `0.0` differ.
    pub fn same_repr(&self, other: &FieldValue) -> bool {
        fn bits(values: &[f64]) -> impl Iterator<Item = u64> + '_ {
            values.iter().map(|v| v.to_bits())
        }
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::Vector3(a), Self::Vector3(b)) => bits(&[a.x, a.y, a.z]).eq(bits(&[b.x, b.y, b.z])),
            (Self::Quat(a), Self::Quat(b)) => {
                bits(&[a.x, a.y, a.z, a.w]).eq(bits(&[b.x, b.y, b.z, b.w]))
            }
            _ => self == other,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Color(s) | Self::Enum(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vector3> {
        match self {
            Self::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            Self::Quat(q) => Some(*q),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Plain string. Colors and enum choices need their own variants.
impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vector3> for FieldValue {
    fn from(v: Vector3) -> Self {
        Self::Vector3(v)
    }
}

impl From<Quat> for FieldValue {
    fn from(q: Quat) -> Self {
        Self::Quat(q)
    }
}

/// Check for `#rgb` or `#rrggbb`
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

// Missing key falls back to `fallback`; a present non-number is an error.
fn parse_f64_field(map: &Map<String, Value>, key: &str, fallback: f64) -> Option<f64> {
    match map.get(key) {
        None => Some(fallback),
        Some(v) => v.as_f64(),
    }
}
