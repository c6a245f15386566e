//! Runtime values exchanged between adapters and outputs.
//!
//! The set is intentionally closed: every curve track produces one of these
//! per tick, and every parameter output declares which kind it accepts.

use serde::{Deserialize, Serialize};

/// Lightweight kind tag for dispatch and bind-time compatibility checks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl ValueKind {
    /// Number of scalar channels carried by a value of this kind.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            ValueKind::Float => 1,
            ValueKind::Vec2 => 2,
            ValueKind::Vec3 => 3,
            ValueKind::Vec4 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar float
    Float(f32),

    /// 2D vector
    Vec2([f32; 2]),

    /// 3D vector
    Vec3([f32; 3]),

    /// 4D vector
    Vec4([f32; 4]),
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Vec4(_) => ValueKind::Vec4,
        }
    }

    /// Assemble a value of `kind` from per-channel scalars.
    /// Missing channels read as 0.0; extra channels are ignored.
    pub fn from_channels(kind: ValueKind, channels: &[f32]) -> Value {
        let ch = |i: usize| channels.get(i).copied().unwrap_or(0.0);
        match kind {
            ValueKind::Float => Value::Float(ch(0)),
            ValueKind::Vec2 => Value::Vec2([ch(0), ch(1)]),
            ValueKind::Vec3 => Value::Vec3([ch(0), ch(1), ch(2)]),
            ValueKind::Vec4 => Value::Vec4([ch(0), ch(1), ch(2), ch(3)]),
        }
    }

    /// Convenience constructor
    pub fn f(v: f32) -> Self {
        Value::Float(v)
    }
}
