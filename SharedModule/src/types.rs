//! # Common Types
//!
//! Spatial value types carried on the wire. Components are `f64` so a value
//! read from JSON serializes back to the same text, which echo detection
//! depends on.

use serde::{Serialize, Deserialize};

/// Three-component vector, used for `position` and `scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn one() -> Self {
        Self { x: 1.0, y: 1.0, z: 1.0 }
    }
}

impl Default for Vector3 {
    fn default() -> Self {
        Self::zero()
    }
}

/// Quaternion rotation. The only rotation form allowed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

/// Euler angles in degrees, applied in XYZ order.
///
/// Local convenience only. Convert with [`EulerAngles::to_quat`] before
/// anything reaches a schema; there is no wire encoding for this type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerAngles {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert to a quaternion (intrinsic XYZ rotation order)
    pub fn to_quat(&self) -> Quat {
        let half = |deg: f64| deg.to_radians() * 0.5;
        let (s1, c1) = half(self.x).sin_cos();
        let (s2, c2) = half(self.y).sin_cos();
        let (s3, c3) = half(self.z).sin_cos();

        Quat {
            x: s1 * c2 * c3 + c1 * s2 * s3,
            y: c1 * s2 * c3 - s1 * c2 * s3,
            z: c1 * c2 * s3 + s1 * s2 * c3,
            w: c1 * c2 * c3 - s1 * s2 * s3,
        }
    }
}

/// Full transform of a scene entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Quat,
    pub scale: Vector3,
}

impl Transform {
    pub fn new(position: Vector3, rotation: Quat, scale: Vector3) -> Self {
        Self { position, rotation, scale }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Quat::identity(),
            scale: Vector3::one(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
