//! Rigid-body transforms.
//!
//! Poses arrive from the physics engine as a translation plus a unit
//! quaternion and leave for the renderer as a 4×4 homogeneous matrix.  The
//! types here cover both ends and the composition rules in between.
//!
//! # Example
//!
//! ```rust
//! use meshbridge_geometry::transform::{Quaternion, RigidTransform, Vec3};
//!
//! let base = RigidTransform::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
//! let tip = RigidTransform::new(Vec3::new(0.0, 0.0, -0.5), Quaternion::identity());
//!
//! let m = base.compose(tip).to_matrix4();
//! assert!((m.get(0, 3) - 1.0).abs() < 1e-12);
//! assert!((m.get(2, 3) + 0.5).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (metres for translations, unit length for axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn unit_x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn approx_eq(self, other: Self, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion; see [`Quaternion::normalized`] otherwise.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let n = axis.norm();
        if n == 0.0 {
            return Self::identity();
        }
        let (s, c) = (angle_rad * 0.5).sin_cos();
        let a = axis.scale(s / n);
        Self::new(c, a.x, a.y, a.z)
    }

    /// Return a unit-length copy.  A zero quaternion maps to the identity.
    pub fn normalized(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n == 0.0 || !n.is_finite() {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Hamilton product: `self` followed by `rhs` in the body frame.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(p).mul(self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }

    /// Row-major 3×3 rotation matrix.
    pub fn to_rotation_matrix(self) -> [[f64; 3]; 3] {
        let Self { w, x, y, z } = self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (x * z + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (x * z - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }
}

impl From<[f64; 4]> for Quaternion {
    /// `[w, x, y, z]`
    fn from(q: [f64; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RigidTransform
// ────────────────────────────────────────────────────────────────────────────

/// Pose of a child frame B in a parent frame A: a point expressed in B is
/// rotated by `rotation` and then offset by `translation` to land in A.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl RigidTransform {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quaternion::identity())
    }

    /// If `self` = X_AB and `other` = X_BC, the result is X_AC.
    pub fn compose(self, other: Self) -> Self {
        let translation = self.translation.add(self.rotation.rotate(other.translation));
        Self::new(translation, self.rotation.mul(other.rotation))
    }

    /// Keep the translation and post-multiply the rotation by `extra`.
    pub fn with_rotation_post_multiplied(self, extra: Quaternion) -> Self {
        Self::new(self.translation, self.rotation.mul(extra))
    }

    pub fn to_matrix4(self) -> Matrix4 {
        let r = self.rotation.to_rotation_matrix();
        let t = self.translation;
        Matrix4([
            [r[0][0], r[0][1], r[0][2], t.x],
            [r[1][0], r[1][1], r[1][2], t.y],
            [r[2][0], r[2][1], r[2][2], t.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matrix4
// ────────────────────────────────────────────────────────────────────────────

/// Homogeneous 4×4 transform, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4(pub [[f64; 4]; 4]);

impl Matrix4 {
    pub fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[row][col]
    }

    /// The 16 entries in column-major order, the layout renderers expect.
    pub fn to_column_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (c, chunk) in out.chunks_exact_mut(4).enumerate() {
            for (r, v) in chunk.iter_mut().enumerate() {
                *v = self.0[r][c];
            }
        }
        out
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Self(out)
    }

    /// Apply the rotation block only (directions, axes).
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.0;
        self.transform_vector(p).add(Vec3::new(m[0][3], m[1][3], m[2][3]))
    }

    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::unit_x());
        assert!(r.approx_eq(Vec3::unit_y(), 1e-12), "got {r:?}");
    }

    #[test]
    fn from_axis_angle_matches_explicit_quaternion() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!(q.x.abs() < 1e-12 && q.y.abs() < 1e-12);
    }

    #[test]
    fn normalized_zero_quaternion_is_identity() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn rotation_matrix_agrees_with_rotate() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, -0.5), 0.7);
        let v = Vec3::new(0.3, -1.2, 2.0);
        let m = RigidTransform::new(Vec3::zero(), q).to_matrix4();
        assert!(m.transform_vector(v).approx_eq(q.rotate(v), 1e-12));
    }

    #[test]
    fn identity_transform_is_identity_matrix() {
        assert_eq!(RigidTransform::identity().to_matrix4(), Matrix4::identity());
    }

    #[test]
    fn compose_matches_matrix_product() {
        let a = RigidTransform::new(
            Vec3::new(1.0, 0.0, 0.5),
            Quaternion::from_axis_angle(Vec3::unit_z(), 0.4),
        );
        let b = RigidTransform::new(
            Vec3::new(0.0, -2.0, 0.0),
            Quaternion::from_axis_angle(Vec3::unit_x(), -1.1),
        );
        let composed = a.compose(b).to_matrix4();
        let product = a.to_matrix4().mul(&b.to_matrix4());
        assert!(composed.approx_eq(&product, 1e-12));
    }

    #[test]
    fn post_multiplied_rotation_keeps_translation() {
        let t = RigidTransform::from_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation_post_multiplied(Quaternion::from_axis_angle(Vec3::unit_x(), FRAC_PI_2));
        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
        assert!(t.rotation.rotate(Vec3::unit_y()).approx_eq(Vec3::unit_z(), 1e-12));
    }

    #[test]
    fn column_major_puts_translation_last() {
        let m = RigidTransform::from_translation(Vec3::new(4.0, 5.0, 6.0)).to_matrix4();
        let cm = m.to_column_major();
        assert_eq!(&cm[12..16], &[4.0, 5.0, 6.0, 1.0]);
        assert_eq!(cm[0], 1.0);
        assert_eq!(cm[5], 1.0);
    }

    #[test]
    fn transform_point_applies_rotation_then_translation() {
        let t = RigidTransform::new(
            Vec3::new(0.0, 0.0, 1.0),
            Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_2),
        );
        let p = t.to_matrix4().transform_point(Vec3::unit_x());
        assert!(p.approx_eq(Vec3::new(0.0, 1.0, 1.0), 1e-12), "got {p:?}");
    }
}
