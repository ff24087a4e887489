//! Visual primitives decoded from the physics engine's shape codes.
//!
//! The engine tags each geometry element with an integer code and a flat
//! list of floats whose meaning depends on that code.  [`Shape::from_code`]
//! turns that loosely typed pair into a [`Shape`] and rejects anything it
//! cannot interpret exactly.
//!
//! | Code | Kind | Parameters |
//! |---|---|---|
//! | 1 | Box | `[size_x, size_y, size_z]` |
//! | 2 | Sphere | `[radius]` |
//! | 3 | Cylinder | `[radius, length]` (axis along +Z) |
//! | 4 | Mesh | none; the mesh file path travels separately |

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::{Quaternion, Vec3};

/// The supported primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Box,
    Sphere,
    Cylinder,
    Mesh,
}

impl ShapeKind {
    /// Map an engine shape code to a kind.  Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Box),
            2 => Some(Self::Sphere),
            3 => Some(Self::Cylinder),
            4 => Some(Self::Mesh),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Box => 1,
            Self::Sphere => 2,
            Self::Cylinder => 3,
            Self::Mesh => 4,
        }
    }

    /// Number of float parameters the engine must supply for this kind.
    pub fn parameter_count(self) -> Option<usize> {
        match self {
            Self::Box => Some(3),
            Self::Sphere => Some(1),
            Self::Cylinder => Some(2),
            Self::Mesh => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box => write!(f, "box"),
            Self::Sphere => write!(f, "sphere"),
            Self::Cylinder => write!(f, "cylinder"),
            Self::Mesh => write!(f, "mesh"),
        }
    }
}

/// Errors raised while decoding a shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// The shape code is not one of the supported kinds.  Callers skip the
    /// element rather than abort.
    #[error("unsupported shape code {0}")]
    Unsupported(i32),

    #[error("{kind} expects exactly {expected} parameter(s), got {got}")]
    ParameterCount {
        kind: ShapeKind,
        expected: usize,
        got: usize,
    },

    #[error("mesh path {0:?} is too short to carry a file extension")]
    MeshPath(String),
}

/// A single visual primitive in the engine's conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Box { size_x: f64, size_y: f64, size_z: f64 },
    Sphere { radius: f64 },
    /// Axis along +Z of the element frame.
    Cylinder { radius: f64, length: f64 },
    /// `path` is the companion `.obj` file, already rewritten.
    Mesh { path: String },
}

impl Shape {
    /// Decode an engine geometry record.
    ///
    /// `mesh_path` is only consulted for meshes, whose `.obj` companion is
    /// derived with [`companion_obj_path`].
    pub fn from_code(code: i32, params: &[f64], mesh_path: &str) -> Result<Self, ShapeError> {
        let kind = ShapeKind::from_code(code).ok_or(ShapeError::Unsupported(code))?;
        if let Some(expected) = kind.parameter_count()
            && params.len() != expected
        {
            return Err(ShapeError::ParameterCount {
                kind,
                expected,
                got: params.len(),
            });
        }
        Ok(match kind {
            ShapeKind::Box => Self::Box {
                size_x: params[0],
                size_y: params[1],
                size_z: params[2],
            },
            ShapeKind::Sphere => Self::Sphere { radius: params[0] },
            ShapeKind::Cylinder => Self::Cylinder {
                radius: params[0],
                length: params[1],
            },
            ShapeKind::Mesh => Self::Mesh {
                path: companion_obj_path(mesh_path)?,
            },
        })
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Box { .. } => ShapeKind::Box,
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::Mesh { .. } => ShapeKind::Mesh,
        }
    }

    /// The float parameters in engine order; empty for meshes.
    pub fn parameters(&self) -> Vec<f64> {
        match *self {
            Self::Box {
                size_x,
                size_y,
                size_z,
            } => vec![size_x, size_y, size_z],
            Self::Sphere { radius } => vec![radius],
            Self::Cylinder { radius, length } => vec![radius, length],
            Self::Mesh { .. } => Vec::new(),
        }
    }

    /// Rotation to post-multiply onto the element's local pose so the
    /// renderer draws the primitive the way the engine meant it.
    ///
    /// Engine cylinders run along +Z while renderer cylinders run along +Y,
    /// so cylinders get +90° about X.  Every other kind shares conventions.
    pub fn renderer_correction(&self) -> Quaternion {
        match self {
            Self::Cylinder { .. } => Quaternion::from_axis_angle(Vec3::unit_x(), FRAC_PI_2),
            _ => Quaternion::identity(),
        }
    }
}

/// Replace the last three characters of `source` with `obj`.
///
/// `"meshes/link.stl"` becomes `"meshes/link.obj"`.  The engine ships meshes
/// in several formats; the renderer only loads the `.obj` sibling.
pub fn companion_obj_path(source: &str) -> Result<String, ShapeError> {
    let cut = source
        .char_indices()
        .rev()
        .nth(2)
        .map(|(i, _)| i)
        .ok_or_else(|| ShapeError::MeshPath(source.to_string()))?;
    Ok(format!("{}obj", &source[..cut]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_parameters_pass_through() {
        let shape = Shape::from_code(1, &[0.1, 0.2, 0.3], "").unwrap();
        assert_eq!(
            shape,
            Shape::Box {
                size_x: 0.1,
                size_y: 0.2,
                size_z: 0.3
            }
        );
        assert_eq!(shape.parameters(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn sphere_and_cylinder_parameters_round_trip() {
        for (code, params) in [(2, vec![0.5]), (3, vec![0.05, 1.2])] {
            let shape = Shape::from_code(code, &params, "").unwrap();
            assert_eq!(shape.kind().code(), code);
            assert_eq!(shape.parameters(), params);
        }
    }

    #[test]
    fn cylinder_keeps_radius_and_length_apart() {
        let shape = Shape::from_code(3, &[0.05, 1.2], "").unwrap();
        assert_eq!(
            shape,
            Shape::Cylinder {
                radius: 0.05,
                length: 1.2
            }
        );
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let err = Shape::from_code(1, &[1.0, 2.0], "").unwrap_err();
        assert_eq!(
            err,
            ShapeError::ParameterCount {
                kind: ShapeKind::Box,
                expected: 3,
                got: 2
            }
        );
        assert!(Shape::from_code(2, &[], "").is_err());
        assert!(Shape::from_code(3, &[1.0, 2.0, 3.0], "").is_err());
    }

    #[test]
    fn unknown_code_is_unsupported() {
        assert_eq!(
            Shape::from_code(7, &[1.0], "").unwrap_err(),
            ShapeError::Unsupported(7)
        );
        assert_eq!(
            Shape::from_code(0, &[], "").unwrap_err(),
            ShapeError::Unsupported(0)
        );
    }

    #[test]
    fn mesh_path_swaps_extension() {
        let shape = Shape::from_code(4, &[], "models/arm/link1.stl").unwrap();
        assert_eq!(
            shape,
            Shape::Mesh {
                path: "models/arm/link1.obj".to_string()
            }
        );
        // Mesh records may carry scale data; it is not a parameter error.
        assert!(Shape::from_code(4, &[1.0, 1.0, 1.0], "a.dae").is_ok());
    }

    #[test]
    fn companion_path_handles_short_and_multibyte_names() {
        assert_eq!(companion_obj_path("abc").unwrap(), "obj");
        assert_eq!(companion_obj_path("é.stl").unwrap(), "é.obj");
        assert!(matches!(companion_obj_path("ab"), Err(ShapeError::MeshPath(_))));
    }

    #[test]
    fn only_cylinders_need_a_renderer_correction() {
        let cylinder = Shape::Cylinder {
            radius: 0.1,
            length: 1.0,
        };
        let corrected = cylinder.renderer_correction();
        // The renderer's +Y cylinder axis lands on the engine's +Z.
        assert!(corrected.rotate(Vec3::unit_y()).approx_eq(Vec3::unit_z(), 1e-12));

        let sphere = Shape::Sphere { radius: 1.0 };
        assert_eq!(sphere.renderer_correction(), Quaternion::identity());
    }

    #[test]
    fn correction_applied_once_aligns_axis() {
        let cylinder = Shape::Cylinder {
            radius: 0.1,
            length: 1.0,
        };
        let once = Quaternion::identity().mul(cylinder.renderer_correction());
        let twice = once.mul(cylinder.renderer_correction());
        assert!(once.rotate(Vec3::unit_y()).approx_eq(Vec3::unit_z(), 1e-12));
        assert!(!twice.rotate(Vec3::unit_y()).approx_eq(Vec3::unit_z(), 1e-6));
    }

    #[test]
    fn shape_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Shape::Sphere { radius: 0.5 }).unwrap();
        assert!(json.contains("\"kind\":\"sphere\""), "got {json}");
    }
}
