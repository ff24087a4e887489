//! `meshbridge-geometry` – rigid transforms, visual primitives and colors.
//!
//! Pure math with no I/O.  Everything the bridge needs to turn a physics
//! engine's geometry description into something a browser-side renderer can
//! draw lives here.
//!
//! # Modules
//!
//! - [`transform`] – [`Vec3`], [`Quaternion`], [`RigidTransform`] and the
//!   homogeneous [`Matrix4`] that goes over the wire.
//! - [`shape`] – [`Shape`]: the tagged primitive type decoded from the
//!   engine's integer shape codes, including the cylinder axis correction.
//! - [`color`] – [`Rgba`] and the packed `0xRRGGBB` encoding used by
//!   renderer materials.

pub mod color;
pub mod shape;
pub mod transform;

pub use color::{pack_rgb, Rgba};
pub use shape::{companion_obj_path, Shape, ShapeError, ShapeKind};
pub use transform::{Matrix4, Quaternion, RigidTransform, Vec3};
