//! The remote scene contract.
//!
//! [`RemoteScene`] is the only way the bridge touches the visualizer.  It
//! covers the connection lifecycle plus the three tree operations the bridge
//! needs: wipe a subtree, place an object, move a node.
//!
//! # Contract
//!
//! * `connect` is idempotent; calling it on an open connection is a no-op.
//! * `delete_subtree` removes the node at `path` and everything below it.
//!   Deleting a path that holds nothing succeeds.
//! * `set_object` places (or replaces) the object at `path`.
//! * `set_transform` sets the node's transform relative to its parent.
//!   Children inherit it.

use meshbridge_geometry::Matrix4;
use meshbridge_types::{ScenePath, VizError};

/// Renderer primitive, already in renderer conventions (cylinders along +Y,
/// meshes inlined as `.obj` text).
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySpec {
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    Cylinder { radius: f64, height: f64 },
    ObjMesh { source_path: String, contents: String },
}

impl GeometrySpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::ObjMesh { .. } => "obj-mesh",
        }
    }
}

/// Flat-shaded (Lambert) material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// `0xRRGGBB`
    pub color: u32,
    /// `1.0` is fully opaque.
    pub opacity: f64,
}

impl Material {
    pub fn lambert(color: u32) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// A drawable: one geometry with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub geometry: GeometrySpec,
    pub material: Material,
}

impl SceneObject {
    pub fn new(geometry: GeometrySpec, material: Material) -> Self {
        Self { geometry, material }
    }
}

/// A path-addressed 3-D scene living in another process.
pub trait RemoteScene: Send {
    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Returns [`VizError::Connection`] when the service is unreachable.
    fn connect(&mut self) -> Result<(), VizError>;

    /// Close the connection.  Closing a closed connection is a no-op.
    fn disconnect(&mut self) -> Result<(), VizError>;

    fn is_connected(&self) -> bool;

    fn delete_subtree(&mut self, path: &ScenePath) -> Result<(), VizError>;

    fn set_object(&mut self, path: &ScenePath, object: &SceneObject) -> Result<(), VizError>;

    fn set_transform(&mut self, path: &ScenePath, matrix: &Matrix4) -> Result<(), VizError>;
}

impl<S: RemoteScene + ?Sized> RemoteScene for Box<S> {
    fn connect(&mut self) -> Result<(), VizError> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<(), VizError> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn delete_subtree(&mut self, path: &ScenePath) -> Result<(), VizError> {
        (**self).delete_subtree(path)
    }

    fn set_object(&mut self, path: &ScenePath, object: &SceneObject) -> Result<(), VizError> {
        (**self).set_object(path, object)
    }

    fn set_transform(&mut self, path: &ScenePath, matrix: &Matrix4) -> Result<(), VizError> {
        (**self).set_transform(path, matrix)
    }
}
