//! In-process scene for tests and dry runs.
//!
//! [`InMemoryScene`] implements [`RemoteScene`] against a flat map keyed by
//! [`ScenePath`], and keeps a log of every command it accepted.  It is
//! stricter than a real visualizer on purpose: moving a node that has no
//! object at or below it is an error instead of silently creating an empty
//! group.
//!
//! # Example
//!
//! ```rust
//! use meshbridge_geometry::Matrix4;
//! use meshbridge_middleware::{GeometrySpec, InMemoryScene, Material, RemoteScene, SceneObject};
//! use meshbridge_types::ScenePath;
//!
//! let mut scene = InMemoryScene::new();
//! scene.connect().unwrap();
//!
//! let ball = ScenePath::new(["world", "ball"]);
//! scene
//!     .set_object(&ball, &SceneObject::new(GeometrySpec::Sphere { radius: 1.0 }, Material::lambert(0xff0000)))
//!     .unwrap();
//! scene.set_transform(&ScenePath::new(["world"]), &Matrix4::identity()).unwrap();
//!
//! assert_eq!(scene.object_count(), 1);
//! assert!(scene.set_transform(&ScenePath::new(["elsewhere"]), &Matrix4::identity()).is_err());
//! ```

use std::collections::BTreeMap;

use meshbridge_geometry::Matrix4;
use meshbridge_types::{ScenePath, VizError};

use crate::scene::{RemoteScene, SceneObject};

/// One command accepted by an [`InMemoryScene`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Delete(ScenePath),
    SetObject(ScenePath),
    SetTransform(ScenePath, Matrix4),
}

/// A [`RemoteScene`] that lives entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    connected: bool,
    /// When set, `connect` fails with this URL in the error.
    unreachable_url: Option<String>,
    objects: BTreeMap<ScenePath, SceneObject>,
    transforms: BTreeMap<ScenePath, Matrix4>,
    log: Vec<RecordedCommand>,
    /// Set by [`InMemoryScene::without_log`].
    unlogged: bool,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene whose `connect` always fails, standing in for a visualizer
    /// that is not running.
    pub fn unreachable(url: impl Into<String>) -> Self {
        Self {
            unreachable_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Stop recording commands.  Long-running dry runs use this so the log
    /// does not grow with every publish.
    pub fn without_log(mut self) -> Self {
        self.unlogged = true;
        self.log = Vec::new();
        self
    }

    pub fn object(&self, path: &ScenePath) -> Option<&SceneObject> {
        self.objects.get(path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Paths holding an object, in path order.
    pub fn object_paths(&self) -> impl Iterator<Item = &ScenePath> {
        self.objects.keys()
    }

    /// Transform most recently set on `path` itself.
    pub fn transform(&self, path: &ScenePath) -> Option<&Matrix4> {
        self.transforms.get(path)
    }

    /// Pose of `path` in the scene root: the product of every transform set
    /// along the way down, identity where none was set.
    pub fn world_transform(&self, path: &ScenePath) -> Matrix4 {
        path.ancestry().fold(Matrix4::identity(), |acc, node| {
            match self.transforms.get(&node) {
                Some(m) => acc.mul(m),
                None => acc,
            }
        })
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn record(&mut self, command: RecordedCommand) {
        if !self.unlogged {
            self.log.push(command);
        }
    }

    fn ensure_connected(&self) -> Result<(), VizError> {
        if self.connected {
            Ok(())
        } else {
            Err(VizError::NotConnected)
        }
    }

    fn holds_anything_under(&self, path: &ScenePath) -> bool {
        self.objects.range(path.clone()..).next().is_some_and(|(p, _)| path.contains(p))
    }
}

impl RemoteScene for InMemoryScene {
    fn connect(&mut self) -> Result<(), VizError> {
        if let Some(url) = &self.unreachable_url {
            return Err(VizError::Connection {
                url: url.clone(),
                details: "connection refused".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), VizError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn delete_subtree(&mut self, path: &ScenePath) -> Result<(), VizError> {
        self.ensure_connected()?;
        self.objects.retain(|p, _| !path.contains(p));
        self.transforms.retain(|p, _| !path.contains(p));
        self.record(RecordedCommand::Delete(path.clone()));
        Ok(())
    }

    fn set_object(&mut self, path: &ScenePath, object: &SceneObject) -> Result<(), VizError> {
        self.ensure_connected()?;
        self.objects.insert(path.clone(), object.clone());
        self.record(RecordedCommand::SetObject(path.clone()));
        Ok(())
    }

    fn set_transform(&mut self, path: &ScenePath, matrix: &Matrix4) -> Result<(), VizError> {
        self.ensure_connected()?;
        if !self.holds_anything_under(path) {
            return Err(VizError::NoSuchPath(path.to_string()));
        }
        self.transforms.insert(path.clone(), *matrix);
        self.record(RecordedCommand::SetTransform(path.clone(), *matrix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GeometrySpec, Material};
    use meshbridge_geometry::{RigidTransform, Vec3};

    fn ball() -> SceneObject {
        SceneObject::new(GeometrySpec::Sphere { radius: 0.5 }, Material::lambert(0xff0000))
    }

    fn connected() -> InMemoryScene {
        let mut scene = InMemoryScene::new();
        scene.connect().unwrap();
        scene
    }

    #[test]
    fn commands_require_connection() {
        let mut scene = InMemoryScene::new();
        let err = scene.set_object(&ScenePath::new(["a"]), &ball()).unwrap_err();
        assert!(matches!(err, VizError::NotConnected));
    }

    #[test]
    fn unreachable_scene_refuses_connect() {
        let mut scene = InMemoryScene::unreachable("tcp://127.0.0.1:6000");
        let err = scene.connect().unwrap_err();
        assert!(matches!(err, VizError::Connection { .. }));
        assert!(!scene.is_connected());
    }

    #[test]
    fn delete_subtree_removes_descendants_only() {
        let mut scene = connected();
        scene.set_object(&ScenePath::new(["p", "a", "0"]), &ball()).unwrap();
        scene.set_object(&ScenePath::new(["p", "a", "1"]), &ball()).unwrap();
        scene.set_object(&ScenePath::new(["p2", "a", "0"]), &ball()).unwrap();

        scene.delete_subtree(&ScenePath::new(["p"])).unwrap();
        assert_eq!(scene.object_count(), 1);
        assert!(scene.object(&ScenePath::new(["p2", "a", "0"])).is_some());

        // Deleting an empty subtree is fine.
        scene.delete_subtree(&ScenePath::new(["p"])).unwrap();
    }

    #[test]
    fn set_transform_requires_an_object_at_or_below() {
        let mut scene = connected();
        scene.set_object(&ScenePath::new(["p", "s", "f", "0"]), &ball()).unwrap();

        scene
            .set_transform(&ScenePath::new(["p", "s", "f"]), &Matrix4::identity())
            .unwrap();
        scene
            .set_transform(&ScenePath::new(["p", "s", "f", "0"]), &Matrix4::identity())
            .unwrap();

        let err = scene
            .set_transform(&ScenePath::new(["p", "s", "g"]), &Matrix4::identity())
            .unwrap_err();
        assert!(matches!(err, VizError::NoSuchPath(_)));
        // A sibling whose name merely shares a prefix does not count.
        assert!(
            scene
                .set_transform(&ScenePath::new(["p", "s", "f2"]), &Matrix4::identity())
                .is_err()
        );
    }

    #[test]
    fn world_transform_composes_ancestors() {
        let mut scene = connected();
        let element = ScenePath::new(["p", "s", "f", "0"]);
        scene.set_object(&element, &ball()).unwrap();

        let frame = RigidTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)).to_matrix4();
        let local = RigidTransform::from_translation(Vec3::new(0.0, 0.0, 2.0)).to_matrix4();
        scene.set_transform(&ScenePath::new(["p", "s", "f"]), &frame).unwrap();
        scene.set_transform(&element, &local).unwrap();

        let world = scene.world_transform(&element);
        let origin = world.transform_point(Vec3::zero());
        assert!(origin.approx_eq(Vec3::new(1.0, 0.0, 2.0), 1e-12), "got {origin:?}");
    }

    #[test]
    fn log_records_commands_in_order() {
        let mut scene = connected();
        let p = ScenePath::new(["x", "0"]);
        scene.delete_subtree(&ScenePath::new(["x"])).unwrap();
        scene.set_object(&p, &ball()).unwrap();
        scene.set_transform(&p, &Matrix4::identity()).unwrap();

        assert_eq!(
            scene.commands(),
            &[
                RecordedCommand::Delete(ScenePath::new(["x"])),
                RecordedCommand::SetObject(p.clone()),
                RecordedCommand::SetTransform(p, Matrix4::identity()),
            ]
        );
        scene.clear_log();
        assert!(scene.commands().is_empty());
    }

    #[test]
    fn unlogged_scene_still_tracks_state() {
        let mut scene = InMemoryScene::new().without_log();
        scene.connect().unwrap();
        let p = ScenePath::new(["x", "0"]);
        scene.set_object(&p, &ball()).unwrap();
        for _ in 0..100 {
            scene.set_transform(&p, &Matrix4::identity()).unwrap();
        }

        assert!(scene.commands().is_empty());
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.transform(&p), Some(&Matrix4::identity()));
    }
}
