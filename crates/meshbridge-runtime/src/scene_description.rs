//! The bridge's own record of what it put in the remote scene.
//!
//! [`SceneDescription`] is built once from the engine's [`LoadMessage`] and
//! never changes afterwards.  It owns one [`GeometryElement`] per
//! [`ElementPath`] and remembers, for every compound frame name, the
//! precomputed frame-level [`ScenePath`] that pose updates target.

use std::collections::{BTreeMap, HashMap, HashSet};

use meshbridge_geometry::{RigidTransform, Rgba, Shape};
use meshbridge_types::{ElementPath, FramePath, LoadMessage, ScenePath, VizError};
use tracing::warn;

/// One decoded visual element.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryElement {
    pub path: ElementPath,
    pub shape: Shape,
    /// Pose in the link frame, exactly as the engine described it.
    pub local_transform: RigidTransform,
    pub color: Rgba,
}

impl GeometryElement {
    /// Local pose with the renderer's axis convention folded in; this is
    /// what gets sent.
    pub fn renderer_transform(&self) -> RigidTransform {
        self.local_transform
            .with_rotation_post_multiplied(self.shape.renderer_correction())
    }
}

/// An element the loader dropped because its shape code is unsupported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGeometry {
    pub link: String,
    pub index: usize,
    pub shape_code: i32,
}

/// Path-keyed mirror of the remote scene under one prefix.
#[derive(Debug, Clone, Default)]
pub struct SceneDescription {
    prefix: String,
    elements: BTreeMap<ElementPath, GeometryElement>,
    /// compound name → frame path, for frames holding at least one element.
    frames: HashMap<String, ScenePath>,
    /// Loaded frames that ended up with nothing to draw.
    empty_frames: HashSet<String>,
    skipped: Vec<SkippedGeometry>,
}

impl SceneDescription {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Decode every link and geometry record of `msg` under `prefix`.
    ///
    /// # Errors
    ///
    /// * [`VizError::MalformedName`] for a link name without `::`.
    /// * [`VizError::Geometry`] for a supported shape with the wrong number
    ///   of parameters.
    /// * [`VizError::DuplicatePath`] when two elements collide.
    ///
    /// Unsupported shape codes are logged and skipped.
    pub fn from_load_message(prefix: &str, msg: &LoadMessage) -> Result<Self, VizError> {
        let mut description = Self::new(prefix);

        for link in &msg.links {
            let frame = FramePath::from_compound(prefix, &link.name)?;
            let mut kept = 0usize;

            for (index, geom) in link.geometry.iter().enumerate() {
                let shape = match Shape::from_code(geom.shape_code, &geom.float_data, &geom.string_data) {
                    Ok(shape) => shape,
                    Err(source) => {
                        let err = VizError::Geometry {
                            link: link.name.clone(),
                            index,
                            source,
                        };
                        if !err.is_unsupported_shape() {
                            return Err(err);
                        }
                        warn!(link = %link.name, index, shape_code = geom.shape_code, "unsupported geometry type ignored");
                        description.skipped.push(SkippedGeometry {
                            link: link.name.clone(),
                            index,
                            shape_code: geom.shape_code,
                        });
                        continue;
                    }
                };

                description.insert(GeometryElement {
                    path: frame.element(index),
                    shape,
                    local_transform: geom.local_transform(),
                    color: geom.rgba(),
                })?;
                kept += 1;
            }

            if kept > 0 {
                description.frames.insert(link.name.clone(), frame.to_scene_path());
            } else {
                description.empty_frames.insert(link.name.clone());
            }
        }

        Ok(description)
    }

    /// Add one element.  Paths are single-owner: a second element at the same
    /// path is rejected rather than overwriting the first.
    pub fn insert(&mut self, element: GeometryElement) -> Result<(), VizError> {
        if self.elements.contains_key(&element.path) {
            return Err(VizError::DuplicatePath(element.path.to_string()));
        }
        self.elements.insert(element.path.clone(), element);
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The subtree every element lives under.
    pub fn prefix_path(&self) -> ScenePath {
        ScenePath::new([self.prefix.as_str()])
    }

    /// Elements in path order.
    pub fn elements(&self) -> impl Iterator<Item = &GeometryElement> {
        self.elements.values()
    }

    pub fn element(&self, path: &ElementPath) -> Option<&GeometryElement> {
        self.elements.get(path)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Frame-level path for a compound frame name that has geometry.
    pub fn frame_path(&self, compound_name: &str) -> Option<&ScenePath> {
        self.frames.get(compound_name)
    }

    /// `true` for frames that were loaded but have nothing to draw.
    pub fn is_empty_frame(&self, compound_name: &str) -> bool {
        self.empty_frames.contains(compound_name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn skipped(&self) -> &[SkippedGeometry] {
        &self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbridge_geometry::{Quaternion, Vec3};
    use meshbridge_types::{GeometryMessage, LinkMessage};
    use std::f64::consts::FRAC_PI_2;

    fn load(links: Vec<LinkMessage>) -> LoadMessage {
        LoadMessage::new(links)
    }

    #[test]
    fn elements_are_keyed_by_four_level_path() {
        let msg = load(vec![
            LinkMessage::new("src::link1")
                .with_geometry(GeometryMessage::sphere(0.5))
                .with_geometry(GeometryMessage::boxed(1.0, 2.0, 3.0)),
        ]);
        let d = SceneDescription::from_load_message("SceneGraph", &msg).unwrap();
        assert_eq!(d.len(), 2);

        let paths: Vec<String> = d.elements().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["/SceneGraph/src/link1/0", "/SceneGraph/src/link1/1"]);
        assert_eq!(
            d.frame_path("src::link1").unwrap().to_string(),
            "/SceneGraph/src/link1"
        );
    }

    #[test]
    fn malformed_link_name_is_fatal() {
        let msg = load(vec![LinkMessage::new("link1").with_geometry(GeometryMessage::sphere(0.5))]);
        let err = SceneDescription::from_load_message("p", &msg).unwrap_err();
        assert!(matches!(err, VizError::MalformedName(_)));
    }

    #[test]
    fn unsupported_shape_is_skipped_and_recorded() {
        let msg = load(vec![
            LinkMessage::new("src::a")
                .with_geometry(GeometryMessage::new(42, vec![]))
                .with_geometry(GeometryMessage::sphere(0.1)),
        ]);
        let d = SceneDescription::from_load_message("p", &msg).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(
            d.skipped(),
            &[SkippedGeometry {
                link: "src::a".to_string(),
                index: 0,
                shape_code: 42
            }]
        );
        // The surviving element keeps its original index.
        assert_eq!(d.elements().next().unwrap().path.index, 1);
    }

    #[test]
    fn parameter_count_mismatch_is_fatal() {
        let msg = load(vec![
            LinkMessage::new("src::a").with_geometry(GeometryMessage::new(1, vec![1.0, 2.0])),
        ]);
        let err = SceneDescription::from_load_message("p", &msg).unwrap_err();
        assert!(matches!(err, VizError::Geometry { .. }));
        assert!(!err.is_unsupported_shape());
    }

    #[test]
    fn frames_without_drawable_geometry_are_tracked_separately() {
        let msg = load(vec![
            LinkMessage::new("src::world"),
            LinkMessage::new("src::odd").with_geometry(GeometryMessage::new(0, vec![])),
        ]);
        let d = SceneDescription::from_load_message("p", &msg).unwrap();
        assert!(d.is_empty());
        assert!(d.is_empty_frame("src::world"));
        assert!(d.is_empty_frame("src::odd"));
        assert!(d.frame_path("src::world").is_none());
        assert!(!d.is_empty_frame("src::ghost"));
    }

    #[test]
    fn duplicate_links_collide() {
        let msg = load(vec![
            LinkMessage::new("src::a").with_geometry(GeometryMessage::sphere(0.1)),
            LinkMessage::new("src::a").with_geometry(GeometryMessage::sphere(0.2)),
        ]);
        let err = SceneDescription::from_load_message("p", &msg).unwrap_err();
        assert!(matches!(err, VizError::DuplicatePath(_)));
    }

    #[test]
    fn cylinder_renderer_transform_is_corrected_once() {
        let offset = RigidTransform::new(
            Vec3::new(0.0, 0.0, -0.5),
            Quaternion::from_axis_angle(Vec3::unit_y(), FRAC_PI_2),
        );
        let msg = load(vec![
            LinkMessage::new("src::pole")
                .with_geometry(GeometryMessage::cylinder(0.05, 1.0).with_pose(offset)),
        ]);
        let d = SceneDescription::from_load_message("p", &msg).unwrap();
        let element = d.elements().next().unwrap();

        let sent = element.renderer_transform();
        assert_eq!(sent.translation, offset.translation);
        // Renderer +Y must land where the engine's local +Z points.
        let expected_axis = offset.rotation.rotate(Vec3::unit_z());
        assert!(sent.rotation.rotate(Vec3::unit_y()).approx_eq(expected_axis, 1e-12));
        // The stored local pose stays uncorrected.
        let stored = element.local_transform.rotation;
        assert!((stored.w - offset.rotation.w).abs() < 1e-12);
        assert!((stored.y - offset.rotation.y).abs() < 1e-12);
        assert!(stored.x.abs() < 1e-12 && stored.z.abs() < 1e-12);
    }

    #[test]
    fn sphere_renderer_transform_is_unchanged() {
        let offset = RigidTransform::from_translation(Vec3::new(0.0, 0.0, 1.0));
        let msg = load(vec![
            LinkMessage::new("src::tip").with_geometry(GeometryMessage::sphere(0.1).with_pose(offset)),
        ]);
        let d = SceneDescription::from_load_message("p", &msg).unwrap();
        assert_eq!(d.elements().next().unwrap().renderer_transform(), offset);
    }
}
