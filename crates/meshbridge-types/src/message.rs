//! Messages produced by the physics engine.
//!
//! [`LoadMessage`] arrives once, before the simulation starts, and lists
//! every visual element the engine knows about.  A [`PoseBundle`] arrives on
//! every publish tick with the current pose of each tracked frame.

use meshbridge_geometry::{Quaternion, RigidTransform, Rgba, Vec3};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Scene load
// ────────────────────────────────────────────────────────────────────────────

/// One-shot description of all registered visual geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadMessage {
    pub links: Vec<LinkMessage>,
}

impl LoadMessage {
    pub fn new(links: Vec<LinkMessage>) -> Self {
        Self { links }
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_geometries(&self) -> usize {
        self.links.iter().map(|l| l.geometry.len()).sum()
    }
}

/// A link (body frame) and the visual elements attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMessage {
    /// Compound `"source::frame"` name.
    pub name: String,
    #[serde(default)]
    pub geometry: Vec<GeometryMessage>,
}

impl LinkMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: GeometryMessage) -> Self {
        self.geometry.push(geometry);
        self
    }
}

/// Raw geometry record as the engine emits it.
///
/// `shape_code` and `float_data` are interpreted by
/// [`meshbridge_geometry::Shape::from_code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryMessage {
    pub shape_code: i32,
    #[serde(default)]
    pub float_data: Vec<f64>,
    /// Mesh file path; empty for primitives.
    #[serde(default)]
    pub string_data: String,
    /// Element pose in its link frame: `[x, y, z]`.
    #[serde(default)]
    pub position: [f64; 3],
    /// Element orientation in its link frame: `[w, x, y, z]`.
    #[serde(default = "identity_quaternion")]
    pub quaternion: [f64; 4],
    /// `[r, g, b, a]`, each in `[0, 1]`.
    #[serde(default = "default_color")]
    pub color: [f64; 4],
}

fn identity_quaternion() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

fn default_color() -> [f64; 4] {
    let c = Rgba::default();
    [c.r, c.g, c.b, c.a]
}

impl GeometryMessage {
    pub fn new(shape_code: i32, float_data: Vec<f64>) -> Self {
        Self {
            shape_code,
            float_data,
            string_data: String::new(),
            position: [0.0; 3],
            quaternion: identity_quaternion(),
            color: default_color(),
        }
    }

    pub fn boxed(size_x: f64, size_y: f64, size_z: f64) -> Self {
        Self::new(1, vec![size_x, size_y, size_z])
    }

    pub fn sphere(radius: f64) -> Self {
        Self::new(2, vec![radius])
    }

    pub fn cylinder(radius: f64, length: f64) -> Self {
        Self::new(3, vec![radius, length])
    }

    pub fn mesh(path: impl Into<String>) -> Self {
        let mut g = Self::new(4, Vec::new());
        g.string_data = path.into();
        g
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = [color.r, color.g, color.b, color.a];
        self
    }

    pub fn with_pose(mut self, pose: RigidTransform) -> Self {
        let t = pose.translation;
        let q = pose.rotation;
        self.position = [t.x, t.y, t.z];
        self.quaternion = [q.w, q.x, q.y, q.z];
        self
    }

    /// Element pose in its link frame.  The quaternion is normalized.
    pub fn local_transform(&self) -> RigidTransform {
        RigidTransform::new(
            Vec3::from(self.position),
            Quaternion::from(self.quaternion).normalized(),
        )
    }

    pub fn rgba(&self) -> Rgba {
        Rgba::from(self.color)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-tick poses
// ────────────────────────────────────────────────────────────────────────────

/// One named frame pose inside a [`PoseBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPose {
    /// Compound `"source::frame"` name.
    pub name: String,
    pub pose: RigidTransform,
}

/// Ordered collection of frame poses for a single publish tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseBundle {
    poses: Vec<NamedPose>,
}

impl PoseBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            poses: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, pose: RigidTransform) {
        self.poses.push(NamedPose {
            name: name.into(),
            pose,
        });
    }

    /// Overwrite the pose at `index`, keeping its name.
    pub fn set_pose(&mut self, index: usize, pose: RigidTransform) {
        if let Some(p) = self.poses.get_mut(index) {
            p.pose = pose;
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.poses.get(index).map(|p| p.name.as_str())
    }

    pub fn pose(&self, index: usize) -> Option<&RigidTransform> {
        self.poses.get(index).map(|p| &p.pose)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedPose> {
        self.poses.iter()
    }
}

impl<'a> IntoIterator for &'a PoseBundle {
    type Item = &'a NamedPose;
    type IntoIter = std::slice::Iter<'a, NamedPose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

/// A pose bundle stamped with simulation time (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub time: f64,
    pub bundle: PoseBundle,
}

/// Time-indexed sequence of pose bundles recorded during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseLog {
    pub samples: Vec<PoseSample>,
}

impl PoseLog {
    pub fn record(&mut self, time: f64, bundle: PoseBundle) {
        self.samples.push(PoseSample { time, bundle });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_message_defaults_from_json() {
        let json = r#"{ "shape_code": 2, "float_data": [0.5] }"#;
        let g: GeometryMessage = serde_json::from_str(json).unwrap();
        assert_eq!(g.quaternion, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(g.position, [0.0; 3]);
        assert_eq!(g.local_transform(), RigidTransform::identity());
        assert!((g.rgba().a - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn with_pose_round_trips_through_local_transform() {
        let pose = RigidTransform::new(
            Vec3::new(0.1, 0.2, 0.3),
            Quaternion::from_axis_angle(Vec3::unit_y(), 0.8),
        );
        let g = GeometryMessage::sphere(1.0).with_pose(pose);
        let back = g.local_transform();
        assert!(back.translation.approx_eq(pose.translation, 1e-12));
        assert!((back.rotation.w - pose.rotation.w).abs() < 1e-12);
        assert!((back.rotation.y - pose.rotation.y).abs() < 1e-12);
    }

    #[test]
    fn unnormalized_quaternion_is_normalized() {
        let mut g = GeometryMessage::sphere(1.0);
        g.quaternion = [2.0, 0.0, 0.0, 0.0];
        assert_eq!(g.local_transform().rotation, Quaternion::identity());
    }

    #[test]
    fn load_message_counts() {
        let msg = LoadMessage::new(vec![
            LinkMessage::new("a::x")
                .with_geometry(GeometryMessage::sphere(1.0))
                .with_geometry(GeometryMessage::boxed(1.0, 1.0, 1.0)),
            LinkMessage::new("a::y").with_geometry(GeometryMessage::cylinder(0.1, 1.0)),
        ]);
        assert_eq!(msg.num_links(), 2);
        assert_eq!(msg.num_geometries(), 3);
    }

    #[test]
    fn pose_bundle_accessors() {
        let mut bundle = PoseBundle::with_capacity(2);
        bundle.push("src::a", RigidTransform::identity());
        bundle.push("src::b", RigidTransform::from_translation(Vec3::unit_x()));
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.name(1), Some("src::b"));
        assert_eq!(bundle.name(2), None);

        bundle.set_pose(0, RigidTransform::from_translation(Vec3::unit_z()));
        assert_eq!(bundle.pose(0).unwrap().translation, Vec3::unit_z());
        let names: Vec<&str> = bundle.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["src::a", "src::b"]);
    }

    #[test]
    fn pose_log_records_samples_in_order() {
        let mut log = PoseLog::default();
        assert!(log.is_empty());
        log.record(0.0, PoseBundle::new());
        log.record(0.1, PoseBundle::new());
        assert_eq!(log.len(), 2);
        assert!(log.samples[1].time > log.samples[0].time);
    }
}
