//! [`MeshcatVisualizer`] – mirrors engine geometry and poses into a remote
//! scene.
//!
//! Construction does all the heavy lifting: the load message is decoded into
//! a [`SceneDescription`], every element is lowered to a renderer object, the
//! old subtree under the prefix is wiped and the new objects are placed with
//! their fixed local transforms.  After that, each [`publish`] only sends one
//! `set_transform` per tracked frame; the elements inherit it.
//!
//! [`publish`]: MeshcatVisualizer::publish

use std::collections::HashSet;
use std::time::Duration;

use meshbridge_geometry::Shape;
use meshbridge_middleware::{GeometrySpec, Material, RemoteScene, SceneObject};
use meshbridge_types::{split_compound_name, LoadMessage, PoseBundle, PoseLog, ScenePath, VizError};
use tracing::{debug, info, instrument, warn};

use crate::scene_description::{GeometryElement, SceneDescription};

/// Index of the pose-bundle input.  The bridge has exactly one input.
pub const POSE_BUNDLE_PORT: usize = 0;

pub const DEFAULT_PREFIX: &str = "SceneGraph";

/// Publish period used when the caller does not pick one (~30 Hz).
pub const DEFAULT_DRAW_PERIOD: Duration = Duration::from_micros(33_333);

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerConfig {
    /// Top-level scene node owned by this bridge.  Everything under it is
    /// deleted at construction.
    pub prefix: String,
    /// How often the host should call [`MeshcatVisualizer::publish`].
    pub draw_period: Duration,
    /// Treat pose entries for frames that were never loaded as errors instead
    /// of warnings.
    pub strict_frames: bool,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            draw_period: DEFAULT_DRAW_PERIOD,
            strict_frames: false,
        }
    }
}

/// Outcome of one [`MeshcatVisualizer::publish`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// `set_transform` commands sent.
    pub poses_sent: usize,
    /// Entries for loaded frames that have nothing to draw.
    pub frames_without_geometry: usize,
    /// Entries naming frames that were never loaded, in bundle order.
    pub unknown_frames: Vec<String>,
}

/// Adapter between an engine's pose output and a [`RemoteScene`].
pub struct MeshcatVisualizer<S: RemoteScene> {
    scene: S,
    config: VisualizerConfig,
    description: SceneDescription,
    warned_unknown: HashSet<String>,
    publishes: u64,
}

impl<S: RemoteScene> MeshcatVisualizer<S> {
    /// Build the remote scene from `load`.
    ///
    /// The load message is fully validated and every mesh file read before
    /// the remote scene is touched, so a malformed message leaves the
    /// visualizer as it was.
    ///
    /// # Errors
    ///
    /// * [`VizError::MalformedName`], [`VizError::Geometry`],
    ///   [`VizError::DuplicatePath`] from decoding the message.
    /// * [`VizError::MeshLoad`] when an `.obj` file cannot be read.
    /// * [`VizError::Connection`] and transport errors from the scene.
    #[instrument(skip_all, fields(prefix = %config.prefix))]
    pub fn new(mut scene: S, load: &LoadMessage, config: VisualizerConfig) -> Result<Self, VizError> {
        let description = SceneDescription::from_load_message(&config.prefix, load)?;

        let mut placements = Vec::with_capacity(description.len());
        for element in description.elements() {
            placements.push((
                element.path.to_scene_path(),
                lower_element(element)?,
                element.renderer_transform().to_matrix4(),
            ));
        }

        scene.connect()?;
        scene.delete_subtree(&description.prefix_path())?;
        for (path, object, local) in &placements {
            scene.set_object(path, object)?;
            scene.set_transform(path, local)?;
        }

        info!(
            links = load.num_links(),
            elements = description.len(),
            skipped = description.skipped().len(),
            "scene loaded"
        );

        Ok(Self {
            scene,
            config,
            description,
            warned_unknown: HashSet::new(),
            publishes: 0,
        })
    }

    /// Send the current pose of every frame in `bundle`.
    ///
    /// Bundle order is preserved.  Frames without geometry are skipped
    /// quietly.  Unknown frames are reported in the returned
    /// [`PublishReport`] and logged once per name, or rejected with
    /// [`VizError::UnknownFrame`] in strict mode.
    ///
    /// Every name is checked before the first `set_transform`, so a malformed
    /// or (in strict mode) unknown name leaves the scene untouched.  A
    /// transport failure partway through can still leave earlier frames
    /// moved.
    pub fn publish(&mut self, bundle: &PoseBundle) -> Result<PublishReport, VizError> {
        let mut report = PublishReport::default();
        let mut updates = Vec::with_capacity(bundle.len());

        for entry in bundle {
            split_compound_name(&entry.name)?;

            match self.description.frame_path(&entry.name) {
                Some(path) => updates.push((path, entry.pose.to_matrix4())),
                None if self.description.is_empty_frame(&entry.name) => {
                    report.frames_without_geometry += 1;
                }
                None if self.config.strict_frames => {
                    return Err(VizError::UnknownFrame(entry.name.clone()));
                }
                None => report.unknown_frames.push(entry.name.clone()),
            }
        }

        for name in &report.unknown_frames {
            if self.warned_unknown.insert(name.clone()) {
                warn!(frame = %name, "pose for unknown frame ignored");
            }
        }

        for (path, matrix) in updates {
            self.scene.set_transform(path, &matrix)?;
            report.poses_sent += 1;
        }

        self.publishes += 1;
        debug!(poses = report.poses_sent, publish = self.publishes, "pose bundle published");
        Ok(report)
    }

    /// Replay a recorded pose log as a scrubbable animation.
    ///
    /// Not available: the call is logged and rejected.
    pub fn animate(&self, log: &PoseLog) -> Result<(), VizError> {
        warn!(samples = log.len(), "animation replay requested but not implemented");
        Err(VizError::Unimplemented("animation replay"))
    }

    pub fn draw_period(&self) -> Duration {
        self.config.draw_period
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn description(&self) -> &SceneDescription {
        &self.description
    }

    /// Number of successful [`publish`](Self::publish) calls.
    pub fn publish_count(&self) -> u64 {
        self.publishes
    }

    pub fn prefix_path(&self) -> ScenePath {
        self.description.prefix_path()
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn disconnect(&mut self) -> Result<(), VizError> {
        self.scene.disconnect()
    }

    pub fn into_scene(self) -> S {
        self.scene
    }
}

/// Renderer object for one element: primitive in renderer conventions plus a
/// Lambert material carrying the element's color and alpha.
fn lower_element(element: &GeometryElement) -> Result<SceneObject, VizError> {
    let geometry = match &element.shape {
        Shape::Box {
            size_x,
            size_y,
            size_z,
        } => GeometrySpec::Box {
            width: *size_x,
            height: *size_y,
            depth: *size_z,
        },
        Shape::Sphere { radius } => GeometrySpec::Sphere { radius: *radius },
        Shape::Cylinder { radius, length } => GeometrySpec::Cylinder {
            radius: *radius,
            height: *length,
        },
        Shape::Mesh { path } => {
            let contents = std::fs::read_to_string(path).map_err(|source| VizError::MeshLoad {
                path: path.clone(),
                source,
            })?;
            GeometrySpec::ObjMesh {
                source_path: path.clone(),
                contents,
            }
        }
    };

    let material = Material::lambert(element.color.pack_rgb()).with_opacity(element.color.opacity());
    Ok(SceneObject::new(geometry, material))
}
