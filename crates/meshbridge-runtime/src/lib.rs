//! `meshbridge-runtime` – the bridge itself.
//!
//! # Modules
//!
//! - [`scene_description`] – [`SceneDescription`]: the decoded, path-keyed
//!   record of every visual element in a [`LoadMessage`][meshbridge_types::LoadMessage].
//! - [`visualizer`] – [`MeshcatVisualizer`]: builds the remote scene once and
//!   forwards each [`PoseBundle`][meshbridge_types::PoseBundle] as frame-level
//!   transforms.
//! - [`schedule`] – [`PublishLoop`]: fixed-period publishing from a
//!   [`PoseSource`], paced against the wall clock.
//! - [`telemetry`] – [`init_tracing`]: console logging plus optional OTLP
//!   span export.
//!
//! The remote side is anything implementing
//! [`RemoteScene`][meshbridge_middleware::RemoteScene]; use
//! [`MeshcatClient`][meshbridge_middleware::MeshcatClient] for a live
//! visualizer and [`InMemoryScene`][meshbridge_middleware::InMemoryScene] for
//! tests and dry runs.

pub mod scene_description;
pub mod schedule;
pub mod telemetry;
pub mod visualizer;

pub use scene_description::{GeometryElement, SceneDescription, SkippedGeometry};
pub use schedule::{LoopSummary, PoseSource, PublishLoop};
pub use telemetry::{init_tracing, TracerProviderGuard};
pub use visualizer::{
    MeshcatVisualizer, PublishReport, VisualizerConfig, DEFAULT_DRAW_PERIOD, DEFAULT_PREFIX,
    POSE_BUNDLE_PORT,
};
