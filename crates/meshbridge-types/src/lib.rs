//! `meshbridge-types` – the data contract between the physics engine, the
//! bridge, and the remote visualizer.
//!
//! # Modules
//!
//! - [`message`] – [`LoadMessage`] (one-shot geometry description) and
//!   [`PoseBundle`] (per-tick frame poses) as produced by the engine.
//! - [`path`] – [`ScenePath`], [`FramePath`] and [`ElementPath`]: the
//!   hierarchical keys that address objects in the remote scene tree.
//!
//! [`VizError`] is the error type shared by every crate in the workspace.

use meshbridge_geometry::ShapeError;
use thiserror::Error;

pub mod message;
pub mod path;

pub use message::{GeometryMessage, LinkMessage, LoadMessage, NamedPose, PoseBundle, PoseLog, PoseSample};
pub use path::{split_compound_name, ElementPath, FramePath, ScenePath, FRAME_DELIMITER};

/// Errors spanning scene loading, pose publishing and the remote transport.
#[derive(Error, Debug)]
pub enum VizError {
    /// A compound `"source::frame"` name without exactly one delimiter.
    #[error("malformed frame name {0:?}: expected \"source::frame\"")]
    MalformedName(String),

    /// A geometry element that could not be decoded.  Only
    /// [`ShapeError::Unsupported`] is recoverable; see
    /// [`VizError::is_unsupported_shape`].
    #[error("geometry {index} of link {link:?}: {source}")]
    Geometry {
        link: String,
        index: usize,
        #[source]
        source: ShapeError,
    },

    #[error("failed to read mesh {path}: {source}")]
    MeshLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Two elements resolved to the same scene path.
    #[error("scene path {0} is already occupied")]
    DuplicatePath(String),

    /// A pose bundle named a frame that was never loaded.
    #[error("frame {0:?} is not part of the loaded scene")]
    UnknownFrame(String),

    /// A command addressed a path with no object at or below it.
    #[error("no object at or below scene path {0}")]
    NoSuchPath(String),

    #[error("cannot connect to visualizer at {url}: {details}")]
    Connection { url: String, details: String },

    #[error("visualizer transport error: {0}")]
    Transport(String),

    /// The server answered a command with something other than `ok`.
    #[error("visualizer rejected {command}: {reply}")]
    Rejected { command: String, reply: String },

    #[error("command encoding error: {0}")]
    Encoding(String),

    #[error("visualizer did not answer {command} within {after_ms} ms")]
    Timeout { command: String, after_ms: u64 },

    #[error("visualizer connection is not open")]
    NotConnected,

    /// A publish schedule whose pacing cannot be expressed as wall-clock
    /// time.
    #[error("invalid publish schedule: {0}")]
    Schedule(String),

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

impl VizError {
    /// `true` for geometry the bridge skips instead of aborting on.
    pub fn is_unsupported_shape(&self) -> bool {
        matches!(
            self,
            VizError::Geometry {
                source: ShapeError::Unsupported(_),
                ..
            }
        )
    }
}
