//! `meshbridge-middleware` – talks to the remote visualizer.
//!
//! The bridge never speaks the visualizer protocol directly.  It issues
//! path-addressed commands through the [`RemoteScene`] trait, and an
//! implementation translates them into whatever the other side understands.
//!
//! # Modules
//!
//! - [`scene`] – the [`RemoteScene`] trait and the renderer-facing
//!   [`SceneObject`] description.
//! - [`meshcat`] – [`MeshcatClient`]: ZeroMQ + msgpack client for a running
//!   `meshcat-server`.
//! - [`memory`] – [`InMemoryScene`]: records commands in a path-keyed map,
//!   for tests and dry runs.

pub mod memory;
pub mod meshcat;
pub mod scene;

pub use memory::{InMemoryScene, RecordedCommand};
pub use meshcat::{MeshcatClient, DEFAULT_ZMQ_URL};
pub use scene::{GeometrySpec, Material, RemoteScene, SceneObject};
