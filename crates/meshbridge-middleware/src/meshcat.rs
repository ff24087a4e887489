//! `meshcat-server` client.
//!
//! [`MeshcatClient`] drives an already-running `meshcat-server` over its
//! ZeroMQ command socket.  The wire format is the server's own and is reused
//! unchanged:
//!
//! * one REQ/REP round trip per command;
//! * a three-frame request `[type, path, msgpack(command)]`, where `type` is
//!   `set_object`, `set_transform` or `delete` and `path` is the absolute
//!   tree path under the `/meshcat` root;
//! * the command body is a msgpack map holding the same `type` and `path`
//!   plus either an `object` (three.js JSON object format) or a `matrix`
//!   (16 floats, column-major).
//!
//! The client is synchronous.  It owns a single-threaded Tokio runtime and
//! blocks on every round trip, so a slow server stalls the caller.  Use
//! [`MeshcatClient::with_request_timeout`] to bound that.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use meshbridge_geometry::Matrix4;
use meshbridge_types::{ScenePath, VizError};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::scene::{GeometrySpec, RemoteScene, SceneObject};

/// Command socket `meshcat-server` listens on by default.
pub const DEFAULT_ZMQ_URL: &str = "tcp://127.0.0.1:6000";

/// Every path the server accepts lives under this root.
pub const MESHCAT_ROOT: &str = "/meshcat";

/// How long [`RemoteScene::connect`] waits for the server before giving up.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

const SPHERE_SEGMENTS: u32 = 20;
const CYLINDER_SEGMENTS: u32 = 50;
/// three.js `DoubleSide`.
const DOUBLE_SIDE: u32 = 2;

// ────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Command<'a> {
    SetObject { path: &'a str, object: ObjectData<'a> },
    SetTransform { path: &'a str, matrix: [f64; 16] },
    Delete { path: &'a str },
}

impl Command<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            Command::SetObject { .. } => "set_object",
            Command::SetTransform { .. } => "set_transform",
            Command::Delete { .. } => "delete",
        }
    }

    fn path(&self) -> &str {
        match self {
            Command::SetObject { path, .. }
            | Command::SetTransform { path, .. }
            | Command::Delete { path } => path,
        }
    }
}

#[derive(Serialize)]
struct ObjectData<'a> {
    metadata: Metadata,
    geometries: [GeometryData<'a>; 1],
    materials: [MaterialData; 1],
    object: MeshData,
}

#[derive(Serialize)]
struct Metadata {
    version: f64,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum GeometryData<'a> {
    #[serde(rename = "BoxGeometry")]
    Box {
        uuid: String,
        width: f64,
        height: f64,
        depth: f64,
    },
    #[serde(rename = "SphereGeometry", rename_all = "camelCase")]
    Sphere {
        uuid: String,
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
    #[serde(rename = "CylinderGeometry", rename_all = "camelCase")]
    Cylinder {
        uuid: String,
        radius_top: f64,
        radius_bottom: f64,
        height: f64,
        radial_segments: u32,
    },
    #[serde(rename = "_meshfile_geometry")]
    MeshFile {
        uuid: String,
        format: &'static str,
        data: &'a str,
        resources: BTreeMap<String, String>,
    },
}

#[derive(Serialize)]
struct MaterialData {
    uuid: String,
    #[serde(rename = "type")]
    kind: &'static str,
    color: u32,
    reflectivity: f64,
    side: u32,
    transparent: bool,
    opacity: f64,
}

#[derive(Serialize)]
struct MeshData {
    uuid: String,
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: String,
    material: String,
    matrix: [f64; 16],
}

/// Render `path` as the server sees it, e.g. `/meshcat/SceneGraph/src/link1`.
pub fn wire_path(path: &ScenePath) -> String {
    if path.is_root() {
        MESHCAT_ROOT.to_string()
    } else {
        format!("{MESHCAT_ROOT}{path}")
    }
}

fn lower_object(object: &SceneObject) -> ObjectData<'_> {
    let geometry_uuid = Uuid::new_v4().to_string();
    let material_uuid = Uuid::new_v4().to_string();

    let geometry = match &object.geometry {
        GeometrySpec::Box {
            width,
            height,
            depth,
        } => GeometryData::Box {
            uuid: geometry_uuid.clone(),
            width: *width,
            height: *height,
            depth: *depth,
        },
        GeometrySpec::Sphere { radius } => GeometryData::Sphere {
            uuid: geometry_uuid.clone(),
            radius: *radius,
            width_segments: SPHERE_SEGMENTS,
            height_segments: SPHERE_SEGMENTS,
        },
        GeometrySpec::Cylinder { radius, height } => GeometryData::Cylinder {
            uuid: geometry_uuid.clone(),
            radius_top: *radius,
            radius_bottom: *radius,
            height: *height,
            radial_segments: CYLINDER_SEGMENTS,
        },
        GeometrySpec::ObjMesh { contents, .. } => GeometryData::MeshFile {
            uuid: geometry_uuid.clone(),
            format: "obj",
            data: contents,
            resources: BTreeMap::new(),
        },
    };

    let material = MaterialData {
        uuid: material_uuid.clone(),
        kind: "MeshLambertMaterial",
        color: object.material.color,
        reflectivity: 0.5,
        side: DOUBLE_SIDE,
        transparent: object.material.is_transparent(),
        opacity: object.material.opacity,
    };

    ObjectData {
        metadata: Metadata {
            version: 4.5,
            kind: "Object",
        },
        geometries: [geometry],
        materials: [material],
        object: MeshData {
            uuid: Uuid::new_v4().to_string(),
            kind: "Mesh",
            geometry: geometry_uuid,
            material: material_uuid,
            matrix: Matrix4::identity().to_column_major(),
        },
    }
}

fn encode(command: &Command<'_>) -> Result<Vec<u8>, VizError> {
    rmp_serde::to_vec_named(command).map_err(|e| VizError::Encoding(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// MeshcatClient
// ────────────────────────────────────────────────────────────────────────────

/// Synchronous client for a running `meshcat-server`.
///
/// Nothing touches the network until [`RemoteScene::connect`].  The socket
/// is closed by [`RemoteScene::disconnect`] or, failing that, on drop.
///
/// Any reply other than `ok` fails the command with
/// [`VizError::Rejected`] and does not count towards
/// [`commands_sent`](Self::commands_sent).
pub struct MeshcatClient {
    url: String,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    conn: Option<Connection>,
    commands_sent: u64,
}

struct Connection {
    runtime: Runtime,
    socket: ReqSocket,
}

impl MeshcatClient {
    /// Create a client for the command socket at `url`
    /// (e.g. [`DEFAULT_ZMQ_URL`]).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            conn: None,
            commands_sent: 0,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound every round trip.  `None` (the default) waits indefinitely.
    ///
    /// A request that times out leaves the REQ socket mid-exchange, so the
    /// connection is dropped and later commands fail with
    /// [`VizError::NotConnected`].
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    fn send(&mut self, command: &Command<'_>) -> Result<(), VizError> {
        let payload = encode(command)?;
        let type_name = command.type_name();
        let path = command.path();

        let conn = self.conn.as_mut().ok_or(VizError::NotConnected)?;

        let mut request = ZmqMessage::from(type_name.to_string());
        request.push_back(Bytes::from(path.to_string()));
        request.push_back(Bytes::from(payload));

        let socket = &mut conn.socket;
        let exchange = async move {
            match socket.send(request).await {
                Ok(()) => socket.recv().await,
                Err(e) => Err(e),
            }
        };

        let outcome = match self.request_timeout {
            Some(limit) => conn
                .runtime
                .block_on(async { tokio::time::timeout(limit, exchange).await })
                .map_err(|_| VizError::Timeout {
                    command: type_name.to_string(),
                    after_ms: limit.as_millis() as u64,
                }),
            None => Ok(conn.runtime.block_on(exchange)),
        };

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                self.drop_connection();
                return Err(VizError::Transport(e.to_string()));
            }
            Err(timeout) => {
                self.drop_connection();
                return Err(timeout);
            }
        };

        // The exchange completed, so the socket stays usable after a refusal.
        let answer = reply.get(0).map(|f| String::from_utf8_lossy(f).into_owned());
        if answer.as_deref() != Some("ok") {
            let reply = answer.unwrap_or_else(|| "<empty reply>".to_string());
            warn!(command = type_name, path, %reply, "meshcat-server rejected command");
            return Err(VizError::Rejected {
                command: type_name.to_string(),
                reply,
            });
        }
        self.commands_sent += 1;
        debug!(command = type_name, path, "meshcat command acknowledged");
        Ok(())
    }

    fn drop_connection(&mut self) {
        if let Some(Connection { runtime, socket }) = self.conn.take() {
            // The socket's background tasks need the runtime to wind down.
            let _guard = runtime.enter();
            drop(socket);
        }
    }
}

impl RemoteScene for MeshcatClient {
    fn connect(&mut self) -> Result<(), VizError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let connection_error = |details: String| VizError::Connection {
            url: self.url.clone(),
            details,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| connection_error(e.to_string()))?;

        let url = self.url.as_str();
        let limit = self.connect_timeout;
        let socket = runtime
            .block_on(async {
                let mut socket = ReqSocket::new();
                let attempt = tokio::time::timeout(limit, socket.connect(url)).await;
                match attempt {
                    Ok(Ok(())) => Ok(socket),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("no answer within {} ms", limit.as_millis())),
                }
            })
            .map_err(connection_error)?;

        info!(url = %self.url, "connected to meshcat-server");
        self.conn = Some(Connection { runtime, socket });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), VizError> {
        if self.conn.is_some() {
            self.drop_connection();
            info!(url = %self.url, commands = self.commands_sent, "disconnected from meshcat-server");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn delete_subtree(&mut self, path: &ScenePath) -> Result<(), VizError> {
        let path = wire_path(path);
        self.send(&Command::Delete { path: &path })
    }

    fn set_object(&mut self, path: &ScenePath, object: &SceneObject) -> Result<(), VizError> {
        let path = wire_path(path);
        self.send(&Command::SetObject {
            path: &path,
            object: lower_object(object),
        })
    }

    fn set_transform(&mut self, path: &ScenePath, matrix: &Matrix4) -> Result<(), VizError> {
        let path = wire_path(path);
        self.send(&Command::SetTransform {
            path: &path,
            matrix: matrix.to_column_major(),
        })
    }
}

impl Drop for MeshcatClient {
    fn drop(&mut self) {
        self.drop_connection();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
