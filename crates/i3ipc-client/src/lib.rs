//! Client for the i3 window manager's IPC protocol
//!
//! This crate talks to a running i3 (or sway) over its Unix socket. It
//! enables callers to:
//! - Run i3 commands and see whether they succeeded
//! - Query workspaces, outputs, marks, binding modes and the version
//! - Fetch the layout tree with parent and focus-order links rebuilt
//!
//! ## Architecture
//!
//! - `codec`: length-prefixed `i3-ipc` frames
//! - `Session`: one connection, one request/reply exchange at a time
//! - `reply`: per-request decoders with best-effort field decoding
//! - `Tree`: arena-backed layout tree with parent/focus reconstruction
//! - `IpcError`: error taxonomy for all of the above
//!
//! ## Protocol
//!
//! Each message is `"i3-ipc"`, a native-endian u32 payload length, a
//! native-endian u32 message type, then the payload. Replies carry the
//! request's type and arrive in request order; there are no request ids.
//! Event subscription is not supported.

pub mod codec;
mod error;
pub mod reply;
mod session;
mod socket;
mod tree;
mod types;

pub use codec::{MessageType, DEFAULT_MAX_PAYLOAD_SIZE};
pub use error::{ErrorKind, IpcError};
pub use reply::{DecodePolicy, FieldMismatch, Reply};
pub use session::{Session, SessionOptions, SessionState};
pub use socket::{get_socket_path, I3SOCK_ENV, SWAYSOCK_ENV};
pub use tree::{Ancestors, Node, NodeIndex, Tree};
pub use types::{
    Border, CommandOutcome, Layout, NodeType, Orientation, Output, Rect, Version,
    WindowProperties, Workspace,
};
