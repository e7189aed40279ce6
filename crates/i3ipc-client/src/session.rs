//! Request/reply session over one IPC connection
//!
//! The i3 protocol has no request ids: replies come back in the order the
//! requests were sent. A [`Session`] therefore runs strictly one exchange at a
//! time. `&mut self` on every request keeps a single owner from overlapping
//! exchanges; tasks sharing a session wrap it in `tokio::sync::Mutex` so each
//! lock guard covers one complete write-then-read cycle.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use crate::codec::{self, MessageType, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::error::IpcError;
use crate::reply::{self, DecodePolicy, Reply};
use crate::socket::get_socket_path;
use crate::tree::Tree;
use crate::types::{CommandOutcome, Output, Version, Workspace};

/// Tunables for a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// How field type mismatches in record replies are treated
    pub decode_policy: DecodePolicy,
    /// Largest reply payload accepted, in bytes
    pub max_payload_size: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            decode_policy: DecodePolicy::Lenient,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// Where the session is in its request/reply cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for the next request
    Idle,
    /// A request was started and its reply has not been fully read
    AwaitingReply,
}

/// A connection to the i3 IPC socket
///
/// # Example
///
/// ```ignore
/// let mut session = Session::connect_from_env().await?;
/// session.run_command("workspace 2").await?;
/// let tree = session.get_tree().await?;
/// session.close().await?;
/// ```
#[derive(Debug)]
pub struct Session<S> {
    /// `None` once the session is closed
    stream: Option<S>,
    state: SessionState,
    options: SessionOptions,
}

impl Session<UnixStream> {
    /// Connect to the socket at `path`
    ///
    /// # Errors
    ///
    /// Returns `IpcError::ConnectionFailed` if the socket cannot be reached.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, IpcError> {
        Self::connect_with_options(path, SessionOptions::default()).await
    }

    /// Connect to the socket at `path` with explicit options
    pub async fn connect_with_options(
        path: impl AsRef<Path>,
        options: SessionOptions,
    ) -> Result<Self, IpcError> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| IpcError::ConnectionFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(path = %path.display(), "Connected to i3 IPC socket");
        Ok(Self::with_options(stream, options))
    }

    /// Discover the socket path (see [`get_socket_path`]) and connect
    pub async fn connect_from_env() -> Result<Self, IpcError> {
        let path = get_socket_path()?;
        Self::connect(path).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream
    pub fn new(stream: S) -> Self {
        Self::with_options(stream, SessionOptions::default())
    }

    /// Wrap an already connected stream with explicit options
    pub fn with_options(stream: S, options: SessionOptions) -> Self {
        Self {
            stream: Some(stream),
            state: SessionState::Idle,
            options,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Whether [`Session::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Send one request and wait for its reply payload
    ///
    /// The state moves to [`SessionState::AwaitingReply`] before the frame is
    /// written and back to [`SessionState::Idle`] once a complete reply frame
    /// has been read. If the exchange is abandoned in between (I/O error,
    /// corrupt frame, or the future being dropped) the session stays in
    /// `AwaitingReply` and further requests fail with
    /// `IpcError::Desynchronized`.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::NotConnected` after `close()`, connection errors from
    /// the socket, protocol errors for malformed frames, and
    /// `IpcError::UnexpectedReplyType` if the reply's type differs from the
    /// request's.
    pub async fn send(&mut self, message_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, IpcError> {
        let stream = self.stream.as_mut().ok_or(IpcError::NotConnected)?;
        if self.state == SessionState::AwaitingReply {
            return Err(IpcError::Desynchronized);
        }

        // Encoding can fail on size; nothing has been sent yet at that point
        let request = codec::encode_frame(message_type.code(), payload)?;
        self.state = SessionState::AwaitingReply;
        debug!(
            message_type = ?message_type,
            length = payload.len(),
            "Sending i3 IPC request"
        );
        codec::write_encoded_frame(stream, &request).await?;
        let frame = codec::read_frame(stream, self.options.max_payload_size).await?;
        self.state = SessionState::Idle;

        debug!(
            reply_type = frame.message_type,
            length = frame.payload.len(),
            "Received i3 IPC reply"
        );

        if frame.message_type != message_type.code() {
            return Err(IpcError::UnexpectedReplyType {
                expected: message_type.code(),
                actual: frame.message_type,
            });
        }

        Ok(frame.payload)
    }

    /// Send a request and decode the reply according to its type
    pub async fn request(&mut self, message_type: MessageType, payload: &str) -> Result<Reply, IpcError> {
        let reply = self.send(message_type, payload.as_bytes()).await?;
        reply::decode_reply(message_type, &reply, self.options.decode_policy)
    }

    /// Run `command` and fail if i3 reports it unsuccessful
    ///
    /// Only the first outcome is inspected; use [`Session::run_commands`] to
    /// see every `;`-separated sub-command.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::CommandFailed` with i3's message if the command was
    /// rejected, `IpcError::UnexpectedShape` if the reply holds no outcome.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // `exec /bin/true` makes a good no-op
    /// session.run_command("exec /bin/true").await?;
    /// ```
    pub async fn run_command(&mut self, command: &str) -> Result<(), IpcError> {
        let outcomes = self.run_commands(command).await?;
        match outcomes.into_iter().next() {
            Some(outcome) => outcome.into_result(),
            None => Err(IpcError::UnexpectedShape {
                expected: "non-empty array",
                found: "empty array",
            }),
        }
    }

    /// Run `commands` and return one outcome per sub-command
    pub async fn run_commands(&mut self, commands: &str) -> Result<Vec<CommandOutcome>, IpcError> {
        let reply = self.send(MessageType::RunCommand, commands.as_bytes()).await?;
        reply::decode_command(&reply)
    }

    /// List all workspaces
    pub async fn get_workspaces(&mut self) -> Result<Vec<Workspace>, IpcError> {
        let reply = self.send(MessageType::GetWorkspaces, b"").await?;
        reply::decode_workspaces(&reply)
    }

    /// List all outputs
    pub async fn get_outputs(&mut self) -> Result<Vec<Output>, IpcError> {
        let reply = self.send(MessageType::GetOutputs, b"").await?;
        reply::decode_outputs(&reply, self.options.decode_policy)
    }

    /// Fetch the layout tree with parents and focus order resolved
    pub async fn get_tree(&mut self) -> Result<Tree, IpcError> {
        let reply = self.send(MessageType::GetTree, b"").await?;
        reply::decode_tree(&reply, self.options.decode_policy)
    }

    pub async fn get_marks(&mut self) -> Result<Vec<String>, IpcError> {
        match self.request(MessageType::GetMarks, "").await? {
            Reply::Marks(marks) => Ok(marks),
            other => Err(mismatched_reply(MessageType::GetMarks, &other)),
        }
    }

    pub async fn get_version(&mut self) -> Result<Version, IpcError> {
        match self.request(MessageType::GetVersion, "").await? {
            Reply::Version(version) => Ok(version),
            other => Err(mismatched_reply(MessageType::GetVersion, &other)),
        }
    }

    pub async fn get_binding_modes(&mut self) -> Result<Vec<String>, IpcError> {
        match self.request(MessageType::GetBindingModes, "").await? {
            Reply::BindingModes(modes) => Ok(modes),
            other => Err(mismatched_reply(MessageType::GetBindingModes, &other)),
        }
    }

    /// Contents of the config file i3 last loaded
    pub async fn get_config(&mut self) -> Result<String, IpcError> {
        match self.request(MessageType::GetConfig, "").await? {
            Reply::Config(config) => Ok(config),
            other => Err(mismatched_reply(MessageType::GetConfig, &other)),
        }
    }

    /// Broadcast a tick event carrying `payload` to i3's subscribers
    pub async fn send_tick(&mut self, payload: &str) -> Result<bool, IpcError> {
        match self.request(MessageType::SendTick, payload).await? {
            Reply::Tick(success) => Ok(success),
            other => Err(mismatched_reply(MessageType::SendTick, &other)),
        }
    }

    /// Shut down and release the connection
    ///
    /// Calling this again, or on a session whose peer already hung up, is a
    /// no-op. Every later request fails with `IpcError::NotConnected`.
    pub async fn close(&mut self) -> Result<(), IpcError> {
        self.state = SessionState::Idle;
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(IpcError::SendFailed(e)),
        }
    }
}

/// `decode_reply` is keyed by request type, so this only fires if that mapping
/// is broken
fn mismatched_reply(request: MessageType, reply: &Reply) -> IpcError {
    IpcError::UnexpectedShape {
        expected: match request {
            MessageType::GetMarks => "marks reply",
            MessageType::GetVersion => "version reply",
            MessageType::GetBindingModes => "binding modes reply",
            MessageType::GetConfig => "config reply",
            MessageType::SendTick => "tick reply",
            _ => "typed reply",
        },
        found: match reply {
            Reply::Command(_) => "command reply",
            Reply::Workspaces(_) => "workspaces reply",
            Reply::Outputs(_) => "outputs reply",
            Reply::Tree(_) => "tree reply",
            Reply::Marks(_) => "marks reply",
            Reply::Version(_) => "version reply",
            Reply::BindingModes(_) => "binding modes reply",
            Reply::Config(_) => "config reply",
            Reply::Tick(_) => "tick reply",
        },
    }
}
