//! Typed reply records
//!
//! Field names follow the i3 IPC documentation. Every field is optional on
//! the wire: i3 and sway omit or retype some of them depending on version, so
//! missing values fall back to their defaults.

use serde::Deserialize;

use crate::reply::lenient::{DecodeLenient, Fields};

/// Geometry of a window, container, output or workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl DecodeLenient for Rect {
    fn decode_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            x: fields.get("x"),
            y: fields.get("y"),
            width: fields.get("width"),
            height: fields.get("height"),
        }
    }
}

/// A workspace as reported by `GET_WORKSPACES`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    /// Container id (newer i3 and sway only)
    pub id: Option<i64>,
    /// Workspace number, -1 for named workspaces without a number
    pub num: i64,
    pub name: String,
    /// Visible on its output
    pub visible: bool,
    /// Holds the input focus
    pub focused: bool,
    pub urgent: bool,
    pub rect: Rect,
    /// Name of the output showing this workspace
    pub output: String,
}

impl DecodeLenient for Workspace {
    fn decode_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            id: fields.optional("id"),
            num: fields.get("num"),
            name: fields.get("name"),
            visible: fields.get("visible"),
            focused: fields.get("focused"),
            urgent: fields.get("urgent"),
            rect: fields.nested("rect"),
            output: fields.get("output"),
        }
    }
}

/// An output (monitor) as reported by `GET_OUTPUTS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub active: bool,
    pub primary: bool,
    /// Workspace currently shown, `None` for inactive outputs
    pub current_workspace: Option<String>,
    pub rect: Rect,
}

impl DecodeLenient for Output {
    fn decode_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            name: fields.get("name"),
            active: fields.get("active"),
            primary: fields.get("primary"),
            current_workspace: fields.optional("current_workspace"),
            rect: fields.nested("rect"),
        }
    }
}

/// X11 properties of the window wrapped by a leaf node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowProperties {
    pub title: Option<String>,
    pub instance: Option<String>,
    pub class: Option<String>,
    pub window_role: Option<String>,
    pub transient_for: Option<i64>,
}

impl DecodeLenient for WindowProperties {
    fn decode_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            title: fields.optional("title"),
            instance: fields.optional("instance"),
            class: fields.optional("class"),
            window_role: fields.optional("window_role"),
            transient_for: fields.optional("transient_for"),
        }
    }
}

/// Result of one sub-command of a `RUN_COMMAND` request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    /// Human-readable reason when `success` is false
    #[serde(default)]
    pub error: Option<String>,
    /// Set when the command could not be parsed at all
    #[serde(default)]
    pub parse_error: Option<bool>,
}

impl CommandOutcome {
    /// Convert into a `Result`, using the peer's message on failure
    pub fn into_result(self) -> Result<(), crate::IpcError> {
        if self.success {
            Ok(())
        } else {
            Err(crate::IpcError::CommandFailed {
                message: self
                    .error
                    .unwrap_or_else(|| "command failed without an error message".to_string()),
            })
        }
    }
}

/// Daemon version as reported by `GET_VERSION`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
    /// e.g. "4.22 (2023-01-02)"
    #[serde(default)]
    pub human_readable: String,
    #[serde(default)]
    pub loaded_config_file_name: Option<String>,
}

/// Kind of a node in the layout tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    #[default]
    Con,
    FloatingCon,
    Workspace,
    Dockarea,
    #[serde(other)]
    Unknown,
}

/// Border style of a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Border {
    #[default]
    Normal,
    None,
    Pixel,
    /// Client-side decorations (sway)
    Csd,
    #[serde(other)]
    Unknown,
}

/// Layout of a container's children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Splith,
    Splitv,
    Stacked,
    Tabbed,
    Dockarea,
    Output,
    #[serde(other)]
    Unknown,
}

/// Split orientation of a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    None,
    Horizontal,
    Vertical,
    #[serde(other)]
    Unknown,
}
