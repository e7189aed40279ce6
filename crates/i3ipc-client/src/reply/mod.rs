//! Reply decoders, one per request type
//!
//! A reply is decoded according to the request that produced it, never by
//! sniffing the payload. Record-shaped replies (tree, workspaces, outputs) go
//! through the field-by-field decoder, but only the tree and outputs honour
//! [`DecodePolicy::Lenient`]; a workspace record of the wrong shape is always
//! an error. The small fixed-shape replies use serde derive directly.

pub(crate) mod lenient;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::codec::MessageType;
use crate::error::IpcError;
use crate::tree::Tree;
use crate::types::{CommandOutcome, Output, Version, Workspace};

pub use lenient::{DecodePolicy, FieldMismatch};

use lenient::{decode_list, json_kind, settle};

/// A decoded reply, tagged by the request type that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Command(Vec<CommandOutcome>),
    Workspaces(Vec<Workspace>),
    Outputs(Vec<Output>),
    Tree(Tree),
    Marks(Vec<String>),
    Version(Version),
    BindingModes(Vec<String>),
    Config(String),
    Tick(bool),
}

/// Decode `payload` as the reply to a `request` message
pub fn decode_reply(
    request: MessageType,
    payload: &[u8],
    policy: DecodePolicy,
) -> Result<Reply, IpcError> {
    Ok(match request {
        MessageType::RunCommand => Reply::Command(decode_command(payload)?),
        MessageType::GetWorkspaces => Reply::Workspaces(decode_workspaces(payload)?),
        MessageType::GetOutputs => Reply::Outputs(decode_outputs(payload, policy)?),
        MessageType::GetTree => Reply::Tree(decode_tree(payload, policy)?),
        MessageType::GetMarks => Reply::Marks(decode_strict(payload)?),
        MessageType::GetVersion => Reply::Version(decode_strict(payload)?),
        MessageType::GetBindingModes => Reply::BindingModes(decode_strict(payload)?),
        MessageType::GetConfig => Reply::Config(decode_config(payload)?),
        MessageType::SendTick => Reply::Tick(decode_tick(payload)?),
    })
}

/// Decode a `RUN_COMMAND` reply: one outcome per sub-command
pub fn decode_command(payload: &[u8]) -> Result<Vec<CommandOutcome>, IpcError> {
    let value = parse(payload)?;
    expect_array(&value)?;
    serde_json::from_value(value).map_err(IpcError::MalformedJson)
}

/// Decode a `GET_WORKSPACES` reply
///
/// Any field of unexpected type fails the decode with
/// `IpcError::TypeMismatch`, whatever the session's [`DecodePolicy`].
pub fn decode_workspaces(payload: &[u8]) -> Result<Vec<Workspace>, IpcError> {
    let value = parse(payload)?;
    let items = expect_array(&value)?;
    let mut mismatches = Vec::new();
    let workspaces = decode_list(items, "", &mut mismatches);
    settle(workspaces, mismatches, DecodePolicy::Strict, "workspaces")
}

/// Decode a `GET_OUTPUTS` reply
pub fn decode_outputs(payload: &[u8], policy: DecodePolicy) -> Result<Vec<Output>, IpcError> {
    let value = parse(payload)?;
    let items = expect_array(&value)?;
    let mut mismatches = Vec::new();
    let outputs = decode_list(items, "", &mut mismatches);
    settle(outputs, mismatches, policy, "outputs")
}

/// Decode a `GET_TREE` reply and reconstruct parents and focus order
///
/// Under [`DecodePolicy::Lenient`] a field of unexpected JSON type does not
/// fail the decode: the field keeps its default and the rest of the tree is
/// returned.
pub fn decode_tree(payload: &[u8], policy: DecodePolicy) -> Result<Tree, IpcError> {
    let value = parse(payload)?;
    if !value.is_object() {
        return Err(IpcError::UnexpectedShape {
            expected: "object",
            found: json_kind(&value),
        });
    }
    let mut mismatches = Vec::new();
    let mut tree = Tree::decode(&value, &mut mismatches);
    tree.reconstruct();
    settle(tree, mismatches, policy, "tree")
}

fn decode_config(payload: &[u8]) -> Result<String, IpcError> {
    #[derive(Deserialize)]
    struct ConfigReply {
        config: String,
    }
    decode_strict::<ConfigReply>(payload).map(|reply| reply.config)
}

fn decode_tick(payload: &[u8]) -> Result<bool, IpcError> {
    #[derive(Deserialize)]
    struct TickReply {
        success: bool,
    }
    decode_strict::<TickReply>(payload).map(|reply| reply.success)
}

fn decode_strict<T: DeserializeOwned>(payload: &[u8]) -> Result<T, IpcError> {
    serde_json::from_slice(payload).map_err(IpcError::MalformedJson)
}

fn parse(payload: &[u8]) -> Result<Value, IpcError> {
    serde_json::from_slice(payload).map_err(IpcError::MalformedJson)
}

fn expect_array(value: &Value) -> Result<&[Value], IpcError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or(IpcError::UnexpectedShape {
            expected: "array",
            found: json_kind(value),
        })
}
