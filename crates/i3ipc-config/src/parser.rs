//! KDL configuration parser
//!
//! ```kdl
//! socket "~/.i3/ipc.sock"
//! log-level "debug"
//! decode {
//!     strict true
//!     max-payload-size 1048576
//! }
//! ```

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse the configuration file if it exists, defaults otherwise
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette, so rebuild the span from offset/len
        let span = miette::SourceSpan::from((e.span.offset(), e.span.len()));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "socket" => {
                let path = string_value(node, content)?;
                config.socket_path = Some(shellexpand::tilde(path).into_owned().into());
            }
            "log-level" => {
                let level = string_value(node, content)?;
                config.log_level = level
                    .parse()
                    .map_err(|message| invalid(node, content, message))?;
            }
            "decode" => {
                config.decode = parse_decode(node, content)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_decode(node: &kdl::KdlNode, source: &str) -> Result<DecodeConfig, ConfigError> {
    let mut decode = DecodeConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "strict" => {
                    decode.strict = first_entry(child)?
                        .value()
                        .as_bool()
                        .ok_or_else(|| invalid(child, source, "expected true or false".to_string()))?;
                }
                "max-payload-size" => {
                    let size = first_entry(child)?
                        .value()
                        .as_i64()
                        .ok_or_else(|| invalid(child, source, "expected an integer".to_string()))?;
                    decode.max_payload_size = u32::try_from(size)
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| {
                            invalid(child, source, format!("{} is out of range", size))
                        })?;
                }
                name => {
                    tracing::warn!("Unknown decode option: {}", name);
                }
            }
        }
    }

    Ok(decode)
}

fn first_entry(node: &kdl::KdlNode) -> Result<&kdl::KdlEntry, ConfigError> {
    node.entries()
        .first()
        .ok_or_else(|| ConfigError::MissingValue {
            key: node.name().value().to_string(),
        })
}

fn string_value<'a>(node: &'a kdl::KdlNode, source: &str) -> Result<&'a str, ConfigError> {
    first_entry(node)?
        .value()
        .as_string()
        .ok_or_else(|| invalid(node, source, "expected a string".to_string()))
}

/// Error pointing at the first value of `node`, or its name if it has none
fn invalid(node: &kdl::KdlNode, source: &str, message: String) -> ConfigError {
    let (offset, len) = match node.entries().first() {
        Some(entry) => (entry.span().offset(), entry.span().len()),
        None => (node.name().span().offset(), node.name().span().len()),
    };
    ConfigError::InvalidValue {
        key: node.name().value().to_string(),
        message,
        src: source.to_string(),
        span: miette::SourceSpan::from((offset, len)),
    }
}
