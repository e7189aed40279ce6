//! Configuration data model

use std::path::PathBuf;

/// Largest reply payload accepted by default (64 MiB)
///
/// Must match `i3ipc_client::DEFAULT_MAX_PAYLOAD_SIZE`; the CLI tests check it.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Socket to connect to instead of discovering one
    pub socket_path: Option<PathBuf>,
    pub log_level: LogLevel,
    pub decode: DecodeConfig,
}

/// Reply decoding settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Fail on any field type mismatch instead of skipping the field
    pub strict: bool,
    pub max_payload_size: u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}
