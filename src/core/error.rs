//! Error types for the server.
//!
//! Two families live here:
//! - `ToolError`: anything that goes wrong while answering a `tools/call`.
//!   These never escape as JSON-RPC errors; they are folded into an
//!   `isError: true` tool result whose text is the error's `Display`.
//! - `ServerError` / `ConfigError`: startup and transport faults. These are
//!   the only errors that end the process.

use thiserror::Error;

use crate::core::protocol::ToolResult;

/// Failure while resolving, validating or executing a tool call.
///
/// The `Display` output is the exact text sent back to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// Requested tool name is not in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were not a JSON object
    #[error("Invalid arguments: expected an object")]
    NotAnObject,

    /// A parameter listed as required was absent or null
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A declared parameter had the wrong JSON type
    #[error("Invalid type for parameter '{name}': expected {expected}")]
    InvalidType { name: String, expected: String },

    /// Arguments passed the schema check but could not be decoded
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Error: Division by zero")]
    DivisionByZero,

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::error(err.to_string())
    }
}

/// Invalid configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid transport mode '{0}'. Must be 'stdio', 'http', or 'both'")]
    InvalidTransport(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Invalid worker thread count '{0}'")]
    InvalidWorkers(String),
}

/// Fatal server error.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
