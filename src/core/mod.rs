//! Core server framework.
//!
//! - `config`: environment-driven configuration
//! - `error`: tool, config and server error types
//! - `protocol`: JSON-RPC and MCP wire types
//! - `registry`: tool catalog and invocation dispatch
//! - `schema`: tool input schemas and argument validation
//! - `server`: protocol routing plus STDIO and HTTP transports

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
