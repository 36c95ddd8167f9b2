//! Tool implementations.
//!
//! Each tool lives in its own module and exports a `register` function that
//! adds it to the registry. `initialize_tools` is the single place that
//! decides what the server advertises, and in which order.

pub mod calc;
pub mod hello;

use std::sync::Arc;

use crate::core::registry::ToolRegistry;

/// Build the tool catalog served for the lifetime of the process.
///
/// Add new registrations here following the same pattern:
/// `your_tool::register(&mut registry);`
pub fn initialize_tools() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    hello::register(&mut registry);
    calc::register(&mut registry);

    Arc::new(registry)
}
