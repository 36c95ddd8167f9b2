//! Tool catalog and invocation dispatcher.
//!
//! The registry holds two parallel tables built once at startup:
//! - `tools`: descriptors in declaration order, served by `tools/list`
//! - `handlers`: `ToolId` to handler, consulted by `tools/call`
//!
//! After startup the registry is shared behind an `Arc` and never mutated.
//! A call is only ever routed to a handler whose descriptor is in `tools`.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::core::error::ToolError;
use crate::core::protocol::{ToolDescriptor, ToolResult};
use crate::core::schema::ObjectSchema;

/// Identifier of every tool this server knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    HelloWorld,
    Calculate,
}

impl ToolId {
    pub const ALL: [ToolId; 2] = [ToolId::HelloWorld, ToolId::Calculate];

    /// Wire name used in `tools/list` and `tools/call`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::HelloWorld => "hello_world",
            ToolId::Calculate => "calculate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

/// A tool with strongly-typed arguments.
///
/// Implementors only deal with decoded `Args`; decoding and shaping the
/// result envelope happen in the blanket `ToolHandler` impl.
pub trait Tool: Send + Sync + 'static {
    /// Argument struct decoded from the call's `arguments` object
    type Args: DeserializeOwned;

    const ID: ToolId;

    fn description(&self) -> &'static str;

    fn input_schema(&self) -> ObjectSchema;

    /// Run the tool. `Ok` text becomes a success result, `Err` an error result.
    fn call(&self, args: Self::Args) -> Result<String, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: Self::ID.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Object-safe handler stored in the registry.
pub trait ToolHandler: Send + Sync {
    fn invoke(&self, arguments: Value) -> ToolResult;
}

impl<T: Tool> ToolHandler for T {
    fn invoke(&self, arguments: Value) -> ToolResult {
        let outcome = serde_json::from_value::<T::Args>(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))
            .and_then(|args| self.call(args));

        match outcome {
            Ok(text) => ToolResult::text(text),
            Err(e) => e.into(),
        }
    }
}

/// A decoded `tools/call` request.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    #[serde(rename = "name")]
    pub tool_name: String,
    /// Missing arguments are treated as an empty object
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

struct RegisteredTool {
    /// Position of the descriptor in `ToolRegistry::tools`
    index: usize,
    handler: Box<dyn ToolHandler>,
}

/// Registry of available MCP tools.
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    handlers: HashMap<ToolId, RegisteredTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create an empty registry. Tools are added with `register` during startup.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// Registering the same `ToolId` twice replaces the earlier descriptor
    /// and handler but keeps its original position in the listing.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let descriptor = tool.descriptor();
        let handler: Box<dyn ToolHandler> = Box::new(tool);

        if let Some(existing) = self.handlers.get_mut(&T::ID) {
            self.tools[existing.index] = descriptor;
            existing.handler = handler;
            return;
        }

        let index = self.tools.len();
        self.tools.push(descriptor);
        self.handlers.insert(T::ID, RegisteredTool { index, handler });
    }

    /// All advertised tools in registration order.
    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    fn resolve(&self, name: &str) -> Result<&RegisteredTool, ToolError> {
        ToolId::from_name(name)
            .and_then(|id| self.handlers.get(&id))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Turn a call request into a tool result.
    ///
    /// Never fails: unknown tools, schema violations and domain errors all
    /// come back as results with `is_error` set.
    pub fn dispatch(&self, request: InvocationRequest) -> ToolResult {
        let entry = match self.resolve(&request.tool_name) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(tool = %request.tool_name, "call to unknown tool");
                return e.into();
            }
        };

        let descriptor = &self.tools[entry.index];
        if let Err(e) = descriptor.input_schema.validate(&request.arguments) {
            debug!(tool = %descriptor.name, error = %e, "arguments rejected by schema");
            return e.into();
        }

        let result = entry.handler.invoke(request.arguments);
        debug!(tool = %descriptor.name, is_error = result.is_error, "tool call finished");
        result
    }
}
