//! `hello_world` tool: greets the caller by name.

use serde::Deserialize;

use crate::core::error::ToolError;
use crate::core::registry::{Tool, ToolId, ToolRegistry};
use crate::core::schema::{ObjectSchema, PropertySchema};

pub struct HelloWorld;

#[derive(Deserialize, Debug)]
pub struct HelloArgs {
    pub name: String,
}

impl Tool for HelloWorld {
    type Args = HelloArgs;
    const ID: ToolId = ToolId::HelloWorld;

    fn description(&self) -> &'static str {
        "A simple hello world tool that greets the user"
    }

    fn input_schema(&self) -> ObjectSchema {
        ObjectSchema::new().required_property("name", PropertySchema::string("The name to greet"))
    }

    fn call(&self, args: HelloArgs) -> Result<String, ToolError> {
        Ok(format!("Hello, {}! Welcome to the custom MCP server.", args.name))
    }
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(HelloWorld);
}
