//! `calculate` tool: four-function arithmetic on two operands.

use std::str::FromStr;

use serde::Deserialize;

use crate::core::error::ToolError;
use crate::core::registry::{Tool, ToolId, ToolRegistry};
use crate::core::schema::{ObjectSchema, PropertySchema};

/// Supported arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    /// Apply the operation. Division by zero is rejected before dividing.
    pub fn apply(&self, a: f64, b: f64) -> Result<f64, ToolError> {
        match self {
            Operation::Add => Ok(a + b),
            Operation::Subtract => Ok(a - b),
            Operation::Multiply => Ok(a * b),
            Operation::Divide => {
                // Also true for -0.0
                if b == 0.0 {
                    return Err(ToolError::DivisionByZero);
                }
                Ok(a / b)
            }
        }
    }
}

impl FromStr for Operation {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ToolError::UnknownOperation(s.to_string()))
    }
}

/// Render a number the way a JSON client would write it: `5` rather than
/// `5.0`, no negative zero, named non-finite values, and exponent form
/// (`1e+21`, `1e-7`) outside `[1e-6, 1e21)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponent_form(n)
    } else {
        n.to_string()
    }
}

/// Shortest round-trip `{:e}` output with an explicit sign on the exponent.
fn exponent_form(n: f64) -> String {
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

pub struct Calculate;

#[derive(Deserialize, Debug)]
pub struct CalculateArgs {
    /// Kept as a string so unrecognised operations reach the handler
    pub operation: String,
    pub a: f64,
    pub b: f64,
}

impl Tool for Calculate {
    type Args = CalculateArgs;
    const ID: ToolId = ToolId::Calculate;

    fn description(&self) -> &'static str {
        "Perform a simple calculation"
    }

    fn input_schema(&self) -> ObjectSchema {
        ObjectSchema::new()
            .required_property(
                "operation",
                PropertySchema::string("The operation to perform")
                    .one_of(Operation::ALL.iter().map(Operation::as_str)),
            )
            .required_property("a", PropertySchema::number("First operand"))
            .required_property("b", PropertySchema::number("Second operand"))
    }

    fn call(&self, args: CalculateArgs) -> Result<String, ToolError> {
        let operation: Operation = args.operation.parse()?;
        let result = operation.apply(args.a, args.b)?;

        Ok(format!(
            "Result: {} {} {} = {}",
            format_number(args.a),
            args.operation,
            format_number(args.b),
            format_number(result)
        ))
    }
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(Calculate);
}
