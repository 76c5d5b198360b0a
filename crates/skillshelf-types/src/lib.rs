//! Skillshelf Types - shared types for the skillshelf workspace
//!
//! Tool definitions handed to the host agent and the events the skill
//! registry publishes for observers.

use serde::{Deserialize, Serialize};

pub mod events;

pub use events::SkillEvent;

// ============================================================================
// Tool Calling Types (OpenAI-compatible)
// ============================================================================

/// A tool definition following OpenAI's function calling schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl Tool {
    pub fn function(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
                strict: None,
            },
        }
    }

    /// Tool name as the host will address it
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serializes_type_field() {
        let tool = Tool::function("load_skill", "Load skills", serde_json::json!({"type": "object"}));
        let value = serde_json::to_value(&tool).unwrap();

        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "load_skill");
        assert!(value["function"].get("strict").is_none());
        assert_eq!(tool.name(), "load_skill");
    }
}
