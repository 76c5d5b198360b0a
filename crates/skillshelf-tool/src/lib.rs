//! Skillshelf host tool
//!
//! Exposes the skills registry to an agent as a single `load_skill` function
//! call. Arguments arrive as JSON, are decoded into exactly one
//! [`SkillRequest`], and the answer goes back as a markdown `message` plus
//! the structured payload.

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod config;
pub mod load_skill;
pub mod render;

use async_trait::async_trait;
use serde_json::Value;
use skillshelf_skills::SkillError;
use skillshelf_types::Tool;
use thiserror::Error;

pub use config::ToolConfig;
pub use load_skill::{declare_events, LoadSkillTool, TOOL_NAME};
pub use skillshelf_skills::SkillRequest;

/// Errors returned to the host from a tool call
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    /// The registry rejected the request
    #[error(transparent)]
    Skill(#[from] SkillError),

    /// The response could not be encoded as JSON
    #[error("Failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A function the host agent can call
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// Schema handed to the model
    fn definition(&self) -> Tool;

    /// Run one call
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}
