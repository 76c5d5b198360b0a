//! The `load_skill` tool

use async_trait::async_trait;
use serde_json::{json, Value};
use skillshelf_skills::{
    event_channel, DefaultLocations, EventSender, OsFs, SkillRequest, SkillResponse,
    SkillSelectors, SkillsService,
};
use skillshelf_types::{SkillEvent, Tool};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ToolConfig;
use crate::render::render_message;
use crate::{ToolError, ToolFunction};

/// Name the host addresses the tool by
pub const TOOL_NAME: &str = "load_skill";

const DESCRIPTION: &str = "Load domain knowledge from an available skill. Skills provide specialized \
knowledge, workflows, best practices and standards. Supply exactly one of: list=true to see every \
skill, search='term' to filter by name, description or metadata, info='name' for metadata only, \
or load='name' to read the full skill content. A loaded skill reports its directory: read any \
companion or reference files it lists from there with your file reading tool. When several \
skills directories define the same name, the one from the highest-precedence directory is used.";

/// Tool giving an agent progressive access to skills
pub struct LoadSkillTool {
    service: Arc<SkillsService>,
}

impl LoadSkillTool {
    /// Wrap an existing service
    pub fn new(service: Arc<SkillsService>) -> Self {
        Self { service }
    }

    /// Build the registry from `config` and wrap it
    pub async fn mount(
        config: &ToolConfig,
        settings_layers: Vec<Vec<PathBuf>>,
        defaults: DefaultLocations,
    ) -> Result<Self, ToolError> {
        let (events, _) = event_channel();
        Self::mount_with_events(config, settings_layers, defaults, events).await
    }

    /// Like [`LoadSkillTool::mount`], publishing to the host's event channel
    ///
    /// Receivers created before the call see the `skills:discovered` event of
    /// the initial scan.
    pub async fn mount_with_events(
        config: &ToolConfig,
        settings_layers: Vec<Vec<PathBuf>>,
        defaults: DefaultLocations,
        events: EventSender,
    ) -> Result<Self, ToolError> {
        debug!("Mounting {} with config: {:?}", TOOL_NAME, config);
        let service = SkillsService::with_events(
            Arc::new(OsFs),
            config.sources(settings_layers, defaults),
            events,
        )
        .await?;

        let snapshot = service.snapshot().await;
        info!(
            "Mounted {} with {} skills from {} sources",
            TOOL_NAME,
            snapshot.len(),
            snapshot.roots().len()
        );

        Ok(Self::new(Arc::new(service)))
    }

    /// Shared registry service
    pub fn service(&self) -> &Arc<SkillsService> {
        &self.service
    }

    /// Skill list to append to the agent's system prompt
    pub async fn system_prompt(&self) -> String {
        self.service.snapshot().await.generate_system_prompt()
    }

    /// Run an already decoded request and render the result
    pub async fn call(&self, request: &SkillRequest) -> Result<Value, ToolError> {
        debug!("{} {}", TOOL_NAME, request.operation());
        let snapshot = self.service.snapshot().await;
        let sources = snapshot.sources();
        let response = self.service.execute_on(snapshot, request).await?;
        to_output(&response, &sources)
    }
}

#[async_trait]
impl ToolFunction for LoadSkillTool {
    fn definition(&self) -> Tool {
        Tool::function(
            TOOL_NAME,
            DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "list": {
                        "type": "boolean",
                        "description": "If true, return the list of all available skills"
                    },
                    "search": {
                        "type": "string",
                        "description": "Search term to filter skills by name, description or metadata"
                    },
                    "info": {
                        "type": "string",
                        "description": "Get metadata for a specific skill without loading full content"
                    },
                    "load": {
                        "type": "string",
                        "description": "Name of skill to load (e.g., 'design-patterns', 'python-standards')"
                    },
                    "skill_name": {
                        "type": "string",
                        "description": "Same as 'load'; cannot be combined with it"
                    }
                },
                "required": [],
                "additionalProperties": false
            }),
        )
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let request = decode(args)?;
        self.call(&request).await
    }
}

/// Decode tool arguments into exactly one request
pub fn decode(args: Value) -> Result<SkillRequest, ToolError> {
    let selectors: SkillSelectors = if args.is_null() {
        SkillSelectors::default()
    } else {
        serde_json::from_value(args).map_err(ToolError::InvalidArguments)?
    };
    Ok(SkillRequest::try_from(selectors)?)
}

/// `{ "message": ..., ...payload }`
fn to_output(response: &SkillResponse, sources: &[PathBuf]) -> Result<Value, ToolError> {
    let message = render_message(response, sources);
    let mut output = serde_json::to_value(response).map_err(ToolError::Encode)?;
    if let Value::Object(fields) = &mut output {
        fields.insert("message".to_string(), Value::String(message));
    }
    Ok(output)
}

/// Add this tool's event names to a host capability list
///
/// Existing entries are kept and names already present are not repeated.
pub fn declare_events(events: &mut Vec<String>) {
    for name in SkillEvent::NAMES {
        if !events.iter().any(|e| e == name) {
            events.push(name.to_string());
        }
    }
}
