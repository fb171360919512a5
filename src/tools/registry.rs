use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::tools::models::{ToolDefinition, ToolResult};

/// A named, schema-typed function the agent may invoke
#[async_trait]
pub trait AgentTool: Send + Sync + fmt::Debug {
    /// Definition advertised to the model
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool with model-provided arguments.
    ///
    /// Arguments the tool cannot interpret come back as an error result so the
    /// model can correct itself; `Err` is reserved for failures of the
    /// services the tool depends on.
    async fn call(&self, arguments: &Value) -> Result<ToolResult>;
}

/// Adapts a typed async function into an [`AgentTool`]
pub struct FnTool<I, F> {
    definition: ToolDefinition,
    func: F,
    _input: PhantomData<fn(I)>,
}

impl<I, F> FnTool<I, F> {
    /// Wrap `func`, whose input is deserialized from the call arguments
    pub fn new(definition: ToolDefinition, func: F) -> Self {
        Self {
            definition,
            func,
            _input: PhantomData,
        }
    }
}

impl<I, F> fmt::Debug for FnTool<I, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .field("input", &std::any::type_name::<I>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<I, F, Fut> AgentTool for FnTool<I, F>
where
    I: DeserializeOwned + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, arguments: &Value) -> Result<ToolResult> {
        let input: I = match serde_json::from_value(arguments.clone()) {
            Ok(input) => input,
            Err(e) => {
                warn!("Invalid arguments for tool '{}': {}", self.definition.name, e);
                return Ok(ToolResult::error(format!(
                    "Invalid arguments for tool '{}': {}",
                    self.definition.name, e
                )));
            }
        };

        (self.func)(input).await
    }
}

/// Dispatch table from tool name to implementation
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Map of tools by name
    tools: BTreeMap<String, Arc<dyn AgentTool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, rejecting duplicate names
    pub fn register(&mut self, tool: Arc<dyn AgentTool>) -> Result<()> {
        let name = tool.definition().name.clone();
        if self.tools.contains_key(&name) {
            return Err(Error::Tool(format!("Tool '{}' is already registered", name)));
        }

        debug!("Registered tool: {}", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Registers a typed async function as a tool
    pub fn register_fn<I, F, Fut>(&mut self, definition: ToolDefinition, func: F) -> Result<()>
    where
        I: DeserializeOwned + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(definition, func)))
    }

    /// Looks up a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of every registered tool, for binding to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition().clone()).collect()
    }

    /// Names of every registered tool
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls a tool by name; unknown names produce an error result
    #[instrument(skip(self, arguments), fields(tool.name = %name))]
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolResult> {
        match self.tools.get(name) {
            Some(tool) => tool.call(arguments).await,
            None => {
                warn!("Model requested unknown tool: {}", name);
                Ok(ToolResult::error(format!("Tool '{}' not found", name)))
            }
        }
    }
}
