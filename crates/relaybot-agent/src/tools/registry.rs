//! Tool Registry — the name→tool map the agent loop dispatches through.
//!
//! Registration order is preserved: `get_definitions` and the glob filter
//! both walk tools in the order they were registered, so clients see a
//! stable catalog.
//!
//! The execution contract: the registry never raises into the agent loop.
//! Unknown tools, invalid parameters, and tool failures all come back as
//! error strings the model can read and correct.

use std::collections::HashMap;
use std::sync::Arc;

use relaybot_core::types::ToolDefinition;
use tracing::{debug, info, warn};

use super::base::Tool;
use super::schedule::ScheduleTool;
use super::storage::{StoragePutFileTool, StoragePutTextTool, StorageService};
use crate::patterns;

// ─────────────────────────────────────────────
// Auto-registration dependencies
// ─────────────────────────────────────────────

/// Optional services tools may need. `auto_register_all` instantiates and
/// registers every tool whose dependencies are present and skips the rest —
/// an explicit registration table, resolved at startup.
#[derive(Clone, Default)]
pub struct ToolDeps {
    /// Object-store service (enables the storage upload tools).
    pub storage: Option<Arc<StorageService>>,
    /// Cron service (enables the schedule tool).
    pub cron: Option<Arc<relaybot_cron::CronService>>,
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order of tool names.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Overwrites any previous tool with the same name,
    /// keeping its original position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "registered tool");
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Unregister a tool by name. Returns the removed tool, if any.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let removed = self.tools.remove(name);
        if removed.is_some() {
            self.order.retain(|n| n != name);
            info!(tool = name, "unregistered tool");
        }
        removed
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Iterate tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(move |name| self.tools.get(name))
    }

    /// Get the LLM-facing definitions for all registered tools.
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.iter().map(|t| t.to_definition()).collect()
    }

    /// Get definitions scoped by glob patterns, preserving registration
    /// order. An empty list or `["*"]` returns everything.
    pub fn filtered_definitions(&self, tool_list: &[String]) -> Vec<ToolDefinition> {
        let names = patterns::filter_names(tool_list, self.order.iter().map(|s| s.as_str()));
        names
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool by name with the given parameters.
    ///
    /// Parameters are validated against the tool's declared schema before
    /// dispatch. The LLM always gets a `String` back, even on failure.
    pub async fn execute(&self, name: &str, params: HashMap<String, serde_json::Value>) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "tool not found");
                return format!("Error: Tool '{name}' not found");
            }
        };

        if let Some(errors) = validate_params(&tool.parameters(), &params) {
            warn!(tool = name, errors = %errors, "invalid tool parameters");
            return format!("Error: Invalid parameters for tool '{name}': {errors}");
        }

        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                format!("Error executing {name}: {e}")
            }
        }
    }

    /// Register every tool whose dependencies are satisfied.
    ///
    /// Tools already present under the same name are left alone.
    pub fn auto_register_all(&mut self, deps: &ToolDeps) {
        if let Some(ref storage) = deps.storage {
            if !self.has("storage_put_file") {
                self.register(Arc::new(StoragePutFileTool::new(storage.clone())));
            }
            if !self.has("storage_put_text") {
                self.register(Arc::new(StoragePutTextTool::new(storage.clone())));
            }
        } else {
            debug!("storage service not configured, skipping storage tools");
        }

        if let Some(ref cron) = deps.cron {
            if !self.has("cron") {
                self.register(Arc::new(ScheduleTool::new(cron.clone())));
            }
        } else {
            debug!("cron service not provided, skipping schedule tool");
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Schema validation
// ─────────────────────────────────────────────

/// Validate `params` against a tool's declared JSON schema.
///
/// Checks required fields and primitive type agreement for declared
/// properties. Returns a joined error string, or `None` when valid.
pub fn validate_params(
    schema: &serde_json::Value,
    params: &HashMap<String, serde_json::Value>,
) -> Option<String> {
    let mut errors: Vec<String> = Vec::new();

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for req in required {
            if let Some(key) = req.as_str() {
                if !params.contains_key(key) {
                    errors.push(format!("missing required parameter '{key}'"));
                }
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in params {
            let Some(prop) = properties.get(key) else {
                continue;
            };
            let Some(expected) = prop.get("type").and_then(|t| t.as_str()) else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok {
                errors.push(format!("parameter '{key}' should be of type {expected}"));
            }
        }
    }

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}
