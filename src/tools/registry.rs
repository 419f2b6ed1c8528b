//! Tool registry for managing available tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::tools::tool::{Tool, ToolInfo};

/// A tool together with the identifier it was registered under.
#[derive(Clone)]
pub struct RegisteredTool {
    pub id: Uuid,
    pub tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn info(&self) -> ToolInfo {
        ToolInfo::from_tool(self.id, self.tool.as_ref())
    }
}

/// Registry of available tools.
///
/// Registration takes `&mut self`, so it only happens while the registry is
/// still owned by the node's bootstrap. Once handed to a
/// [`Queue`](crate::queue::Queue) it is read-only.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    /// Union of requirement tags across registered tools.
    hardware: BTreeMap<String, bool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, returning its freshly assigned identifier.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Uuid {
        let id = Uuid::new_v4();
        self.hardware.insert(tool.requirements().to_string(), true);
        tracing::debug!(
            tool = %tool.name(),
            tool_id = %id,
            requirement = %tool.requirements(),
            "Registered tool"
        );
        self.tools.push(RegisteredTool { id, tool });
        id
    }

    /// Get a tool by identifier. First match wins.
    pub fn get(&self, id: &Uuid) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| &t.id == id)
    }

    /// Resolve a tool from its wire identifier. Unparseable identifiers
    /// simply match nothing.
    pub fn lookup(&self, id: &str) -> Option<&RegisteredTool> {
        let id = Uuid::parse_str(id.trim()).ok()?;
        self.get(&id)
    }

    /// Snapshot every registered tool's metadata.
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(RegisteredTool::info).collect()
    }

    /// The advertised hardware capability set.
    pub fn hardware(&self) -> &BTreeMap<String, bool> {
        &self.hardware
    }

    /// Get the number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.len()
    }
}
