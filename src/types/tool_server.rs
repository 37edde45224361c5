//! Runtime types for in-process tool servers.
//!
//! Distinct from [`super::mcp`]'s `McpServerConfig` family, which describes
//! how to *reach* an external or SDK-hosted MCP server. These types describe
//! the tools a host registers to run entirely inside this process, addressed
//! by the CLI over `mcp_message` control frames.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Behavioral hints for a tool, surfaced to the CLI in `tools/list` replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// The tool only reads state; it never writes
    #[serde(skip_serializing_if = "Option::is_none", rename = "readOnlyHint")]
    pub read_only: Option<bool>,
    /// The tool may perform destructive updates
    #[serde(skip_serializing_if = "Option::is_none", rename = "destructiveHint")]
    pub destructive: Option<bool>,
    /// The tool interacts with an open-ended external world (e.g. the web)
    #[serde(skip_serializing_if = "Option::is_none", rename = "openWorldHint")]
    pub open_world: Option<bool>,
    /// Human-readable display title, distinct from `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One part of a [`ToolResult`]'s content list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },
    /// Inline image data
    Image {
        /// Base64-encoded image bytes
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// A reference to an external resource
    Resource {
        /// Resource URI
        uri: String,
        /// Inline text content, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentPart {
    /// Construct a text content part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// The outcome of a tool call: an ordered list of content parts plus an
/// error flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    /// Ordered content parts
    pub content: Vec<ContentPart>,
    /// Whether the call represents a tool-level failure rather than a
    /// protocol-level one
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result with a single text content part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            is_error: false,
        }
    }

    /// A failed result with a single text content part describing the error.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            is_error: true,
        }
    }
}

/// Future type returned by a [`Tool`] handler.
pub type ToolCallFuture = Pin<Box<dyn Future<Output = Result<ToolResult>> + Send>>;

/// A tool handler: takes the call's argument map, returns its result.
pub type ToolHandlerFn = Arc<dyn Fn(serde_json::Map<String, Value>) -> ToolCallFuture + Send + Sync>;

/// One tool exposed by a [`ToolServer`].
#[derive(Clone)]
pub struct Tool {
    /// Tool name, unique within its server
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema describing the `arguments` object `tools/call` must supply
    pub input_schema: Value,
    /// Optional behavioral hints
    pub annotations: Option<ToolAnnotations>,
    handler: ToolHandlerFn,
}

impl Tool {
    /// Build a tool from its definition and an async handler.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            annotations: None,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Attach behavioral annotations.
    #[must_use]
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Invoke this tool's handler.
    pub async fn call(&self, args: serde_json::Map<String, Value>) -> Result<ToolResult> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// A named, in-process collection of tools.
#[derive(Clone, Debug)]
pub struct ToolServer {
    /// Server name, as referenced by `server_name` in `mcp_message` requests
    pub name: String,
    tools: HashMap<String, Tool>,
    tool_order: Vec<String>,
}

impl ToolServer {
    /// Create an empty named server.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: HashMap::new(),
            tool_order: Vec::new(),
        }
    }

    /// Register a tool, overwriting any existing tool of the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        if !self.tools.contains_key(&tool.name) {
            self.tool_order.push(tool.name.clone());
        }
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    /// List tools in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&Tool> {
        self.tool_order.iter().filter_map(|n| self.tools.get(n)).collect()
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }
}
