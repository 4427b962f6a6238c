//! MoSPI MCP integration.
//!
//! The statistics API is an MCP tool server: a single HTTP endpoint
//! accepting JSON-RPC bodies and answering in a line-delimited
//! event-stream envelope. This module defines the `ToolClient` seam the
//! normalizers depend on, the tool-result envelope, and payload
//! extraction; `transport` holds the reqwest implementation.

pub mod transport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::FetchError;

pub use transport::McpClient;

// ---------------------------------------------------------------------------
// Tool names
// ---------------------------------------------------------------------------

// The four MoSPI tools, in the order the stateful remote requires them.
// Steps 1-3 must run before any data call; their results are discarded.
pub const TOOL_DESCRIBE_API: &str = "1_know_about_mospi_api";
pub const TOOL_GET_INDICATORS: &str = "2_get_indicators";
pub const TOOL_GET_METADATA: &str = "3_get_metadata";
pub const TOOL_GET_DATA: &str = "4_get_data";

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// One content block inside a tool result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// The result envelope of a `tools/call` invocation.
///
/// The payload arrives in one of two shapes: a structured field, or a
/// content block whose text is JSON-encoded. `extract` is total over both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
}

/// Where a tool result carries its payload.
enum PayloadShape<'a> {
    /// `structuredContent.data` is present.
    Structured(&'a Value),
    /// The first content block holds JSON-encoded text.
    Text(&'a str),
}

impl ToolResult {
    fn payload_shape(&self) -> Option<PayloadShape<'_>> {
        if let Some(data) = self
            .structured_content
            .as_ref()
            .and_then(|sc| sc.get("data"))
        {
            return Some(PayloadShape::Structured(data));
        }
        match self.content.first() {
            Some(block) if !block.text.is_empty() => Some(PayloadShape::Text(&block.text)),
            _ => None,
        }
    }

    /// Pull the typed payload out of the envelope.
    ///
    /// Checks the structured shape first, then falls back to parsing the
    /// text block (preferring its nested `data` field when present).
    pub fn extract<T: serde::de::DeserializeOwned>(&self) -> Result<T, FetchError> {
        match self.payload_shape() {
            Some(PayloadShape::Structured(data)) => Ok(serde_json::from_value(data.clone())?),
            Some(PayloadShape::Text(text)) => {
                let parsed: Value = serde_json::from_str(text)?;
                let data = match parsed.get("data") {
                    Some(d) => d.clone(),
                    None => parsed,
                };
                Ok(serde_json::from_value(data)?)
            }
            None => Err(FetchError::Extraction),
        }
    }
}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Abstraction over the MCP tool endpoint.
///
/// The production implementation is [`McpClient`]; tests substitute
/// recording fakes to drive the normalizers without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Perform the `initialize` handshake and return the session handle.
    async fn init_session(&self) -> Result<String, FetchError>;

    /// Invoke a named tool within a session.
    ///
    /// Callers supply strictly increasing request ids per session; the
    /// remote protocol is stateful and order-dependent.
    async fn call_tool(
        &self,
        session: &str,
        tool: &str,
        arguments: Value,
        request_id: u64,
    ) -> Result<ToolResult, FetchError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
