//! HTTP transport for the MoSPI MCP endpoint.
//!
//! One POST per request/response exchange. The body is JSON-RPC; the
//! response is not plain JSON but a newline-delimited event stream where
//! only `data: `-prefixed lines carry a JSON frame. The session handle
//! travels in the `mcp-session-id` header.
//!
//! Endpoint: `https://mcp.mospi.gov.in/`
//! Auth: none. No retries here; a failed exchange fails the fetch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;

use super::{ToolClient, ToolResult};
use crate::types::FetchError;

const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "mospi-pulse";
const SESSION_HEADER: &str = "mcp-session-id";

/// The marker prefixing payload-carrying lines in the response body.
const DATA_PREFIX: &str = "data: ";

/// Scan an event-stream body for the first JSON frame carrying a `result`
/// or `error` field. Lines without the data marker are ignored.
fn parse_stream(raw: &str) -> Result<ToolResult, FetchError> {
    for line in raw.lines() {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let frame: Value = serde_json::from_str(payload)?;
        if let Some(result) = frame.get("result") {
            return Ok(serde_json::from_value(result.clone())?);
        }
        if let Some(error) = frame.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(FetchError::Protocol(message));
        }
    }
    Err(FetchError::MalformedResponse)
}

/// Reqwest-backed MCP client.
pub struct McpClient {
    http: Client,
    endpoint: String,
}

impl McpClient {
    /// Build a client for the given endpoint.
    ///
    /// The timeout applies per exchange; a hung remote fails the fetch
    /// instead of suspending it indefinitely.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mospi-pulse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// One request/response round-trip: POST the body, thread the session
    /// header, scan the streamed body for the first result frame.
    async fn exchange(
        &self,
        body: Value,
        session: Option<&str>,
    ) -> Result<(ToolResult, String), FetchError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(header::ACCEPT, "text/event-stream, application/json")
            .json(&body);
        if let Some(id) = session {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                status: status.as_u16(),
            });
        }

        // Read the (possibly refreshed) session id before consuming the body.
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| session.map(str::to_string))
            .unwrap_or_default();

        let raw = response.text().await?;
        let result = parse_stream(&raw)?;
        Ok((result, session_id))
    }
}

#[async_trait]
impl ToolClient for McpClient {
    async fn init_session(&self) -> Result<String, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": CLIENT_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            },
        });

        let (_, session) = self.exchange(body, None).await?;
        if session.is_empty() {
            return Err(FetchError::Session);
        }
        debug!(session = %session, "MCP session established");
        Ok(session)
    }

    async fn call_tool(
        &self,
        session: &str,
        tool: &str,
        arguments: Value,
        request_id: u64,
    ) -> Result<ToolResult, FetchError> {
        debug!(tool, request_id, "Calling MCP tool");

        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments },
        });

        let (result, _) = self.exchange(body, Some(session)).await?;
        if result.is_error {
            let message = result
                .content
                .first()
                .map(|block| block.text.clone())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "unknown MCP tool error".to_string());
            return Err(FetchError::Tool {
                tool: tool.to_string(),
                message,
            });
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
