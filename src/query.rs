//! One-shot query facade (spec §4.9 / §6.3).
//!
//! [`query()`] spawns the CLI once for a single prompt, wires it with the
//! same control-protocol stack [`crate::client::ClaudeSDKClient`] uses, and
//! hands back a [`Query`] that is both an async sequence of messages and the
//! session's control operations (`interrupt`, `set_model`,
//! `set_permission_mode`, MCP management, ...). [`Query::stream`] may be
//! consumed exactly once. For multi-turn, bidirectional conversations use
//! [`crate::client::ClaudeSDKClient`] instead.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{Mutex, mpsc};

use crate::control::ControlEngine;
use crate::error::{ClaudeError, Result};
use crate::hooks::HookDispatcher;
use crate::mcp::ToolRouter;
use crate::message::{Frame, classify_value, parse_message};
use crate::permissions::PermissionBridge;
use crate::transport::{PromptInput, SubprocessTransport, Transport};
use crate::types::{ClaudeAgentOptions, McpServerStatus, McpServers, Message, PermissionMode};

/// Default timeout applied to every control request a [`Query`] sends.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// A single prompt/response exchange driven by a freshly spawned CLI
/// subprocess.
///
/// Obtained from [`query()`]. [`Query::stream`] may be called at most once;
/// a second call returns [`ClaudeError::AlreadyConsumed`]. The control
/// operations below may be called at any point while the stream is being
/// consumed, since they run over their own control-request/response
/// correlation independent of the message channel.
pub struct Query {
    transport: Arc<Mutex<SubprocessTransport>>,
    control: Arc<ControlEngine>,
    init_result: Arc<std::sync::Mutex<Option<serde_json::Value>>>,
    rx: Option<mpsc::UnboundedReceiver<Result<Message>>>,
}

impl Query {
    /// Consume this query's message stream.
    ///
    /// Yields every `Frame::Regular` message the CLI emits, in wire order,
    /// until the subprocess closes its stdout (typically just after the
    /// terminal `result` message). Control frames never appear here; they
    /// are routed internally to the control engine that backs the
    /// operations below.
    ///
    /// # Errors
    /// Returns [`ClaudeError::AlreadyConsumed`] if called more than once.
    pub fn stream(&mut self) -> Result<impl Stream<Item = Result<Message>> + '_> {
        let mut rx = self.rx.take().ok_or(ClaudeError::AlreadyConsumed)?;

        Ok(async_stream::stream! {
            while let Some(result) = rx.recv().await {
                yield result;
            }
        })
    }

    /// The raw response from the `initialize` handshake, if one completed.
    #[must_use]
    pub fn initialization_result(&self) -> Option<serde_json::Value> {
        self.init_result.lock().ok()?.clone()
    }

    /// Interrupt the current turn.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn interrupt(&mut self) -> Result<()> {
        self.control
            .send("interrupt", serde_json::json!({}), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Switch the active model for subsequent turns.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn set_model(&mut self, model: Option<String>) -> Result<()> {
        self.control
            .send("set_model", serde_json::json!({ "model": model }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Switch the permission mode for subsequent tool calls.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn set_permission_mode(&mut self, mode: PermissionMode) -> Result<()> {
        self.control
            .send("set_permission_mode", serde_json::json!({ "mode": mode }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Set the maximum extended-thinking token budget for subsequent turns.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn set_max_thinking_tokens(&mut self, tokens: Option<u32>) -> Result<()> {
        self.control
            .send(
                "set_max_thinking_tokens",
                serde_json::json!({ "max_thinking_tokens": tokens }),
                CONTROL_TIMEOUT,
            )
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Roll back file edits made since `message_id`.
    ///
    /// When `dry_run` is true, the CLI reports what it would roll back
    /// without touching the filesystem.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn rewind_files(
        &mut self,
        message_id: impl Into<String>,
        dry_run: bool,
    ) -> Result<serde_json::Value> {
        self.control
            .send(
                "rewind_files",
                serde_json::json!({ "message_id": message_id.into(), "dry_run": dry_run }),
                CONTROL_TIMEOUT,
            )
            .await
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Fetch current MCP server connection status from the CLI.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn mcp_status(&mut self) -> Result<Vec<McpServerStatus>> {
        let response = self
            .control
            .send("mcp_status", serde_json::json!({}), CONTROL_TIMEOUT)
            .await
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))?;

        let servers = response
            .get("servers")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        Ok(servers)
    }

    /// Replace the set of externally-configured MCP servers for this session.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn set_mcp_servers(&mut self, servers: McpServers) -> Result<()> {
        self.control
            .send("mcp_set_servers", serde_json::json!({ "servers": servers }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Reconnect a named MCP server.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn reconnect_mcp_server(&mut self, name: impl Into<String>) -> Result<()> {
        self.control
            .send("mcp_reconnect", serde_json::json!({ "name": name.into() }), CONTROL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Enable or disable a named MCP server without disconnecting it.
    ///
    /// # Errors
    /// Returns an error if the control request times out or the CLI rejects it.
    pub async fn toggle_mcp_server(&mut self, name: impl Into<String>, enabled: bool) -> Result<()> {
        self.control
            .send(
                "mcp_toggle",
                serde_json::json!({ "name": name.into(), "enabled": enabled }),
                CONTROL_TIMEOUT,
            )
            .await
            .map(|_| ())
            .map_err(|e| ClaudeError::ControlProtocol(e.to_string()))
    }

    /// Close the underlying subprocess, if still running.
    ///
    /// Resolves every pending control operation with
    /// [`crate::control::ControlProtocolError::Cancelled`] before tearing
    /// down the transport.
    ///
    /// # Errors
    /// Returns an error if the subprocess cannot be shut down cleanly.
    pub async fn close(&mut self) -> Result<()> {
        self.control.cancel_all().await;
        self.transport.lock().await.close().await
    }
}

/// Background reader task: classifies every inbound frame and routes it to
/// the control engine or the host-visible message channel. Mirrors
/// `ClaudeSDKClient`'s reader loop (spec §4.5).
async fn reader_task(
    transport: Arc<Mutex<SubprocessTransport>>,
    control: Arc<ControlEngine>,
    message_tx: mpsc::UnboundedSender<Result<Message>>,
) {
    let mut msg_stream = {
        let mut guard = transport.lock().await;
        guard.read_messages()
    };

    while let Some(result) = msg_stream.recv().await {
        let value = match result {
            Ok(v) => v,
            Err(e) => {
                let _ = message_tx.send(Err(e));
                break;
            }
        };

        match classify_value(value) {
            Some(Frame::Regular(v)) => {
                if message_tx.send(parse_message(v)).is_err() {
                    tracing::debug!("message receiver dropped, reader exiting");
                    break;
                }
            }
            Some(Frame::ControlRequest { request_id, payload }) => {
                let control = control.clone();
                tokio::spawn(async move {
                    control.deliver_request(request_id, payload).await;
                });
            }
            Some(Frame::ControlResponse(outcome)) => {
                control.deliver_response(outcome).await;
            }
            Some(Frame::ControlCancel { request_id }) => {
                control.deliver_cancel(&request_id).await;
            }
            Some(Frame::KeepAlive) | None => {}
        }
    }

    control.cancel_all().await;
}

/// Send a single prompt to Claude Code and get back its streamed response.
///
/// Spawns the CLI in streaming mode, drives the `initialize` handshake
/// (advertising any hooks/permission callback from `options`), writes the
/// prompt as the first user message, and returns a [`Query`] that exposes
/// both the message stream and the session's control operations.
///
/// # Errors
/// Returns an error if the CLI binary cannot be found, its version is below
/// [`crate::transport::MIN_CLI_VERSION`], or the subprocess fails to start.
pub async fn query(prompt: impl Into<String>, options: Option<ClaudeAgentOptions>) -> Result<Query> {
    let options = options.unwrap_or_default();
    let prompt = prompt.into();

    let hook_dispatcher = options
        .hooks
        .as_ref()
        .map(|config| Arc::new(HookDispatcher::from_hooks_config(config)));

    let permission_bridge = Arc::new(match options.can_use_tool.clone() {
        Some(callback) => PermissionBridge::with_callback(callback),
        None => PermissionBridge::new(),
    });

    let tool_router = Arc::new(ToolRouter::new());

    let mut transport = SubprocessTransport::new(PromptInput::Stream, options, None)?;
    transport.connect().await?;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<serde_json::Value>();
    let control = Arc::new(ControlEngine::new());
    control.attach_writer(outbound_tx.clone()).await;
    control.register_handler("can_use_tool", permission_bridge).await;
    control.register_handler("mcp_message", tool_router).await;
    if let Some(ref dispatcher) = hook_dispatcher {
        control.register_handler("hook_callback", dispatcher.clone()).await;
    }

    let transport = Arc::new(Mutex::new(transport));

    // Outbound writer: the only task that ever touches stdin, shared by the
    // control engine's replies/requests and the initial prompt below.
    {
        let transport = transport.clone();
        tokio::spawn(async move {
            while let Some(value) = outbound_rx.recv().await {
                let line = match serde_json::to_string(&value) {
                    Ok(s) => format!("{s}\n"),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode outbound control frame");
                        continue;
                    }
                };
                let mut guard = transport.lock().await;
                if let Err(e) = guard.write(&line).await {
                    tracing::warn!(error = %e, "failed to write outbound frame");
                    break;
                }
            }
        });
    }

    let (message_tx, message_rx) = mpsc::unbounded_channel();
    tokio::spawn(reader_task(transport.clone(), control.clone(), message_tx));

    let init_result = Arc::new(std::sync::Mutex::new(None));
    let hooks = hook_dispatcher.as_deref().map_or(serde_json::json!({}), HookDispatcher::snapshot);
    match control.send("initialize", serde_json::json!({ "hooks": hooks }), CONTROL_TIMEOUT).await {
        Ok(response) => {
            if let Ok(mut guard) = init_result.lock() {
                *guard = Some(response);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "initialize handshake failed, continuing without it");
        }
    }

    let message = serde_json::json!({
        "type": "user",
        "message": { "role": "user", "content": prompt },
    });
    outbound_tx
        .send(message)
        .map_err(|_| ClaudeError::transport("failed to queue initial prompt"))?;

    Ok(Query {
        transport,
        control,
        init_result,
        rx: Some(message_rx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_can_only_be_taken_once() {
        // Constructed directly, bypassing the CLI spawn in `query()`, so this
        // test doesn't depend on a `claude` binary being on PATH.
        let options = ClaudeAgentOptions::default();
        let transport = match SubprocessTransport::new(PromptInput::String("hi".into()), options, None) {
            Ok(t) => t,
            Err(_) => return, // no CLI on PATH in this environment; nothing to assert
        };
        let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut query = Query {
            transport: Arc::new(Mutex::new(transport)),
            control: Arc::new(ControlEngine::new()),
            init_result: Arc::new(std::sync::Mutex::new(None)),
            rx: Some(rx),
        };

        assert!(query.stream().is_ok());
        assert!(matches!(query.stream(), Err(ClaudeError::AlreadyConsumed)));
    }
}
