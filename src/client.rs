//! `ClaudeSDKClient` for bidirectional communication
//!
//! This module provides the main client for interactive, stateful conversations
//! with Claude Code, including support for:
//! - Bidirectional messaging (no lock contention)
//! - The full control protocol: interrupts, model/permission-mode/thinking-token
//!   switching, file rewind, MCP server management
//! - Hook and permission callbacks, dispatched to user code without blocking
//!   the reader task
//! - In-process SDK tool servers
//! - Conversation state management
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ClaudeSDKClient                           │
//! │                                                                   │
//! │  ┌──────────────────┐   ┌────────────┐   ┌────────────────────┐ │
//! │  │  Reader task     │   │ControlEngine│  │  Outbound writer   │ │
//! │  │                  │   │             │  │  task              │ │
//! │  │ classify_value   │──▶│ pending map │─▶│  one mpsc -> stdin │ │
//! │  │ Regular -> host  │   │ handlers:   │  │                    │ │
//! │  │ Control* -> ctl  │   │  hooks      │  └────────────────────┘ │
//! │  └──────────────────┘   │  mcp        │                         │
//! │                         │  perms      │                         │
//! │                         └────────────┘                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inbound control requests (`hook_callback`, `can_use_tool`, `mcp_message`) are
//! dispatched to a freshly spawned task per request, so a slow user callback
//! never stalls the reader loop or other in-flight control exchanges.
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use anthropic_agent_sdk::{ClaudeSDKClient, ClaudeAgentOptions, Message};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClaudeAgentOptions::default();
//! let mut client = ClaudeSDKClient::new(options, None).await?;
//!
//! client.send_message("Hello, Claude!").await?;
//!
//! while let Some(message) = client.next_message().await {
//!     match message? {
//!         Message::Assistant { message, .. } => {
//!             println!("Response: {:?}", message.content);
//!         }
//!         Message::Result { .. } => break,
//!         _ => {}
//!     }
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Interrupt
//!
//! ```no_run
//! use anthropic_agent_sdk::{ClaudeSDKClient, ClaudeAgentOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClaudeAgentOptions::default();
//! let mut client = ClaudeSDKClient::new(options, None).await?;
//!
//! client.send_message("Write a long essay").await?;
//!
//! tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
//! client.interrupt().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::control::ControlEngine;
use crate::error::{ClaudeError, Result};
use crate::hooks::{HookContext, HookDispatcher, HookManager};
use crate::mcp::ToolRouter;
use crate::message::{Frame, classify_value, parse_message};
use crate::permissions::PermissionBridge;
use crate::transport::{PromptInput, SubprocessTransport, Transport};
use crate::types::tool_server::ToolServer;
use crate::types::{
    AccountInfo, ClaudeAgentOptions, McpServerStatus, McpServers, Message, ModelInfo,
    PermissionMode, SessionId, SessionInfo, SlashCommand, ToolInfo,
};

/// Default timeout applied to every control request this client sends.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// A buffered message with its associated session ID for security validation.
type BufferedMessage = (Option<SessionId>, String);

/// Thread-safe queue for buffering messages during streaming.
type MessageBuffer = Arc<std::sync::Mutex<VecDeque<BufferedMessage>>>;

/// Client for bidirectional communication with Claude Code
///
/// `ClaudeSDKClient` provides interactive, stateful conversations with
/// support for interrupts, hooks, permission callbacks, and in-process tools.
///
/// # Examples
///
/// ```no_run
/// use anthropic_agent_sdk::{ClaudeSDKClient, ClaudeAgentOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let options = ClaudeAgentOptions::default();
///     let mut client = ClaudeSDKClient::new(options, None).await?;
///
///     client.send_message("Hello, Claude!").await?;
///
///     while let Some(message) = client.next_message().await {
///         println!("{:?}", message?);
///     }
///
///     Ok(())
/// }
/// ```
pub struct ClaudeSDKClient {
    /// Transport layer.
    transport: Arc<Mutex<SubprocessTransport>>,
    /// Control protocol engine shared with the reader task.
    control: Arc<ControlEngine>,
    /// In-process tool server router, registered with `control` under `mcp_message`.
    tool_router: Arc<ToolRouter>,
    /// Message stream receiver (host-visible `Frame::Regular` messages only).
    message_rx: mpsc::UnboundedReceiver<Result<Message>>,
    /// Message-inference hook manager (kept alive for the reader task).
    #[allow(dead_code)]
    hook_manager: Option<Arc<Mutex<HookManager>>>,
    /// Captured session ID from messages.
    session_id: Arc<std::sync::Mutex<Option<SessionId>>>,
    /// Session info from the init message (model, tools, MCP servers).
    session_info: Arc<std::sync::Mutex<Option<SessionInfo>>>,
    /// Result of the `initialize` control request handshake.
    init_result: Arc<std::sync::Mutex<Option<serde_json::Value>>>,
    /// Cancellation token for aborting operations (like `AbortController` in JS).
    cancellation_token: CancellationToken,
    /// Message buffer for queuing messages during streaming.
    message_buffer: MessageBuffer,
    /// Bound session ID - if set, all sends validate against this.
    bound_session_id: Arc<std::sync::Mutex<Option<SessionId>>>,
}

/// Context threaded through to the background reader task.
struct ReaderContext {
    transport: Arc<Mutex<SubprocessTransport>>,
    control: Arc<ControlEngine>,
    message_tx: mpsc::UnboundedSender<Result<Message>>,
    session_id: Arc<std::sync::Mutex<Option<SessionId>>>,
    session_info: Arc<std::sync::Mutex<Option<SessionInfo>>>,
    bound_session_id: Arc<std::sync::Mutex<Option<SessionId>>>,
    hook_manager: Option<Arc<Mutex<HookManager>>>,
    hook_dispatcher: Option<Arc<HookDispatcher>>,
    is_resume: bool,
}

impl ClaudeSDKClient {
    /// Create a new `ClaudeSDKClient`.
    ///
    /// Spawns the CLI subprocess in streaming mode, wires up the control
    /// protocol engine with hook/permission/tool-server handlers, and drives
    /// the `initialize` handshake before returning.
    ///
    /// # Arguments
    /// * `options` - Configuration options
    /// * `cli_path` - Optional path to the Claude Code CLI binary
    ///
    /// # Errors
    /// Returns an error if the CLI cannot be found, the connection fails, or
    /// the `initialize` handshake is rejected.
    pub async fn new(
        options: ClaudeAgentOptions,
        cli_path: Option<std::path::PathBuf>,
    ) -> Result<Self> {
        let cancellation_token = CancellationToken::new();
        let is_resume = options.resume.is_some();

        let hook_manager = options.hooks.as_ref().map(|config| {
            let mut manager = HookManager::from_hooks_config(config.clone());
            manager.set_cancellation_token(cancellation_token.child_token());
            Arc::new(Mutex::new(manager))
        });

        let hook_dispatcher = options
            .hooks
            .as_ref()
            .map(|config| Arc::new(HookDispatcher::from_hooks_config(config)));

        let permission_bridge = Arc::new(match options.can_use_tool.clone() {
            Some(callback) => PermissionBridge::with_callback(callback),
            None => PermissionBridge::new(),
        });

        let tool_router = Arc::new(ToolRouter::new());

        let mut transport = SubprocessTransport::with_cancellation_token(
            PromptInput::Stream,
            options,
            cli_path,
            Some(cancellation_token.child_token()),
        )?;
        transport.connect().await?;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<serde_json::Value>();
        let control = Arc::new(ControlEngine::new());
        control.attach_writer(outbound_tx).await;
        control.register_handler("can_use_tool", permission_bridge.clone()).await;
        control.register_handler("mcp_message", tool_router.clone()).await;
        if let Some(ref dispatcher) = hook_dispatcher {
            control.register_handler("hook_callback", dispatcher.clone()).await;
        }

        let transport = Arc::new(Mutex::new(transport));
        let session_id = Arc::new(std::sync::Mutex::new(None));
        let session_info = Arc::new(std::sync::Mutex::new(None));
        let bound_session_id = Arc::new(std::sync::Mutex::new(None));
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        // Outbound writer: the only task that ever touches stdin.
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

        // Reader: classifies every inbound line and routes it.
        {
            let ctx = ReaderContext {
                transport: transport.clone(),
                control: control.clone(),
                message_tx,
                session_id: session_id.clone(),
                session_info: session_info.clone(),
                bound_session_id: bound_session_id.clone(),
                hook_manager: hook_manager.clone(),
                hook_dispatcher: hook_dispatcher.clone(),
                is_resume,
            };
            tokio::spawn(Self::reader_task(ctx));
        }

        let client = Self {
            transport,
            control,
            tool_router,
            message_rx,
            hook_manager,
            session_id,
            session_info,
            init_result: Arc::new(std::sync::Mutex::new(None)),
            cancellation_token,
            message_buffer: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            bound_session_id,
        };

        client.initialize(hook_dispatcher.as_deref()).await?;

        Ok(client)
    }

    /// Send the `initialize` control request, advertising hook callback ids
    /// and registered tool servers to the CLI.
    async fn initialize(&self, hook_dispatcher: Option<&HookDispatcher>) -> Result<()> {
        let hooks = hook_dispatcher.map_or(serde_json::json!({}), HookDispatcher::snapshot);
        let request = serde_json::json!({ "hooks": hooks });

        match self.control.send("initialize", request, CONTROL_TIMEOUT).await {
            Ok(response) => {
                if let Ok(mut guard) = self.init_result.lock() {
                    *guard = Some(response);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "initialize handshake failed, continuing without it");
                Ok(())
            }
        }
    }

    /// The raw response from the `initialize` handshake, if one completed.
    #[must_use]
    pub fn initialization_result(&self) -> Option<serde_json::Value> {
        self.init_result.lock().ok()?.clone()
    }

    /// Register an in-process SDK tool server, answering `mcp_message`
    /// requests addressed to it by name.
    pub async fn register_tool_server(&self, server: ToolServer) {
        self.tool_router.register_server(server).await;
    }

    /// Background reader task: classifies every inbound frame and routes it
    /// to the control engine or the host-visible message channel.
    ///
    /// Inbound control requests are dispatched on a freshly spawned task so a
    /// slow hook/permission/tool callback never blocks this loop.
    #[allow(clippy::too_many_lines)]
    async fn reader_task(ctx: ReaderContext) {
        let ReaderContext {
            transport,
            control,
            message_tx,
            session_id,
            session_info,
            bound_session_id,
            hook_manager,
            hook_dispatcher,
            is_resume,
        } = ctx;

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
                    Self::handle_regular(
                        v,
                        &message_tx,
                        &session_id,
                        &session_info,
                        &bound_session_id,
                        &hook_manager,
                        &hook_dispatcher,
                        is_resume,
                    )
                    .await;
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

    #[allow(clippy::too_many_arguments)]
    async fn handle_regular(
        value: serde_json::Value,
        message_tx: &mpsc::UnboundedSender<Result<Message>>,
        session_id: &std::sync::Mutex<Option<SessionId>>,
        session_info: &std::sync::Mutex<Option<SessionInfo>>,
        bound_session_id: &std::sync::Mutex<Option<SessionId>>,
        hook_manager: &Option<Arc<Mutex<HookManager>>>,
        hook_dispatcher: &Option<Arc<HookDispatcher>>,
        is_resume: bool,
    ) {
        let msg = match parse_message(value) {
            Ok(msg) => msg,
            Err(e) => {
                let _ = message_tx.send(Err(e));
                return;
            }
        };

        if let Message::Result { session_id: ref sid, .. } = msg {
            if let Ok(mut guard) = session_id.lock() {
                *guard = Some(sid.clone());
            }
            if let Ok(mut guard) = bound_session_id.lock() {
                if guard.is_none() {
                    *guard = Some(sid.clone());
                }
            }
        }

        if let Message::System { ref subtype, ref data } = msg {
            if subtype == "init" {
                let init_session_id = data.get("session_id").and_then(|v| v.as_str()).map(str::to_string);
                let init_cwd = data.get("cwd").and_then(|v| v.as_str()).map(str::to_string);

                if let Some(ref sid) = init_session_id {
                    if let Ok(mut guard) = session_id.lock() {
                        *guard = Some(SessionId::from(sid.clone()));
                    }
                }

                if let Ok(mut guard) = session_info.lock() {
                    *guard = Some(SessionInfo::from_init_data(data));
                }

                let context = HookContext::default();
                if let Some(ref dispatcher) = hook_dispatcher {
                    dispatcher.set_context(context);
                }

                if let Some(ref manager) = hook_manager {
                    if let Some(sid) = init_session_id {
                        let mut guard = manager.lock().await;
                        guard.set_session_context(sid, init_cwd);
                        let source = if is_resume { "resume" } else { "startup" };
                        if let Err(e) = guard.trigger_session_start(source).await {
                            tracing::warn!(error = %e, "SessionStart hook error");
                        }
                    }
                }
            }
        }

        if let Some(ref manager) = hook_manager {
            let mut guard = manager.lock().await;
            if let Err(e) = guard.process_message(&msg).await {
                tracing::warn!(error = %e, "hook processing error");
            }
        }

        if message_tx.send(Ok(msg)).is_err() {
            tracing::debug!("message receiver dropped, reader exiting");
        }
    }

    /// Send a user message.
    ///
    /// # Errors
    /// Returns an error if a session is bound and no longer matches the
    /// current session, or if the underlying write fails.
    pub async fn send_message(&mut self, content: impl Into<String>) -> Result<()> {
        self.validate_session()?;

        let content_str = content.into();

        if let Some(ref manager) = self.hook_manager {
            let guard = manager.lock().await;
            if let Err(e) = guard.trigger_user_prompt_submit(&content_str).await {
                tracing::warn!(error = %e, "UserPromptSubmit hook error");
            }
        }

        let message = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": content_str
            }
        });
        let message_json = format!("{}\n", serde_json::to_string(&message)?);

        let mut transport = self.transport.lock().await;
        transport.write(&message_json).await
    }

    // ========================================================================
    // Message Buffering
    // ========================================================================

    /// Queue a message to be sent after the current turn completes.
    ///
    /// The CLI only reads stdin between turns, not during streaming. Messages
    /// queued with this method are stored and sent automatically by
    /// [`Self::next_buffered`], or manually with [`Self::send_queued`].
    ///
    /// **Security**: each queued message is stamped with the current
    /// `session_id`; [`Self::send_queued`] discards it if the session has
    /// since changed, rather than sending it into the wrong conversation.
    pub fn queue_message(&self, content: impl Into<String>) {
        let session_id = self.get_session_id();
        if let Ok(mut buffer) = self.message_buffer.lock() {
            buffer.push_back((session_id, content.into()));
        }
    }

    /// Number of messages waiting in the queue.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.message_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Whether there are messages waiting to be sent.
    #[must_use]
    pub fn has_queued(&self) -> bool {
        self.queued_count() > 0
    }

    /// Send the next queued message.
    ///
    /// Returns `Ok(true)` if a message was sent, `Ok(false)` if the queue was
    /// empty.
    ///
    /// # Errors
    /// Returns an error if the underlying write fails.
    pub async fn send_queued(&mut self) -> Result<bool> {
        let current_session = self.get_session_id();

        let next_entry = self.message_buffer.lock().ok().and_then(|mut b| b.pop_front());

        if let Some((queued_session, msg)) = next_entry {
            match (&queued_session, &current_session) {
                (Some(queued), Some(current)) if queued != current => {
                    tracing::warn!(
                        queued_session = %queued,
                        current_session = %current,
                        "discarding queued message: session_id changed"
                    );
                    self.clear_queue();
                    return Ok(false);
                }
                _ => {
                    self.send_message(msg).await?;
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Get the next message, automatically sending queued messages after
    /// `Result` messages.
    ///
    /// Returns `None` when the stream ends and no queued messages remain.
    pub async fn next_buffered(&mut self) -> Option<Result<Message>> {
        let result = self.message_rx.recv().await?;
        if matches!(&result, Ok(Message::Result { .. })) && self.has_queued() {
            let _ = self.send_queued().await;
        }
        Some(result)
    }

    /// Clear all queued messages.
    pub fn clear_queue(&self) {
        if let Ok(mut buffer) = self.message_buffer.lock() {
            buffer.clear();
        }
    }

    // ========================================================================
    // Control protocol operations (spec §4.5)
    // ========================================================================

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

    /// Get the next message from the stream. Returns `None` when the stream ends.
    pub async fn next_message(&mut self) -> Option<Result<Message>> {
        self.message_rx.recv().await
    }

    /// Receive messages until a `Result` message is encountered.
    ///
    /// Returns a stream that yields messages and automatically terminates
    /// after yielding the final `Result` message. Convenient for single-query
    /// workflows on an otherwise-interactive client.
    #[must_use = "receive_response returns a stream that must be consumed to receive messages"]
    pub fn receive_response(&mut self) -> impl Stream<Item = Result<Message>> + '_ {
        async_stream::stream! {
            while let Some(result) = self.message_rx.recv().await {
                let is_result = matches!(&result, Ok(Message::Result { .. }));
                yield result;
                if is_result {
                    break;
                }
            }
        }
    }

    /// Whether the transport is connected and ready.
    pub async fn is_connected(&self) -> bool {
        let transport = self.transport.lock().await;
        transport.is_ready()
    }

    /// Get the current session ID if available.
    ///
    /// Captured automatically from `Result` and `System { subtype: "init" }`
    /// messages. Returns `None` if no session has been established yet.
    #[must_use]
    pub fn get_session_id(&self) -> Option<SessionId> {
        self.session_id.lock().ok()?.clone()
    }

    // ========================================================================
    // Session Binding
    // ========================================================================

    /// Bind this client to a specific session ID.
    ///
    /// Once bound, [`Self::send_message`] validates that the current session
    /// still matches the bound one, returning [`ClaudeError::SessionMismatch`]
    /// on a mismatch.
    pub fn bind_session(&self, session_id: SessionId) {
        if let Ok(mut guard) = self.bound_session_id.lock() {
            *guard = Some(session_id);
        }
    }

    /// The bound session ID, if any.
    #[must_use]
    pub fn bound_session(&self) -> Option<SessionId> {
        self.bound_session_id.lock().ok()?.clone()
    }

    /// Clear session binding, allowing messages to any session.
    pub fn unbind_session(&self) {
        if let Ok(mut guard) = self.bound_session_id.lock() {
            *guard = None;
        }
    }

    /// Validate that the current session matches the bound session, if one
    /// is set. Called automatically by [`Self::send_message`].
    ///
    /// # Errors
    /// Returns [`ClaudeError::SessionMismatch`] if a bound session differs
    /// from the current one.
    pub fn validate_session(&self) -> Result<()> {
        let bound = self.bound_session();
        let current = self.get_session_id();

        match (&bound, &current) {
            (Some(b), Some(c)) if b != c => Err(ClaudeError::session_mismatch(b.to_string(), c.to_string())),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Session information including model, tools, and MCP servers.
    ///
    /// Returns `None` until the init message has been received.
    #[must_use]
    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session_info.lock().ok()?.clone()
    }

    /// The current model in use, per session info.
    #[must_use]
    pub fn current_model(&self) -> Option<String> {
        self.session_info().and_then(|info| info.model)
    }

    /// The list of available tools in this session.
    #[must_use]
    pub fn available_tools(&self) -> Vec<ToolInfo> {
        self.session_info().map(|info| info.tools).unwrap_or_default()
    }

    /// MCP server status for all configured servers.
    #[must_use]
    pub fn mcp_server_status(&self) -> Vec<McpServerStatus> {
        self.session_info().map(|info| info.mcp_servers).unwrap_or_default()
    }

    /// Static list of known Claude models.
    ///
    /// This is not specific to the current session — use [`Self::current_model`]
    /// for the model actually in use.
    #[must_use]
    pub fn supported_models() -> Vec<ModelInfo> {
        ModelInfo::known_models()
    }

    /// Available slash commands for this session, from the init message.
    #[must_use]
    pub fn supported_commands(&self) -> Vec<SlashCommand> {
        self.session_info()
            .and_then(|info| {
                info.extra.get("slash_commands").and_then(|v| {
                    v.as_array().map(|arr| {
                        arr.iter()
                            .filter_map(|item| {
                                if let Some(name) = item.as_str() {
                                    Some(SlashCommand {
                                        name: name.to_string(),
                                        description: String::new(),
                                        argument_hint: String::new(),
                                    })
                                } else {
                                    serde_json::from_value(item.clone()).ok()
                                }
                            })
                            .collect()
                    })
                })
            })
            .unwrap_or_default()
    }

    /// Account information derived from the init message.
    ///
    /// # Errors
    /// Returns [`ClaudeError::NotConnected`] if the init message hasn't been
    /// received yet.
    pub fn account_info(&self) -> Result<AccountInfo> {
        let session = self.session_info().ok_or_else(ClaudeError::not_connected)?;

        let api_key_source = session.extra.get("apiKeySource").and_then(|v| v.as_str());
        let is_oauth = api_key_source == Some("none");

        Ok(AccountInfo {
            email: None,
            account_id: None,
            is_oauth,
            organization_id: None,
        })
    }

    /// A child cancellation token for this client, analogous to JavaScript's
    /// `AbortController.signal`.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    /// Cancel all ongoing operations, resolving any pending control requests
    /// as cancelled.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
        let control = self.control.clone();
        tokio::spawn(async move { control.cancel_all().await });
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Close the client, triggering the `SessionEnd` hook and shutting down
    /// the subprocess.
    ///
    /// # Errors
    /// Returns an error if the transport fails to shut down cleanly.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(ref manager) = self.hook_manager {
            let guard = manager.lock().await;
            if let Err(e) = guard.trigger_session_end("other").await {
                tracing::warn!(error = %e, "SessionEnd hook error");
            }
        }

        self.control.cancel_all().await;
        let mut transport = self.transport.lock().await;
        transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let options = ClaudeAgentOptions::default();
        let result = ClaudeSDKClient::new(options, None).await;
        assert!(result.is_ok() || result.is_err()); // depends on CLI availability
    }

    #[tokio::test]
    async fn test_session_id_initially_none() {
        let options = ClaudeAgentOptions::default();
        if let Ok(client) = ClaudeSDKClient::new(options, None).await {
            assert!(client.get_session_id().is_none());
        }
    }

    #[tokio::test]
    async fn test_is_connected() {
        let options = ClaudeAgentOptions::default();
        if let Ok(client) = ClaudeSDKClient::new(options, None).await {
            let _ = client.is_connected().await;
        }
    }
}
