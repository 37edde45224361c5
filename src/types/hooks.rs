//! Hook types for event handling

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Hook Types
// ============================================================================

/// Hook event types
///
/// The closed set of 15 lifecycle events the CLI can dispatch a `hook_callback`
/// control request for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool is used
    PreToolUse,
    /// After a tool is used
    PostToolUse,
    /// After a tool use fails
    PostToolUseFailure,
    /// When a notification is received
    Notification,
    /// When user submits a prompt
    UserPromptSubmit,
    /// When a session starts
    SessionStart,
    /// When a session ends
    SessionEnd,
    /// When conversation stops
    Stop,
    /// When a subagent starts
    SubagentStart,
    /// When a subagent stops
    SubagentStop,
    /// Before compacting the conversation
    PreCompact,
    /// When a permission is requested
    PermissionRequest,
    /// Once, before the session's first turn
    Setup,
    /// When a teammate agent has no pending work
    TeammateIdle,
    /// When a delegated task finishes
    TaskCompleted,
}

impl HookEvent {
    /// The wire spelling used as `hookEventName` inside `hook_specific_output`
    /// and as the tag on `HookInput`.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::PostToolUseFailure => "PostToolUseFailure",
            Self::Notification => "Notification",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Stop => "Stop",
            Self::SubagentStart => "SubagentStart",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
            Self::PermissionRequest => "PermissionRequest",
            Self::Setup => "Setup",
            Self::TeammateIdle => "TeammateIdle",
            Self::TaskCompleted => "TaskCompleted",
        }
    }
}

// ============================================================================
// Hook Input Types
// ============================================================================

/// Base fields common to all hook inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseHookInput {
    /// Session identifier
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode (if set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

/// Input for `SubagentStart` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStartHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Agent identifier
    pub agent_id: String,
    /// Agent type (e.g., "knowledgeBuilder", "codeReviewer")
    pub agent_type: String,
}

/// Input for `SubagentStop` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStopHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Whether stop hook is active
    pub stop_hook_active: bool,
    /// Agent identifier
    pub agent_id: String,
    /// Path to the agent's transcript
    pub agent_transcript_path: String,
}

/// Input for `PreToolUse` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolUseHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Name of the tool being used
    pub tool_name: String,
    /// Tool input parameters
    pub tool_input: serde_json::Value,
}

/// Input for `PostToolUse` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Name of the tool that was used
    pub tool_name: String,
    /// Tool input parameters
    pub tool_input: serde_json::Value,
    /// Tool response/output
    pub tool_response: serde_json::Value,
    /// Tool use identifier
    pub tool_use_id: String,
}

/// Input for `PostToolUseFailure` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseFailureHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Name of the tool that failed
    pub tool_name: String,
    /// Tool input parameters
    pub tool_input: serde_json::Value,
    /// Tool use identifier
    pub tool_use_id: String,
    /// Error message
    pub error: String,
    /// Whether this was an interrupt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_interrupt: Option<bool>,
}

/// Input for `SessionStart` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Source of session start
    pub source: SessionStartSource,
}

/// Source of session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStartSource {
    /// Fresh startup
    Startup,
    /// Resumed session
    Resume,
    /// After clear
    Clear,
    /// After compact
    Compact,
}

/// Input for `SessionEnd` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Reason for session end
    pub reason: SessionEndReason,
}

/// Reason for session end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// Session cleared
    Clear,
    /// User logged out
    Logout,
    /// User exited prompt input
    PromptInputExit,
    /// Other reason
    Other,
}

/// Input for Stop hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Whether stop hook is active
    pub stop_hook_active: bool,
}

/// Input for `UserPromptSubmit` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptSubmitHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// The submitted prompt
    pub prompt: String,
}

/// Input for Notification hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Notification message
    pub message: String,
    /// Optional title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Input for `PreCompact` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCompactHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Trigger type
    pub trigger: CompactTrigger,
    /// Custom instructions for compaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

/// Trigger type for compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactTrigger {
    /// Manually triggered
    Manual,
    /// Automatically triggered
    Auto,
}

/// Input for `PermissionRequest` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequestHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Name of the tool requesting permission
    pub tool_name: String,
    /// Tool input parameters
    pub tool_input: serde_json::Value,
    /// Permission suggestions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_suggestions: Option<Vec<serde_json::Value>>,
}

/// Input for `Setup` hook
///
/// Fired once, before the session's first turn, before any tool use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
}

/// Input for `TeammateIdle` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeammateIdleHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Identifier of the idle teammate agent
    pub agent_id: String,
}

/// Input for `TaskCompleted` hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletedHookInput {
    /// Base hook fields
    #[serde(flatten)]
    pub base: BaseHookInput,
    /// Hook event name
    pub hook_event_name: String,
    /// Identifier of the agent that completed the task
    pub agent_id: String,
    /// Identifier of the completed task
    pub task_id: String,
}

/// Union type for all hook inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    /// Pre tool use input
    PreToolUse(PreToolUseHookInput),
    /// Post tool use input
    PostToolUse(PostToolUseHookInput),
    /// Post tool use failure input
    PostToolUseFailure(PostToolUseFailureHookInput),
    /// Notification input
    Notification(NotificationHookInput),
    /// User prompt submit input
    UserPromptSubmit(UserPromptSubmitHookInput),
    /// Session start input
    SessionStart(SessionStartHookInput),
    /// Session end input
    SessionEnd(SessionEndHookInput),
    /// Stop input
    Stop(StopHookInput),
    /// Subagent start input
    SubagentStart(SubagentStartHookInput),
    /// Subagent stop input
    SubagentStop(SubagentStopHookInput),
    /// Pre compact input
    PreCompact(PreCompactHookInput),
    /// Permission request input
    PermissionRequest(PermissionRequestHookInput),
    /// Setup input
    Setup(SetupHookInput),
    /// Teammate idle input
    TeammateIdle(TeammateIdleHookInput),
    /// Task completed input
    TaskCompleted(TaskCompletedHookInput),
}

// ============================================================================
// Hook Output and Decision Types
// ============================================================================

/// Hook decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    /// Block the action
    Block,
}

/// Permission decision carried in `PreToolUse`'s `hook_specific_output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPermissionDecision {
    /// Allow the tool call to proceed
    Allow,
    /// Deny the tool call
    Deny,
    /// Defer to the normal permission prompt
    Ask,
}

/// Event-specific payload nested inside `HookOutput::Sync::hook_specific_output`.
///
/// Tagged by `hookEventName` using the exact camelCase spellings the CLI expects;
/// field names inside each variant are camelCase for the same historical reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    /// `PreToolUse` output: may allow/deny/ask and rewrite the tool's input
    PreToolUse {
        /// Permission decision for this tool call
        #[serde(skip_serializing_if = "Option::is_none", rename = "permissionDecision")]
        permission_decision: Option<HookPermissionDecision>,
        /// Reason shown alongside the decision
        #[serde(
            skip_serializing_if = "Option::is_none",
            rename = "permissionDecisionReason"
        )]
        permission_decision_reason: Option<String>,
        /// Replacement tool input, if the hook wants to rewrite it
        #[serde(skip_serializing_if = "Option::is_none", rename = "updatedInput")]
        updated_input: Option<serde_json::Value>,
    },
    /// `UserPromptSubmit` output: may inject extra context
    UserPromptSubmit {
        /// Additional context to prepend before the prompt is sent
        #[serde(skip_serializing_if = "Option::is_none", rename = "additionalContext")]
        additional_context: Option<String>,
    },
    /// `SessionStart` output: may inject extra context
    SessionStart {
        /// Additional context to add at session start
        #[serde(skip_serializing_if = "Option::is_none", rename = "additionalContext")]
        additional_context: Option<String>,
    },
    /// Catch-all for event kinds with no further structured fields
    #[serde(untagged)]
    Other(serde_json::Value),
}

/// Hook output
///
/// A hook either answers synchronously (`Sync`) or asks the CLI to wait no
/// longer than `async_timeout` for a later answer delivered out of band
/// (`Async`). Most hooks use `Sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookOutput {
    /// Synchronous answer, returned directly as the `hook_callback` response
    Sync {
        /// Whether the conversation should continue (defaults to true when absent)
        #[serde(skip_serializing_if = "Option::is_none")]
        r#continue: Option<bool>,
        /// Suppress the hook's output from the transcript
        #[serde(skip_serializing_if = "Option::is_none", rename = "suppressOutput")]
        suppress_output: Option<bool>,
        /// Reason shown when `continue` is false
        #[serde(skip_serializing_if = "Option::is_none", rename = "stopReason")]
        stop_reason: Option<String>,
        /// Decision to block or allow (legacy top-level field)
        #[serde(skip_serializing_if = "Option::is_none")]
        decision: Option<HookDecision>,
        /// Free-form reason accompanying `decision`
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// System message to add to the transcript
        #[serde(skip_serializing_if = "Option::is_none", rename = "systemMessage")]
        system_message: Option<String>,
        /// Event-specific structured output
        #[serde(skip_serializing_if = "Option::is_none", rename = "hookSpecificOutput")]
        hook_specific_output: Option<HookSpecificOutput>,
    },
    /// Asynchronous answer: the CLI should wait up to `async_timeout` seconds
    /// for the real answer to arrive through a separate channel.
    Async {
        /// How long the CLI should wait, in seconds
        #[serde(rename = "asyncTimeout")]
        async_timeout: u64,
    },
}

impl Default for HookOutput {
    fn default() -> Self {
        Self::Sync {
            r#continue: None,
            suppress_output: None,
            stop_reason: None,
            decision: None,
            reason: None,
            system_message: None,
            hook_specific_output: None,
        }
    }
}

impl HookOutput {
    /// Build a `PreToolUse` allow response
    #[must_use]
    pub fn allow() -> Self {
        Self::pre_tool_use_decision(HookPermissionDecision::Allow, None, None)
    }

    /// Build a `PreToolUse` deny response with a reason
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::pre_tool_use_decision(HookPermissionDecision::Deny, Some(reason.into()), None)
    }

    fn pre_tool_use_decision(
        decision: HookPermissionDecision,
        reason: Option<String>,
        updated_input: Option<serde_json::Value>,
    ) -> Self {
        Self::Sync {
            r#continue: None,
            suppress_output: None,
            stop_reason: None,
            decision: None,
            reason: None,
            system_message: None,
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(decision),
                permission_decision_reason: reason,
                updated_input,
            }),
        }
    }

    /// True if this output requests the conversation stop
    #[must_use]
    pub fn should_stop(&self) -> bool {
        matches!(
            self,
            Self::Sync {
                r#continue: Some(false),
                ..
            }
        )
    }
}

/// Context for hook callbacks
///
/// Provides session information and cancellation support to hook callbacks.
/// Equivalent to TypeScript SDK's `{ signal: AbortSignal }` context.
#[derive(Clone, Default)]
pub struct HookContext {
    /// Session ID from the system init message
    pub session_id: Option<String>,
    /// Current working directory from the system init message
    pub cwd: Option<String>,
    /// Cancellation token for aborting operations (like `AbortSignal` in JS)
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("session_id", &self.session_id)
            .field("cwd", &self.cwd)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl HookContext {
    /// Create a new `HookContext` with session information
    #[must_use]
    pub fn new(
        session_id: Option<String>,
        cwd: Option<String>,
        cancellation_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session_id,
            cwd,
            cancellation_token,
        }
    }

    /// Check if cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(tokio_util::sync::CancellationToken::is_cancelled)
    }
}

/// Hook matcher configuration
#[derive(Clone)]
pub struct HookMatcher {
    /// Matcher pattern (e.g., tool name like "Bash" or pattern like "Write|Edit")
    pub matcher: Option<String>,
    /// List of hook callbacks (using the trait-based approach)
    pub hooks: Vec<Arc<dyn crate::callbacks::HookCallback>>,
    /// Timeout for all hooks in this matcher (default: 60 seconds)
    ///
    /// If a hook exceeds this timeout, it will be cancelled and a default
    /// `HookOutput` will be returned. This prevents runaway callbacks from
    /// blocking the agent indefinitely.
    pub timeout: Option<std::time::Duration>,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &format!("[{} callbacks]", self.hooks.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
