//! Permission bridge: wires a single host-registered [`PermissionCallback`] to
//! the CLI's `can_use_tool` control requests.
//!
//! Spec §4.8: at most one permission function is registered per session. When
//! none is registered, every `can_use_tool` request gets the fixed
//! `{subtype:"error", error:"no permission handler installed"}` reply rather
//! than being silently allowed or denied.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::callbacks::PermissionCallback;
use crate::types::{PermissionResult, ToolPermissionContext};

/// Bridges inbound `can_use_tool` control requests to a registered
/// [`PermissionCallback`].
///
/// Registered with a [`crate::control::ControlEngine`] under the
/// `can_use_tool` subtype; one instance per session.
pub struct PermissionBridge {
    callback: Option<Arc<dyn PermissionCallback>>,
}

impl PermissionBridge {
    /// Create a bridge with no callback registered; every request will be
    /// answered with the "no permission handler installed" error.
    #[must_use]
    pub fn new() -> Self {
        Self { callback: None }
    }

    /// Create a bridge wrapping the given callback.
    #[must_use]
    pub fn with_callback(callback: Arc<dyn PermissionCallback>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Replace the registered callback. Only one callback may be registered
    /// at a time; a later call overwrites an earlier one.
    pub fn set_callback(&mut self, callback: Arc<dyn PermissionCallback>) {
        self.callback = Some(callback);
    }

    /// Whether a callback is currently registered.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl Default for PermissionBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::control::InboundHandler for PermissionBridge {
    async fn handle(&self, payload: Value) -> Result<Value, String> {
        let Some(callback) = self.callback.as_ref() else {
            return Err("no permission handler installed".to_string());
        };

        let tool_name = payload
            .get("tool_name")
            .and_then(Value::as_str)
            .ok_or_else(|| "can_use_tool request missing tool_name".to_string())?
            .to_string();

        let tool_input = payload.get("input").cloned().unwrap_or(Value::Null);

        let tool_use_id = payload
            .get("tool_use_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let context: ToolPermissionContext = payload
            .get("permission_suggestions")
            .cloned()
            .map(|suggestions| {
                serde_json::from_value(serde_json::json!({ "suggestions": suggestions }))
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        let mut context = context;
        context.tool_use_id = tool_use_id.clone();
        context.blocked_path = payload
            .get("blocked_path")
            .and_then(Value::as_str)
            .map(str::to_string);
        context.decision_reason = payload
            .get("decision_reason")
            .and_then(Value::as_str)
            .map(str::to_string);
        context.agent_id = payload
            .get("agent_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let result = callback
            .call(tool_name, tool_input, context)
            .await
            .map_err(|e| e.to_string())?;

        let result = match tool_use_id {
            Some(id) => result.with_fallback_tool_use_id(id),
            None => result,
        };

        serde_json::to_value(&result).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PermissionResultAllow, PermissionResultDeny};

    struct AllowAll;

    #[async_trait]
    impl PermissionCallback for AllowAll {
        async fn call(
            &self,
            _tool_name: String,
            _input: Value,
            _context: ToolPermissionContext,
        ) -> crate::error::Result<PermissionResult> {
            Ok(PermissionResult::Allow(PermissionResultAllow::default()))
        }
    }

    struct DenyAll;

    #[async_trait]
    impl PermissionCallback for DenyAll {
        async fn call(
            &self,
            tool_name: String,
            _input: Value,
            _context: ToolPermissionContext,
        ) -> crate::error::Result<PermissionResult> {
            Ok(PermissionResult::Deny(PermissionResultDeny {
                message: format!("denied: {tool_name}"),
                interrupt: false,
                tool_use_id: None,
            }))
        }
    }

    #[tokio::test]
    async fn no_callback_produces_fixed_error() {
        let bridge = PermissionBridge::new();
        let err = crate::control::InboundHandler::handle(
            &bridge,
            serde_json::json!({"tool_name": "Write", "input": {}}),
        )
        .await
        .unwrap_err();
        assert_eq!(err, "no permission handler installed");
    }

    #[tokio::test]
    async fn allow_fills_fallback_tool_use_id() {
        let bridge = PermissionBridge::with_callback(Arc::new(AllowAll));
        let response = crate::control::InboundHandler::handle(
            &bridge,
            serde_json::json!({
                "tool_name": "Read",
                "input": {"file_path": "/tmp/x"},
                "tool_use_id": "tu-1",
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["behavior"], "allow");
        assert_eq!(response["toolUseId"], "tu-1");
    }

    #[tokio::test]
    async fn deny_carries_message() {
        let bridge = PermissionBridge::with_callback(Arc::new(DenyAll));
        let response = crate::control::InboundHandler::handle(
            &bridge,
            serde_json::json!({
                "tool_name": "Write",
                "input": {},
                "tool_use_id": "tu-2",
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["behavior"], "deny");
        assert_eq!(response["message"], "denied: Write");
        assert_eq!(response["toolUseId"], "tu-2");
    }
}
