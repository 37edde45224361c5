//! Control protocol engine
//!
//! Multiplexes correlated request/response traffic over the same byte stream
//! that carries ordinary messages. Bidirectional: this SDK sends requests the
//! CLI answers (`initialize`, `interrupt`, `set_model`, ...), and the CLI sends
//! requests this SDK must answer (`can_use_tool`, `hook_callback`,
//! `mcp_message`).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};

use crate::message::ControlOutcome;

/// Errors surfaced by the control engine, exposed to the host as-is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControlProtocolError {
    /// No response arrived before the deadline
    #[error("control request {0} timed out")]
    Timeout(String),
    /// The request was cancelled before it resolved
    #[error("control request {0} was cancelled")]
    Cancelled(String),
    /// The CLI answered with a structured error
    #[error("control request {request_id} failed: {message}")]
    ResponseError {
        /// Correlation id
        request_id: String,
        /// CLI-supplied error text
        message: String,
    },
    /// No handler is registered for an inbound request's subtype
    #[error("unknown control subtype: {0}")]
    UnknownSubtype(String),
    /// A control frame could not be interpreted
    #[error("invalid control message: {0}")]
    InvalidMessage(String),
}

/// One pending outbound request: a one-shot channel the reader resolves, plus
/// the deadline the caller is waiting against.
struct PendingWaiter {
    resolver: oneshot::Sender<ControlOutcome>,
}

/// A subtype-keyed handler for inbound control requests (`can_use_tool`,
/// `hook_callback`, `mcp_message`). Handlers receive the raw `request` payload
/// and must produce either a success value or an error string; the engine
/// wraps either into the response envelope and writes it.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Handle one inbound control request payload, returning the `response`
    /// value to embed in a success reply, or an error string for a
    /// `{subtype:"error", error:...}` reply.
    async fn handle(&self, payload: Value) -> Result<Value, String>;
}

/// Shared state for outbound request/response correlation and inbound
/// dispatch. Cloned cheaply (an `Arc` wrapper) so both the reader loop and
/// operation callers can hold a handle.
pub struct ControlEngine {
    pending: Mutex<HashMap<String, PendingWaiter>>,
    counter: AtomicU64,
    handlers: Mutex<HashMap<String, Arc<dyn InboundHandler>>>,
    outbound_tx: Mutex<Option<tokio::sync::mpsc::UnboundedSender<Value>>>,
}

impl Default for ControlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlEngine {
    /// Create a new, empty control engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
            handlers: Mutex::new(HashMap::new()),
            outbound_tx: Mutex::new(None),
        }
    }

    /// Wire the channel the engine writes outbound frames (requests and
    /// inbound-request responses) to. The session owns the receiving end and
    /// forwards values to the transport.
    pub async fn attach_writer(&self, tx: tokio::sync::mpsc::UnboundedSender<Value>) {
        *self.outbound_tx.lock().await = Some(tx);
    }

    /// Mint a fresh, session-unique request id: `req_{counter}_{8 hex chars}`
    /// (spec §4.4). The counter alone guarantees session-local uniqueness;
    /// the suffix is mixed from the clock, the counter and the calling
    /// thread so two SDK-minted ids never look like a CLI-minted one.
    #[must_use]
    pub fn mint_request_id(&self) -> String {
        use std::hash::{Hash, Hasher};

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        nanos.hash(&mut hasher);
        n.hash(&mut hasher);
        std::thread::current().id().hash(&mut hasher);
        let suffix = hasher.finish() as u32;

        format!("req_{n}_{suffix:08x}")
    }

    /// Register the handler invoked for inbound requests of the given
    /// `subtype` (`can_use_tool`, `hook_callback`, `mcp_message`).
    pub async fn register_handler(&self, subtype: impl Into<String>, handler: Arc<dyn InboundHandler>) {
        self.handlers.lock().await.insert(subtype.into(), handler);
    }

    /// Send an outbound control request and await its terminal response.
    ///
    /// # Errors
    /// Returns [`ControlProtocolError::Timeout`] if no response arrives within
    /// `timeout`, or [`ControlProtocolError::ResponseError`] if the CLI
    /// answers with an error.
    pub async fn send(
        &self,
        subtype: &str,
        mut request: Value,
        timeout: Duration,
    ) -> Result<Value, ControlProtocolError> {
        let request_id = self.mint_request_id();

        if let Some(obj) = request.as_object_mut() {
            obj.insert("subtype".to_string(), Value::String(subtype.to_string()));
        }

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(request_id.clone(), PendingWaiter { resolver: tx });

        let frame = serde_json::json!({
            "type": "control_request",
            "request_id": request_id,
            "request": request,
        });

        self.write_frame(frame).await;

        let outcome = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                // Sender dropped without resolving (session shutting down).
                self.pending.lock().await.remove(&request_id);
                return Err(ControlProtocolError::Cancelled(request_id));
            }
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                return Err(ControlProtocolError::Timeout(request_id));
            }
        };

        match outcome {
            ControlOutcome::Success { response, .. } => Ok(response.unwrap_or(Value::Null)),
            ControlOutcome::Error { message, .. } => Err(ControlProtocolError::ResponseError {
                request_id,
                message,
            }),
        }
    }

    /// Resolve the waiter matching this response's `request_id`, if any is
    /// still pending. Responses arriving after their waiter timed out are
    /// dropped silently, per §8 boundary behaviors.
    pub async fn deliver_response(&self, outcome: ControlOutcome) {
        let request_id = outcome.request_id().to_string();
        if let Some(waiter) = self.pending.lock().await.remove(&request_id) {
            let _ = waiter.resolver.send(outcome);
        }
    }

    /// Dispatch an inbound control request to its registered handler and write
    /// back a response frame carrying the same `request_id`.
    pub async fn deliver_request(&self, request_id: String, payload: Value) {
        let subtype = payload
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let handler = self.handlers.lock().await.get(&subtype).cloned();

        let response = match handler {
            Some(handler) => match handler.handle(payload).await {
                Ok(value) => serde_json::json!({
                    "subtype": "success",
                    "request_id": request_id,
                    "response": value,
                }),
                Err(message) => serde_json::json!({
                    "subtype": "error",
                    "request_id": request_id,
                    "error": message,
                }),
            },
            None => serde_json::json!({
                "subtype": "error",
                "request_id": request_id,
                "error": format!("unknown subtype: {subtype}"),
            }),
        };

        self.write_frame(serde_json::json!({
            "type": "control_response",
            "response": response,
        }))
        .await;
    }

    /// Best-effort cancellation of a pending outbound request minted by this
    /// SDK. Unknown ids are a no-op.
    pub async fn deliver_cancel(&self, request_id: &str) {
        if let Some(waiter) = self.pending.lock().await.remove(request_id) {
            // Dropping the sender resolves the receiver with a RecvError,
            // which `send()` turns into `Cancelled`.
            drop(waiter.resolver);
        }
    }

    /// Resolve every pending outbound request with `Cancelled`, used during
    /// `close()`.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, waiter) in pending.drain() {
            drop(waiter.resolver);
        }
    }

    async fn write_frame(&self, frame: Value) {
        if let Some(tx) = self.outbound_tx.lock().await.as_ref() {
            let _ = tx.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_times_out_without_response() {
        let engine = ControlEngine::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine.attach_writer(tx).await;

        let result = engine
            .send("interrupt", serde_json::json!({}), Duration::from_millis(20))
            .await;

        assert!(matches!(result, Err(ControlProtocolError::Timeout(_))));
        // The request frame was still written before timing out.
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn deliver_response_resolves_matching_waiter() {
        let engine = Arc::new(ControlEngine::new());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        engine.attach_writer(tx).await;

        let engine2 = engine.clone();
        let sender = tokio::spawn(async move {
            engine2
                .send("mcp_status", serde_json::json!({}), Duration::from_secs(5))
                .await
        });

        // Give the sender a moment to register its waiter.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let pending_id = {
            let pending = engine.pending.lock().await;
            pending.keys().next().cloned()
        };
        let request_id = pending_id.expect("waiter registered");

        engine
            .deliver_response(ControlOutcome::Success {
                request_id: request_id.clone(),
                response: Some(serde_json::json!({"ok": true})),
                pending_permission_requests: None,
            })
            .await;

        let result = sender.await.unwrap();
        assert_eq!(result.unwrap(), serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn unknown_subtype_produces_error_response() {
        let engine = ControlEngine::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine.attach_writer(tx).await;

        engine
            .deliver_request(
                "r1".to_string(),
                serde_json::json!({"subtype": "does_not_exist"}),
            )
            .await;

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame["response"]["subtype"], "error");
        assert_eq!(frame["response"]["request_id"], "r1");
    }
}
