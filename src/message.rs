//! Frame taxonomy and the tolerant line-delimited JSON parser
//!
//! Every line written by the CLI on stdout is one frame. This module decodes
//! that line into a [`Frame`], distinguishing the four control discriminators
//! from everything else, which is forwarded to the host verbatim as
//! [`Frame::Regular`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClaudeError, Result};
use crate::types::Message;

/// Outcome of a control request: either a JSON-RPC-flavored success payload or
/// a structured error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOutcome {
    /// The request succeeded
    Success {
        /// Echoed request id
        request_id: String,
        /// Result payload, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
        /// Permission requests still pending when this response was produced
        #[serde(skip_serializing_if = "Option::is_none")]
        pending_permission_requests: Option<Value>,
    },
    /// The request failed
    Error {
        /// Echoed request id
        request_id: String,
        /// Human-readable error message
        error: String,
    },
}

impl ControlOutcome {
    /// The `request_id` this outcome answers
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Success { request_id, .. } | Self::Error { request_id, .. } => request_id,
        }
    }
}

/// A single decoded line from the CLI's stdout (or, for writes, a line destined
/// for its stdin).
#[derive(Debug, Clone)]
pub enum Frame {
    /// An ordinary SDK message: `assistant`, `user`, `result`, `system`, and any
    /// other `type` the control discriminators don't claim. Preserved verbatim.
    Regular(Value),
    /// A unit of work the sender wants performed on its behalf.
    ControlRequest {
        /// Correlation id
        request_id: String,
        /// The `request` object, kept as raw JSON; subtype-specific decoding
        /// happens in the control engine and permission/hook bridges.
        payload: Value,
    },
    /// The terminal answer to a previously sent `ControlRequest`.
    ControlResponse(ControlOutcome),
    /// Best-effort cancellation of a pending request, by either party.
    ControlCancel {
        /// Correlation id of the request being cancelled
        request_id: String,
    },
    /// A no-op liveness frame.
    KeepAlive,
}

/// Split an append-only byte buffer into parsed frames plus a residual,
/// incomplete-line suffix.
///
/// This is chunking-invariant: the same concatenated bytes always produce the
/// same frame sequence no matter how they were split across calls, because the
/// residual from one call is meant to be prepended to the next chunk by the
/// caller.
#[must_use]
pub fn split_frames(buffer: &str) -> (Vec<Frame>, &str) {
    let mut frames = Vec::new();
    let mut consumed = 0;

    for line in buffer.split_inclusive('\n') {
        if !line.ends_with('\n') {
            // Incomplete trailing line; leave it in the residual.
            break;
        }
        consumed += line.len();
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        if let Some(frame) = parse_frame_line(trimmed) {
            frames.push(frame);
        }
        // Malformed or non-object lines are silently skipped per §4.1.
    }

    (frames, &buffer[consumed..])
}

/// Parse one already-newline-stripped line into a [`Frame`].
///
/// Returns `None` when the line is not valid JSON, or is valid JSON but not an
/// object — both are tolerated by dropping the line, never by raising.
#[must_use]
pub fn parse_frame_line(line: &str) -> Option<Frame> {
    let value: Value = serde_json::from_str(line).ok()?;
    classify_value(value)
}

/// Classify an already-parsed JSON value into a [`Frame`].
///
/// This is the value-only half of [`parse_frame_line`], split out so callers
/// that receive pre-parsed JSON (the subprocess transport buffers and parses
/// internally) don't need to re-serialize just to re-parse.
#[must_use]
pub fn classify_value(value: Value) -> Option<Frame> {
    let obj = value.as_object()?;

    let frame_type = obj.get("type").and_then(Value::as_str)?;

    match frame_type {
        "control_request" => {
            let request_id = obj.get("request_id")?.as_str()?.to_string();
            let payload = obj.get("request")?.clone();
            Some(Frame::ControlRequest {
                request_id,
                payload,
            })
        }
        "control_response" => {
            let response = obj.get("response")?;
            let subtype = response.get("subtype").and_then(Value::as_str)?;
            let request_id = response.get("request_id")?.as_str()?.to_string();
            let outcome = match subtype {
                "success" => ControlOutcome::Success {
                    request_id,
                    response: response.get("response").cloned(),
                    pending_permission_requests: response
                        .get("pending_permission_requests")
                        .cloned(),
                },
                "error" => ControlOutcome::Error {
                    request_id,
                    error: response
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                },
                _ => return None,
            };
            Some(Frame::ControlResponse(outcome))
        }
        "control_cancel_request" => {
            let request_id = obj.get("request_id")?.as_str()?.to_string();
            Some(Frame::ControlCancel { request_id })
        }
        "keep_alive" => Some(Frame::KeepAlive),
        _ => Some(Frame::Regular(value)),
    }
}

/// Parse a `Frame::Regular` payload into a typed [`Message`].
///
/// # Errors
/// Returns [`ClaudeError::MessageParse`] when the payload does not match any
/// known `Message` variant shape.
pub fn parse_message(value: Value) -> Result<Message> {
    serde_json::from_value(value.clone()).map_err(|e| {
        ClaudeError::message_parse(format!("failed to parse message: {e}"), Some(value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regular_frame() {
        let (frames, residual) =
            split_frames("{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"s1\"}\n");
        assert_eq!(frames.len(), 1);
        assert!(residual.is_empty());
        assert!(matches!(frames[0], Frame::Regular(_)));
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let input = "\nnot json\n{\"type\":\"keep_alive\"}\n{incomplete\n";
        let (frames, residual) = split_frames(input);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Frame::KeepAlive));
        assert_eq!(residual, "{incomplete\n");
    }

    #[test]
    fn chunking_invariance() {
        let whole = "{\"type\":\"keep_alive\"}\n{\"type\":\"a\"}\n";
        let (whole_frames, _) = split_frames(whole);

        // Split the same bytes across an arbitrary boundary mid-line.
        let (first, rest) = whole.split_at(10);
        let (mut frames_a, residual_a) = split_frames(first);
        let joined = format!("{residual_a}{rest}");
        let (frames_b, _) = split_frames(&joined);
        frames_a.extend(frames_b);

        assert_eq!(whole_frames.len(), frames_a.len());
    }

    #[test]
    fn decodes_control_request() {
        let line = r#"{"type":"control_request","request_id":"req_1_abcd1234","request":{"subtype":"interrupt"}}"#;
        let frame = parse_frame_line(line).unwrap();
        match frame {
            Frame::ControlRequest { request_id, .. } => assert_eq!(request_id, "req_1_abcd1234"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn decodes_control_response_success_and_error() {
        let ok = r#"{"type":"control_response","response":{"subtype":"success","request_id":"r1","response":{"ok":true}}}"#;
        match parse_frame_line(ok).unwrap() {
            Frame::ControlResponse(ControlOutcome::Success { request_id, .. }) => {
                assert_eq!(request_id, "r1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        let err = r#"{"type":"control_response","response":{"subtype":"error","request_id":"r2","error":"boom"}}"#;
        match parse_frame_line(err).unwrap() {
            Frame::ControlResponse(ControlOutcome::Error { request_id, error }) => {
                assert_eq!(request_id, "r2");
                assert_eq!(error, "boom");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_routes_to_regular() {
        let line = r#"{"type":"tool_progress","tool_use_id":"tu-1"}"#;
        assert!(matches!(
            parse_frame_line(line).unwrap(),
            Frame::Regular(_)
        ));
    }
}
