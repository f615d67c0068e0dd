//! JSON-RPC protocol types for copilot CLI communication.
//!
//! - **Requests**: client → CLI (`session.create`, `session.send`)
//! - **Responses**: CLI → client (result or error)
//! - **Notifications**: CLI → client (`session.event` carrying streaming
//!   deltas, `session.idle`, `session.start`)

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Outgoing error reply to a CLI-initiated request.
///
/// The client exposes no callable surface, so every incoming request is
/// answered with method-not-found, which ends the server's pending call
/// immediately instead of leaving it to time out.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorReply {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub error: RpcError,
}

impl JsonRpcErrorReply {
    pub fn method_not_found(id: u64, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcError {
                code: -32601,
                message: format!("method not supported: {method}"),
                data: None,
            },
        }
    }
}

/// Notification from the CLI (`session.event`, etc.)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// Session creation parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Explicit tool surface. `Some(vec![])` declares no tools at all,
    /// which is how read-only sessions are enforced at the capability
    /// level; `None` omits the field and accepts the CLI's defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
}

/// Send parameters (for `session.send`)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    pub session_id: String,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = JsonRpcRequest::new("session.send", None);
        let b = JsonRpcRequest::new("session.send", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_session_params_serialize_camel_case() {
        let params = CreateSessionParams {
            model: Some("claude-sonnet-4.5".to_string()),
            system_prompt: Some("read-only analysis".to_string()),
            tools: None,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4.5");
        assert_eq!(json["systemPrompt"], "read-only analysis");
    }

    #[test]
    fn create_session_params_omit_absent_fields() {
        let params = CreateSessionParams {
            model: None,
            system_prompt: None,
            tools: None,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("model").is_none());
        assert!(json.get("systemPrompt").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn empty_tool_list_is_sent_explicitly() {
        let params = CreateSessionParams {
            model: None,
            system_prompt: None,
            tools: Some(Vec::new()),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["tools"], serde_json::json!([]));
    }

    #[test]
    fn method_not_found_reply_echoes_request_id() {
        let reply = JsonRpcErrorReply::method_not_found(17, "tool.call");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 17);
        assert_eq!(json["error"]["code"], -32601);
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap()
                .contains("tool.call")
        );
    }

    #[test]
    fn send_params_serialize_session_id() {
        let params = SendParams {
            session_id: "sess-1".to_string(),
            prompt: "hello".to_string(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["sessionId"], "sess-1");
        assert_eq!(json["prompt"], "hello");
    }

    #[test]
    fn response_with_error_deserializes() {
        let json = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32000, "message": "model not found", "data": null}
        });
        let response: JsonRpcResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.id, Some(3));
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "model not found");
    }
}
