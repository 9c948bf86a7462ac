//! MCP over plain JSON-RPC 2.0: one request per POST, one JSON response back.

use actix_web::web::{self, Bytes, Data};
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use system::serde_json::{self, json, Value};

use crate::handlers::status::SERVICE_NAME;
use crate::server_state::ServerState;
use crate::tools::{self, SendNavigationArgs};

const PROTOCOL_VERSION: &str = "2025-03-26";

mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}

pub fn configure_mcp_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/mcp").route(web::post().to(mcp_endpoint)));
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcError {
    fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self {
            code: -32700,
            message: format!("Parse error: {}", detail),
        }
    }

    fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self {
            code: -32600,
            message: format!("Invalid request: {}", detail),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
        }
    }

    fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self {
            code: -32602,
            message: format!("Invalid params: {}", detail),
        }
    }
}

fn success(id: Value, result: Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn failure(id: Value, error: JsonRpcError) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "jsonrpc": "2.0", "id": id, "error": error }))
}

async fn mcp_endpoint(state: Data<ServerState>, body: Bytes) -> HttpResponse {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => return failure(Value::Null, JsonRpcError::parse_error(err)),
    };
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => return failure(Value::Null, JsonRpcError::invalid_request(err)),
    };
    log::debug!("MCP request: {}", request.method);

    let id = match request.id {
        Some(id) => id,
        // Notifications get no response body.
        None => return HttpResponse::Accepted().finish(),
    };

    match request.method.as_str() {
        methods::INITIALIZE => {
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|params| params.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or(PROTOCOL_VERSION)
                .to_owned();
            success(
                id,
                json!({
                    "protocolVersion": protocol_version,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": SERVICE_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
        }
        methods::INITIALIZED => HttpResponse::Accepted().finish(),
        methods::PING => success(id, json!({})),
        methods::TOOLS_LIST => success(id, json!({ "tools": tools::tool_definitions() })),
        methods::TOOLS_CALL => match call_tool(&state, request.params) {
            Ok(result) => success(id, result),
            Err(error) => failure(id, error),
        },
        method => failure(id, JsonRpcError::method_not_found(method)),
    }
}

fn text_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

/// Input mistakes come back as tool results with `isError`, so the agent can read and fix them.
fn call_tool(state: &ServerState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("missing tool name"))?;
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    match name {
        tools::CREATE_SESSION => {
            let created = tools::create_session(state);
            Ok(text_result(created.message, false))
        }
        tools::SEND_NAVIGATION | tools::SEND_NAVIGATION_ALIAS => {
            let args: SendNavigationArgs =
                serde_json::from_value(arguments).map_err(JsonRpcError::invalid_params)?;
            match tools::send_navigation(state, &args) {
                Ok(outcome) => {
                    let mut result = text_result(outcome.summary, false);
                    result["structuredContent"] = json!({
                        "delivered": outcome.delivered,
                        "command": outcome.command,
                    });
                    Ok(result)
                }
                Err(err) => {
                    log::info!("Rejected {} call: {}", name, err);
                    Ok(text_result(err.to_string(), true))
                }
            }
        }
        unknown => Err(JsonRpcError::invalid_params(format!(
            "unknown tool: {}",
            unknown
        ))),
    }
}
