use std::collections::BTreeMap;

use actix_web::web::{self, Data};
use actix_web::HttpResponse;
use system::serde_json::json;

use crate::server_state::ServerState;

pub const SERVICE_NAME: &str = "Map Navigation MCP Server";

pub fn configure_status_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/queue-status").route(web::get().to(queue_status)))
        .service(web::resource("/sessions").route(web::get().to(sessions)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// Commands are never queued, so every known session reports a depth of 0.
async fn queue_status(state: Data<ServerState>) -> HttpResponse {
    let session_queues: BTreeMap<String, usize> = state
        .sessions
        .tokens()
        .into_iter()
        .map(|session_id| (session_id, 0))
        .collect();
    HttpResponse::Ok().json(json!({
        "active_sessions": state.connections.len(),
        "session_queues": session_queues,
    }))
}

async fn sessions(state: Data<ServerState>) -> HttpResponse {
    let mut active_sessions = state.connections.bound_tokens();
    active_sessions.sort();
    HttpResponse::Ok().json(json!({
        "active_sessions": active_sessions,
        "total_sessions": state.sessions.len(),
    }))
}
