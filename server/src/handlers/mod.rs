use crate::connection::ws_index;
use crate::handlers::mcp::configure_mcp_handlers;
use crate::handlers::status::configure_status_handlers;
use crate::handlers::tools::configure_tool_handlers;
use actix_web::web;

mod mcp;
mod status;
mod tools;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/{session_id}").route(web::get().to(ws_index)));

    configure_tool_handlers(cfg);
    configure_mcp_handlers(cfg);
    configure_status_handlers(cfg);
}
