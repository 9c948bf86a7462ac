use actix_web::http::StatusCode;
use actix_web::web::{self, Data, Json};
use actix_web::{HttpResponse, ResponseError};
use system::serde_json::json;
use system::DispatchError;
use thiserror::Error;

use crate::server_state::ServerState;
use crate::tools::{self, SendNavigationArgs};

pub fn configure_tool_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tools")
            .service(web::resource("/create_session").route(web::post().to(create_session)))
            .service(web::resource("/send_navigation").route(web::post().to(send_navigation))),
    );
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ToolError(#[from] DispatchError);

impl ResponseError for ToolError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            DispatchError::UnknownSession(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }))
    }
}

async fn create_session(state: Data<ServerState>) -> HttpResponse {
    HttpResponse::Ok().json(tools::create_session(&state))
}

async fn send_navigation(
    state: Data<ServerState>,
    args: Json<SendNavigationArgs>,
) -> Result<HttpResponse, ToolError> {
    let outcome = tools::send_navigation(&state, &args)?;
    Ok(HttpResponse::Ok().json(json!({
        "delivered": outcome.delivered,
        "summary": outcome.summary,
        "command": outcome.command,
    })))
}
