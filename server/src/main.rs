use std::io;

use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use clap::Parser;

use server::config::Config;
use server::handlers::root;
use server::server_state::ServerState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let settings = config
        .settings()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let state = web::Data::new(ServerState::new(settings));
    let permissive_cors = config.permissive_cors;

    log::info!("Starting navigation server on {}:{}", config.host, config.port);
    log::info!("MCP endpoint: http://{}:{}/mcp", config.host, config.port);
    if state.settings.map_keys.is_some() {
        log::warn!("Map keys are handed out in viewer links; keep this server on a trusted network");
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Condition::new(permissive_cors, Cors::permissive()))
            .wrap(Logger::default())
            .configure(root)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
