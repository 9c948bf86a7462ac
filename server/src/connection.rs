use std::sync::Arc;
use std::time::Instant;

use actix::{
    Actor, ActorContext, AsyncContext, Handler, Message, Recipient, Running, StreamHandler,
};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::{self, error::TrySendError};

use system::serde_json::json;
use system::{ConnectionHandle, ConnectionTable, PushError, SessionId};

use crate::config::GatewaySettings;
use crate::server_state::ServerState;

/// Send side of a viewer's outbound queue, as stored in the connection table.
#[derive(Debug, Clone)]
pub struct ConnectionTx(mpsc::Sender<String>);

impl ConnectionTx {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self(tx), rx)
    }
}

impl ConnectionHandle for ConnectionTx {
    fn push(&self, payload: String) -> Result<(), PushError> {
        self.0.try_send(payload).map_err(|err| match err {
            TrySendError::Full(_) => PushError::Full,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    fn same_connection(&self, other: &Self) -> bool {
        self.0.same_channel(&other.0)
    }
}

#[derive(Message)]
#[rtype(result = "()")]
struct Egress(String);

/// Moves queued frames to the actor one at a time, so a stalled viewer backs up
/// into the bounded channel and pushes start failing with `Full`.
async fn forward_egress(mut rx: mpsc::Receiver<String>, recipient: Recipient<Egress>) {
    log::debug!("connection green thread - started");
    while let Some(payload) = rx.recv().await {
        if recipient.send(Egress(payload)).await.is_err() {
            break;
        }
    }
    log::debug!("connection green thread - terminated");
}

enum ConnectionState {
    Connecting,
    Open(ConnectionTx),
    Closed,
}

struct ConnectionActor {
    state: ConnectionState,
    session_id: SessionId,
    connections: Arc<ConnectionTable<ConnectionTx>>,
    settings: GatewaySettings,
    last_seen: Instant,
}

impl ConnectionActor {
    fn new(
        session_id: SessionId,
        connections: Arc<ConnectionTable<ConnectionTx>>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            state: ConnectionState::Connecting,
            session_id,
            connections,
            settings,
            last_seen: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.settings.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_seen) > act.settings.client_timeout {
                log::warn!(
                    "Viewer of session {} timed out, disconnecting",
                    act.session_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn close(&mut self) {
        if let ConnectionState::Open(tx) = std::mem::replace(&mut self.state, ConnectionState::Closed)
        {
            if self.connections.unbind(&self.session_id, &tx) {
                log::info!("Viewer detached from session {}", self.session_id);
            } else {
                log::debug!(
                    "Replaced viewer of session {} closed, binding untouched",
                    self.session_id
                );
            }
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = ConnectionTx::channel(self.settings.outbound_buffer);
        self.connections.bind(&self.session_id, tx.clone());
        self.state = ConnectionState::Open(tx);
        log::info!("Viewer attached to session {}", self.session_id);

        actix_web::rt::spawn(forward_egress(rx, ctx.address().recipient()));

        self.start_heartbeat(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.close();
        Running::Stop
    }
}

/// Ingress. Viewers only send keepalive traffic; payloads are drained and ignored.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_seen = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_seen = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_seen = Instant::now();
                log::debug!("Ingress from session {} ignored: {}", self.session_id, text);
            }
            Ok(ws::Message::Binary(bin)) => {
                self.last_seen = Instant::now();
                log::debug!(
                    "Ingress from session {} ignored, size: {}",
                    self.session_id,
                    bin.len()
                );
            }
            Ok(ws::Message::Close(reason)) => {
                self.close();
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => (),
            Err(err) => {
                log::warn!(
                    "Protocol error on session {}: {}, disconnecting",
                    self.session_id,
                    err
                );
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<Egress> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: Egress, ctx: &mut ws::WebsocketContext<Self>) -> Self::Result {
        if let ConnectionState::Open(_) = self.state {
            ctx.text(msg.0);
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    state: web::Data<ServerState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let settings = &state.settings.gateway;

    if !state.sessions.exists(&session_id) {
        if settings.strict_attach {
            log::warn!("Refused viewer for unknown session {}", session_id);
            return Ok(HttpResponse::NotFound().json(json!({
                "error": "unknown_session",
                "message": format!("invalid session id: {}", session_id),
            })));
        }
        log::warn!("Viewer attaching to unknown session {}", session_id);
    }

    ws::start(
        ConnectionActor::new(session_id, state.connections.clone(), settings.clone()),
        &req,
        stream,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use actix::ResponseFuture;
    use actix_web::http::StatusCode;
    use actix_web::rt::time::sleep;
    use actix_web::{test as web_test, App};
    use futures::{SinkExt, Stream, StreamExt};
    use std::time::Duration;
    use system::serde_json::{self, json, Value};

    #[actix_web::test]
    async fn it_should_report_closed_after_receiver_drops() {
        let (tx, rx) = ConnectionTx::channel(4);
        assert_eq!(tx.push("hello".into()), Ok(()));
        drop(rx);
        assert_eq!(tx.push("again".into()), Err(PushError::Closed));
    }

    #[actix_web::test]
    async fn it_should_report_full_without_blocking() {
        let (tx, mut rx) = ConnectionTx::channel(1);
        assert_eq!(tx.push("first".into()), Ok(()));
        assert_eq!(tx.push("second".into()), Err(PushError::Full));
        assert_eq!(rx.recv().await.as_deref(), Some("first"));
    }

    #[actix_web::test]
    async fn it_should_tell_channels_apart() {
        let (a, _rx_a) = ConnectionTx::channel(1);
        let (b, _rx_b) = ConnectionTx::channel(1);
        assert!(a.same_connection(&a.clone()));
        assert!(!a.same_connection(&b));
    }

    /// Accepts frames but never finishes handling them.
    struct StalledViewer;

    impl Actor for StalledViewer {
        type Context = actix::Context<Self>;
    }

    impl Handler<Egress> for StalledViewer {
        type Result = ResponseFuture<()>;

        fn handle(&mut self, _: Egress, _: &mut Self::Context) -> Self::Result {
            Box::pin(std::future::pending::<()>())
        }
    }

    #[actix_web::test]
    async fn it_should_fill_up_behind_a_stalled_actor() {
        let (tx, rx) = ConnectionTx::channel(2);
        actix_web::rt::spawn(forward_egress(rx, StalledViewer.start().recipient()));

        assert_eq!(tx.push("1".into()), Ok(()));
        sleep(Duration::from_millis(50)).await;

        assert_eq!(tx.push("2".into()), Ok(()));
        assert_eq!(tx.push("3".into()), Ok(()));
        assert_eq!(tx.push("4".into()), Err(PushError::Full));
    }

    async fn attach_status(strict_attach: bool, known: bool) -> StatusCode {
        let mut settings = Settings::default();
        settings.gateway.strict_attach = strict_attach;
        let state = web::Data::new(ServerState::new(settings));
        let session_id = if known {
            state.sessions.create()
        } else {
            "abc".to_owned()
        };
        let app = web_test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/ws/{session_id}", web::get().to(ws_index)),
        )
        .await;

        let req = web_test::TestRequest::get()
            .uri(&format!("/ws/{}", session_id))
            .insert_header(("upgrade", "websocket"))
            .insert_header(("connection", "upgrade"))
            .insert_header(("sec-websocket-version", "13"))
            .insert_header(("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="))
            .to_request();
        web_test::call_service(&app, req).await.status()
    }

    #[actix_web::test]
    async fn it_should_attach_unknown_session_when_permissive() {
        assert_eq!(
            attach_status(false, false).await,
            StatusCode::SWITCHING_PROTOCOLS
        );
    }

    #[actix_web::test]
    async fn it_should_refuse_unknown_session_when_strict() {
        assert_eq!(attach_status(true, false).await, StatusCode::NOT_FOUND);
        assert_eq!(
            attach_status(true, true).await,
            StatusCode::SWITCHING_PROTOCOLS
        );
    }

    fn serve(state: &web::Data<ServerState>) -> actix_test::TestServer {
        let state = state.clone();
        actix_test::start(move || {
            App::new()
                .app_data(state.clone())
                .route("/ws/{session_id}", web::get().to(ws_index))
        })
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }
        check()
    }

    async fn next_text<S>(viewer: &mut S) -> Value
    where
        S: Stream<Item = Result<awc::ws::Frame, awc::error::WsProtocolError>> + Unpin,
    {
        while let Some(frame) = viewer.next().await {
            if let awc::ws::Frame::Text(bytes) = frame.expect("frame") {
                return serde_json::from_slice(&bytes).expect("json frame");
            }
        }
        panic!("viewer closed before a text frame arrived");
    }

    async fn wait_for_close<S>(viewer: &mut S)
    where
        S: Stream<Item = Result<awc::ws::Frame, awc::error::WsProtocolError>> + Unpin,
    {
        while let Some(Ok(frame)) = viewer.next().await {
            if let awc::ws::Frame::Close(_) = frame {
                break;
            }
        }
    }

    fn route() -> Vec<Value> {
        vec![
            json!({"lng": 116.379028, "lat": 39.865042}),
            json!({"keyword": "天安门", "city": "北京"}),
        ]
    }

    #[actix_web::test]
    async fn it_should_bind_while_open_and_unbind_on_close() {
        let state = web::Data::new(ServerState::new(Settings::default()));
        let session_id = state.sessions.create();
        let mut srv = serve(&state);

        let mut viewer = srv
            .ws_at(&format!("/ws/{}", session_id))
            .await
            .expect("connect");
        assert!(eventually(|| state.connections.is_bound(&session_id)).await);

        let outcome = state
            .dispatcher
            .dispatch(&session_id, &route(), 0, "driving")
            .expect("valid input");
        assert!(outcome.delivered);
        let frame = next_text(&mut viewer).await;
        assert_eq!(frame["type"], "navigation");
        assert_eq!(frame["command"]["points"][1]["keyword"], "天安门");

        viewer
            .send(awc::ws::Message::Close(None))
            .await
            .expect("send close");
        wait_for_close(&mut viewer).await;
        assert!(eventually(|| !state.connections.is_bound(&session_id)).await);

        let outcome = state
            .dispatcher
            .dispatch(&session_id, &route(), 0, "driving")
            .expect("valid input");
        assert!(!outcome.delivered);
        assert!(!state.connections.bound_tokens().contains(&session_id));
    }

    #[actix_web::test]
    async fn it_should_keep_newer_viewer_when_replaced_one_closes() {
        let state = web::Data::new(ServerState::new(Settings::default()));
        let session_id = state.sessions.create();
        let mut srv = serve(&state);
        let path = format!("/ws/{}", session_id);

        let mut first = srv.ws_at(&path).await.expect("connect first");
        assert!(eventually(|| state.connections.is_bound(&session_id)).await);
        let first_tx = state.connections.get(&session_id).expect("bound");

        let mut second = srv.ws_at(&path).await.expect("connect second");
        assert!(
            eventually(|| state
                .connections
                .get(&session_id)
                .map_or(false, |tx| !tx.same_connection(&first_tx)))
            .await
        );

        first
            .send(awc::ws::Message::Close(None))
            .await
            .expect("send close");
        wait_for_close(&mut first).await;
        sleep(Duration::from_millis(50)).await;

        let current = state.connections.get(&session_id).expect("still bound");
        assert!(!current.same_connection(&first_tx));

        let outcome = state
            .dispatcher
            .dispatch(&session_id, &route(), 5, "walking")
            .expect("valid input");
        assert!(outcome.delivered);
        assert_eq!(next_text(&mut second).await["command"]["nav_type"], "walking");
    }

    #[actix_web::test]
    async fn it_should_unbind_viewer_that_stops_answering_pings() {
        let mut settings = Settings::default();
        settings.gateway.heartbeat_interval = Duration::from_millis(50);
        settings.gateway.client_timeout = Duration::from_millis(150);
        let state = web::Data::new(ServerState::new(settings));
        let session_id = state.sessions.create();
        let mut srv = serve(&state);

        // Never polled, so pings go unanswered.
        let _viewer = srv
            .ws_at(&format!("/ws/{}", session_id))
            .await
            .expect("connect");
        assert!(eventually(|| state.connections.is_bound(&session_id)).await);
        assert!(eventually(|| !state.connections.is_bound(&session_id)).await);
    }
}
