use serde::{Deserialize, Serialize};

use system::serde_json::{json, Value};
use system::{DispatchError, DispatchOutcome, NavType, Policy, SessionId};

use crate::server_state::ServerState;

pub const CREATE_SESSION: &str = "create_session";
pub const SEND_NAVIGATION: &str = "send_navigation_to_map";
pub const SEND_NAVIGATION_ALIAS: &str = "send_navigation";

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub viewer_url: String,
    pub message: String,
}

pub fn create_session(state: &ServerState) -> CreatedSession {
    let session_id = state.sessions.create();
    let viewer_url = state.viewer_url(&session_id);
    let message = format!(
        "Session created, sessionid: {}\n\
         Ask the user to open the map page first: {}\n\
         Then use the '{}' tool to send navigation commands",
        session_id, viewer_url, SEND_NAVIGATION
    );
    CreatedSession {
        session_id,
        viewer_url,
        message,
    }
}

#[derive(Debug, Deserialize)]
pub struct SendNavigationArgs {
    pub session_id: SessionId,
    pub points: Vec<Value>,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default = "default_nav_type")]
    pub nav_type: String,
}

fn default_nav_type() -> String {
    NavType::default().as_str().to_owned()
}

pub fn send_navigation(
    state: &ServerState,
    args: &SendNavigationArgs,
) -> Result<DispatchOutcome, DispatchError> {
    state
        .dispatcher
        .dispatch(&args.session_id, &args.points, args.policy, &args.nav_type)
}

/// Tool list in the shape MCP `tools/list` expects.
pub fn tool_definitions() -> Value {
    let nav_types: Vec<&str> = NavType::ALL.iter().map(|t| t.as_str()).collect();
    json!([
        {
            "name": CREATE_SESSION,
            "description": "Create a new map session. Returns a sessionid and the link the user \
                            must open before navigation commands can be shown. Every session is \
                            independent, so several users can be served at once.",
            "inputSchema": {
                "type": "object",
                "properties": {},
            },
        },
        {
            "name": SEND_NAVIGATION,
            "description": "Send a navigation command to the map page of a session. Points may \
                            be coordinates {\"lng\": 116.379028, \"lat\": 39.865042} or place \
                            keywords {\"keyword\": \"北京站\", \"city\": \"北京\"}, mixed freely. \
                            Make sure the session exists and its map page is open.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "session_id": {
                        "type": "string",
                        "description": "Session id returned by create_session",
                    },
                    "points": {
                        "type": "array",
                        "minItems": 2,
                        "description": "Ordered route points, each with lng/lat or keyword/city",
                        "items": {
                            "type": "object",
                            "properties": {
                                "lng": { "type": "number", "description": "Longitude" },
                                "lat": { "type": "number", "description": "Latitude" },
                                "keyword": { "type": "string", "description": "Place keyword" },
                                "city": { "type": "string", "description": "City of the keyword" },
                            },
                        },
                    },
                    "policy": {
                        "type": "integer",
                        "default": 0,
                        "description": "Driving route policy, 0 prefers speed. Ignored by riding and walking",
                    },
                    "nav_type": {
                        "type": "string",
                        "enum": nav_types,
                        "default": "driving",
                        "description": "driving, riding or walking",
                    },
                },
                "required": ["session_id", "points"],
            },
        },
    ])
}
