//! WebSocket session server.

pub mod handler;

pub use handler::SessionHandler;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::domain::WebSocketConfig;
use crate::pipeline::BridgeHandle;

#[derive(Clone)]
struct WsState {
    core: BridgeHandle,
    config: WebSocketConfig,
}

/// Router serving dashboard sessions at `/`.
pub fn build_ws_router(core: BridgeHandle, config: WebSocketConfig) -> Router {
    Router::new()
        .route("/", get(upgrade))
        .with_state(WsState { core, config })
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    let handler = SessionHandler::new(state.core, &state.config);
    ws.max_message_size(state.config.max_frame_size)
        .max_frame_size(state.config.max_frame_size)
        .on_upgrade(move |socket| handler.handle(socket))
}
