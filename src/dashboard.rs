use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tower_http::cors::CorsLayer;

use crate::release::ReleaseController;
use crate::telemetry::SharedTelemetry;

/// State the ground-station routes work against. The deploy/reset routes are
/// the only writers outside the scheduler task.
#[derive(Clone)]
pub struct DashboardState {
    pub telemetry: SharedTelemetry,
    pub release: Arc<RwLock<ReleaseController>>,
}

pub async fn start_dashboard(state: DashboardState, port: u16) {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/data", get(data_handler))
        .route("/ws", get(ws_handler))
        .route("/deploy", get(deploy_handler))
        .route("/reset", get(reset_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    log::info!("[dashboard] ground station at http://{}", addr);

    let listener = TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("dashboard_static.html"))
}

async fn data_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let record = state.telemetry.read().await.record();
    axum::Json(record)
}

async fn deploy_handler(State(state): State<DashboardState>) -> &'static str {
    state.release.write().await.deploy();
    let mut snapshot = state.telemetry.write().await;
    snapshot.parachute_deployed = true;
    snapshot.mission_status = "PARACHUTE DEPLOYED".to_string();
    log::warn!("[dashboard] parachute deploy commanded from ground station");
    "OK"
}

async fn reset_handler(State(state): State<DashboardState>) -> &'static str {
    state.release.write().await.reset();
    let mut snapshot = state.telemetry.write().await;
    snapshot.parachute_deployed = false;
    snapshot.mission_status = "READY".to_string();
    "OK"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<DashboardState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: DashboardState) {
    // Push loop; the page polls /data, the websocket is for log consumers
    // that want the stream without polling.
    loop {
        let record = state.telemetry.read().await.record();
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(_) => break,
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            // Client disconnected
            break;
        }

        // 5Hz updates
        sleep(Duration::from_millis(200)).await;
    }
}
