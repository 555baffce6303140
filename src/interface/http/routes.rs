use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::application::MonitoringService;

use super::handlers::{
    clear_history_handler, delete_session_handler, health_handler, history_handler, interfaces_handler,
    list_sessions_handler, load_session_handler, save_session_handler, speed_handler, start_handler,
    status_handler, stop_handler, AppState,
};

pub fn create_router(monitoring_service: Arc<MonitoringService>) -> Router {
    let state = AppState { monitoring_service };

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/interfaces", get(interfaces_handler))
        .route("/api/speed", get(speed_handler))
        .route("/api/history", get(history_handler).delete(clear_history_handler))
        .route("/api/monitor/start", post(start_handler))
        .route("/api/monitor/stop", post(stop_handler))
        .route("/api/sessions", get(list_sessions_handler).post(save_session_handler))
        .route("/api/sessions/{name}", delete(delete_session_handler))
        .route("/api/sessions/{name}/load", post(load_session_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
