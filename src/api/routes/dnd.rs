//! Do-Not-Disturb Routes
//!
//! - GET /api/v1/dnd - Current state
//! - PUT /api/v1/dnd - Switch on or off (the panel screensaver)

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::DndState;
use crate::api::state::AppState;
use crate::websocket::WsEvent;

/// GET /api/v1/dnd
pub async fn get_dnd(State(state): State<Arc<AppState>>) -> Json<DndState> {
    Json(DndState {
        active: state.dnd.is_active(),
    })
}

/// PUT /api/v1/dnd
pub async fn set_dnd(State(state): State<Arc<AppState>>, Json(req): Json<DndState>) -> Json<DndState> {
    let previous = state.dnd.set(req.active);

    if previous != req.active {
        tracing::info!(active = req.active, "Do-not-disturb changed");
        state.ws_hub.publish(WsEvent::do_not_disturb(req.active)).await;
    }

    Json(DndState { active: req.active })
}
