use super::today;
use crate::reports::{dashboard_at, Dashboard};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{extract::State, response::Html, Json};
use serde_json::{json, Value};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.company_name))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    let data = state.data.lock().await;
    Json(dashboard_at(&data, today()))
}
