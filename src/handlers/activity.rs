use super::require_client;
use crate::activity::history;
use crate::errors::AppError;
use crate::models::{Activity, ActivityQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<Activity>> {
    let data = state.data.lock().await;
    Json(history(&data, &query).into_iter().cloned().collect())
}

pub async fn list_for_client(
    State(state): State<AppState>,
    Path(client_id): Path<u64>,
    Query(mut query): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, AppError> {
    let data = state.data.lock().await;
    require_client(&data, client_id)?;
    query.client_id = Some(client_id);
    Ok(Json(history(&data, &query).into_iter().cloned().collect()))
}
