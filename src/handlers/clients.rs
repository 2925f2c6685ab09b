use super::{require_client, today};
use crate::activity;
use crate::auth::CurrentUser;
use crate::billing::{client_balance_at, ClientBalance};
use crate::clients;
use crate::errors::AppError;
use crate::models::{ActivityKind, Client, ClientInput, ClientQuery};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub balance: ClientBalance,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Json<Vec<Client>> {
    let data = state.data.lock().await;
    Json(clients::search_clients(&data, &query).into_iter().cloned().collect())
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClientDetail>, AppError> {
    let data = state.data.lock().await;
    let client = require_client(&data, id)?.clone();
    let balance = client_balance_at(&data, id, today())?;
    Ok(Json(ClientDetail { client, balance }))
}

pub async fn balance(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClientBalance>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(client_balance_at(&data, id, today())?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<ClientInput>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let mut data = state.data.lock().await;
    let client = clients::create_client(&mut data, input, today())?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Client,
        "created",
        Some(client.id),
        format!("Created client {}", client.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(client_id = client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, AppError> {
    let mut data = state.data.lock().await;
    let client = data
        .clients
        .get_mut(&id)
        .ok_or_else(|| AppError::not_found(format!("client {id} not found")))?;
    clients::apply_input(client, input)?;
    let client = client.clone();

    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Client,
        "updated",
        Some(id),
        format!("Updated client {}", client.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(client_id = id, "client updated");
    Ok(Json(client))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let client = data
        .remove_client(id)
        .ok_or_else(|| AppError::not_found(format!("client {id} not found")))?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Client,
        "deleted",
        Some(id),
        format!("Deleted client {}", client.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(client_id = id, "client deleted");
    Ok(StatusCode::NO_CONTENT)
}
