use super::require_client;
use crate::activity;
use crate::auth::CurrentUser;
use crate::errors::{AppError, ValidationError};
use crate::models::{ActivityKind, Note, NoteInput};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use std::cmp::Reverse;
use tracing::info;

/// Pinned notes first, then newest first.
pub async fn list_for_client(
    State(state): State<AppState>,
    Path(client_id): Path<u64>,
) -> Result<Json<Vec<Note>>, AppError> {
    let data = state.data.lock().await;
    require_client(&data, client_id)?;
    let mut notes: Vec<Note> = data
        .notes
        .values()
        .filter(|note| note.client_id == client_id)
        .cloned()
        .collect();
    notes.sort_by_key(|note| (Reverse(note.pinned), Reverse(note.created_at), Reverse(note.id)));
    Ok(Json(notes))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(client_id): Path<u64>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let body = note_body(input.body)?;
    let mut data = state.data.lock().await;
    let client_name = require_client(&data, client_id)?.name.clone();

    let now = Utc::now();
    let note = Note {
        id: data.next_note_id(),
        client_id,
        body,
        pinned: input.pinned.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };
    data.notes.insert(note.id, note.clone());
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Note,
        "created",
        Some(client_id),
        format!("Added a note to {client_name}"),
    );
    persist_data(&state.data_path, &data).await?;
    info!(note_id = note.id, client_id, "note created");
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(input): Json<NoteInput>,
) -> Result<Json<Note>, AppError> {
    let body = input.body.map(|body| note_body(Some(body))).transpose()?;
    let mut data = state.data.lock().await;
    let note = data
        .notes
        .get_mut(&id)
        .ok_or_else(|| AppError::not_found(format!("note {id} not found")))?;
    if let Some(body) = body {
        note.body = body;
    }
    if let Some(pinned) = input.pinned {
        note.pinned = pinned;
    }
    note.updated_at = Utc::now();
    let note = note.clone();

    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Note,
        "updated",
        Some(note.client_id),
        "Edited a note",
    );
    persist_data(&state.data_path, &data).await?;
    Ok(Json(note))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let note = data
        .notes
        .remove(&id)
        .ok_or_else(|| AppError::not_found(format!("note {id} not found")))?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Note,
        "deleted",
        Some(note.client_id),
        "Deleted a note",
    );
    persist_data(&state.data_path, &data).await?;
    info!(note_id = id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn note_body(body: Option<String>) -> Result<String, ValidationError> {
    body.map(|body| body.trim().to_string())
        .filter(|body| !body.is_empty())
        .ok_or(ValidationError::Empty("body"))
}
