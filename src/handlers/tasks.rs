use super::{require_client, today};
use crate::activity;
use crate::auth::CurrentUser;
use crate::billing::{month_key, parse_month};
use crate::errors::{AppError, ValidationError};
use crate::models::{
    ActivityKind, Database, MoveTaskRequest, MonthQuery, ReportQuery, Task, TaskInput, TaskQuery,
};
use crate::reports::{task_report_at, TaskReport, DEFAULT_WEEKS};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::tasks::{self, CalendarMonth, KanbanColumn};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use tracing::info;

pub async fn list(State(state): State<AppState>, Query(query): Query<TaskQuery>) -> Json<Vec<Task>> {
    let data = state.data.lock().await;
    Json(tasks::filter_tasks(&data, &query, today()).into_iter().cloned().collect())
}

pub async fn list_for_client(
    State(state): State<AppState>,
    Path(client_id): Path<u64>,
    Query(mut query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let data = state.data.lock().await;
    require_client(&data, client_id)?;
    query.client_id = Some(client_id);
    Ok(Json(tasks::filter_tasks(&data, &query, today()).into_iter().cloned().collect()))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Task>, AppError> {
    let data = state.data.lock().await;
    data.tasks
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| task_not_found(id))
}

pub async fn kanban(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Json<Vec<KanbanColumn>> {
    let data = state.data.lock().await;
    Json(tasks::kanban(&data, &query, today()))
}

pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    let month = query.month.unwrap_or_else(|| month_key(today()));
    let month_start = parse_month(&month)?;
    let data = state.data.lock().await;
    Ok(Json(tasks::calendar(&data, month_start)))
}

pub async fn reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Json<TaskReport> {
    let data = state.data.lock().await;
    Json(task_report_at(&data, today(), query.weeks.unwrap_or(DEFAULT_WEEKS)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let mut data = state.data.lock().await;
    check_client(&data, input.client_id.flatten())?;
    let task = tasks::create_task(&mut data, input, Utc::now())?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Task,
        "created",
        task.client_id,
        format!("Created task {}", task.title),
    );
    persist_data(&state.data_path, &data).await?;
    info!(task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(input): Json<TaskInput>,
) -> Result<Json<Task>, AppError> {
    let mut data = state.data.lock().await;
    check_client(&data, input.client_id.flatten())?;
    let task = data.tasks.get_mut(&id).ok_or_else(|| task_not_found(id))?;
    tasks::apply_input(task, input, Utc::now())?;
    let task = task.clone();

    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Task,
        "updated",
        task.client_id,
        format!("Updated task {}", task.title),
    );
    persist_data(&state.data_path, &data).await?;
    info!(task_id = id, "task updated");
    Ok(Json(task))
}

pub async fn move_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(request): Json<MoveTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let mut data = state.data.lock().await;
    let task = tasks::move_task(&mut data, id, request.status, request.position, Utc::now())
        .ok_or_else(|| task_not_found(id))?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Task,
        "moved",
        task.client_id,
        format!("Moved task {} to {:?}", task.title, task.status),
    );
    persist_data(&state.data_path, &data).await?;
    info!(task_id = id, status = ?task.status, "task moved");
    Ok(Json(task))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let task = data.tasks.remove(&id).ok_or_else(|| task_not_found(id))?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Task,
        "deleted",
        task.client_id,
        format!("Deleted task {}", task.title),
    );
    persist_data(&state.data_path, &data).await?;
    info!(task_id = id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn check_client(data: &Database, client_id: Option<u64>) -> Result<(), AppError> {
    match client_id {
        Some(id) if !data.clients.contains_key(&id) => {
            Err(ValidationError::UnknownClient(id).into())
        }
        _ => Ok(()),
    }
}

fn task_not_found(id: u64) -> AppError {
    AppError::not_found(format!("task {id} not found"))
}
