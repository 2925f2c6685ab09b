use crate::activity;
use crate::auth::{
    expired_session_cookie, find_user_by_name, random_hex, session_cookie, set_password,
    verify_password, CurrentUser,
};
use crate::errors::AppError;
use crate::models::{ActivityKind, LoginRequest, PasswordChangeRequest, UserView};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, warn};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut data = state.data.lock().await;
    let user = match find_user_by_name(&data, &payload.username) {
        Some(user) if verify_password(user, &payload.password) => UserView::from(user),
        _ => {
            warn!("failed login for {:?}", payload.username.trim());
            return Err(AppError::unauthorized("invalid username or password"));
        }
    };

    let token = random_hex(32);
    state.sessions.lock().await.insert(token.clone(), user.id);

    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::User,
        "login",
        None,
        format!("{} signed in", user.username),
    );
    persist_data(&state.data_path, &data).await?;
    info!(user_id = user.id, "user signed in");

    Ok(([(header::SET_COOKIE, session_cookie(&token))], Json(user)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> impl IntoResponse {
    state.sessions.lock().await.remove(&user.token);
    info!(user_id = user.id, "user signed out");
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserView>, AppError> {
    let data = state.data.lock().await;
    data.users
        .get(&user.id)
        .map(|user| Json(UserView::from(user)))
        .ok_or_else(|| AppError::unauthorized("session expired"))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let user = data
        .users
        .get_mut(&current.id)
        .ok_or_else(|| AppError::unauthorized("session expired"))?;
    if !verify_password(user, &payload.current_password) {
        return Err(AppError::unauthorized("current password is incorrect"));
    }
    set_password(user, &payload.new_password)?;

    activity::record(
        &mut data,
        Some(&current.username),
        ActivityKind::User,
        "password_changed",
        None,
        "Password changed",
    );
    persist_data(&state.data_path, &data).await?;
    info!(user_id = current.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
