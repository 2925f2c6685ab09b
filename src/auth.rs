use crate::errors::{AppError, AuthError, ValidationError};
use crate::models::{Database, User};
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rand::RngCore;
use tracing::info;

pub const SESSION_COOKIE: &str = "sid";
pub const MIN_PASSWORD_LEN: usize = 6;

/// Attached to request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: u64,
    pub username: String,
    pub token: String,
}

pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Hashes with Argon2id into a PHC string that embeds the salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AuthError::Hash(err.to_string()))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(user: &User, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(&user.password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn set_password(user: &mut User, password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN).into());
    }
    user.password_hash = hash_password(password)?;
    Ok(())
}

pub fn create_user(
    db: &mut Database,
    username: &str,
    display_name: &str,
    password: &str,
) -> Result<u64, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::Empty("username").into());
    }
    let mut user = User {
        id: 0,
        username: username.to_string(),
        display_name: display_name.trim().to_string(),
        password_hash: String::new(),
        created_at: Utc::now(),
    };
    set_password(&mut user, password)?;
    let id = db.next_user_id();
    user.id = id;
    db.users.insert(id, user);
    Ok(id)
}

/// Creates the first account when the user table is empty.
pub fn bootstrap_admin(db: &mut Database, username: &str, password: &str) -> Result<bool, AuthError> {
    if !db.users.is_empty() {
        return Ok(false);
    }
    let id = create_user(db, username, "Administrator", password)?;
    info!(user_id = id, "created bootstrap user {username}");
    Ok(true)
}

pub fn find_user_by_name<'a>(db: &'a Database, username: &str) -> Option<&'a User> {
    let username = username.trim();
    db.users.values().find(|user| user.username.eq_ignore_ascii_case(username))
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers()).ok_or_else(|| AppError::unauthorized("login required"))?;
    let user_id = state
        .sessions
        .lock()
        .await
        .get(&token)
        .copied()
        .ok_or_else(|| AppError::unauthorized("session expired"))?;
    let username = {
        let data = state.data.lock().await;
        data.users.get(&user_id).map(|user| user.username.clone())
    }
    .ok_or_else(|| AppError::unauthorized("session expired"))?;

    req.extensions_mut().insert(CurrentUser {
        id: user_id,
        username,
        token,
    });
    Ok(next.run(req).await)
}
