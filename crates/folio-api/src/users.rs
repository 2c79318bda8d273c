use axum::{
    Extension, Json,
    extract::{Path, State},
};

use folio_db::models::UserRow;
use folio_types::api::{
    ChangePasswordRequest, Claims, MessageResponse, UpdateUserRequest, UserResponse,
};

use crate::auth::{self, AppState};
use crate::error::{ApiError, blocking};
use crate::middleware::ensure_owner;

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        username: row.username,
        email: row.email,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let st = state.clone();
    let rows = blocking(move || st.db.list_users()).await?;
    Ok(Json(rows.into_iter().map(user_response).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let st = state.clone();
    let row = blocking(move || st.db.get_user_by_id(id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user_response(row)))
}

/// PUT /api/users/{id} — owner-only; omitted fields keep their current value.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_owner(&claims, id)?;

    let st = state.clone();
    let existing = blocking(move || st.db.get_user_by_id(id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let username = req.username.unwrap_or(existing.username);
    let email = req.email.unwrap_or(existing.email);
    if username.trim().is_empty() || email.trim().is_empty() {
        return Err(ApiError::Validation(
            "Username and email must not be empty".into(),
        ));
    }

    let st = state.clone();
    let (uname, mail) = (username.clone(), email.clone());
    if blocking(move || st.db.duplicate_user_exists(&uname, &mail, id)).await? {
        return Err(ApiError::Validation(
            "Username or email already exists".into(),
        ));
    }

    let st = state.clone();
    let row = blocking(move || {
        st.db.update_user(id, &username, &email)?;
        st.db.get_user_by_id(id)
    })
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(user_response(row)))
}

/// PUT /api/users/{id}/password — owner-only; the current password must
/// verify against the stored digest before the new one is accepted.
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&claims, id)?;

    let current = req
        .current_password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("Current password and new password are required".into())
        })?;
    let new_password = req.new_password.filter(|s| !s.is_empty()).ok_or_else(|| {
        ApiError::Validation("Current password and new password are required".into())
    })?;

    let st = state.clone();
    let user = blocking(move || st.db.get_user_by_id(id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    // Argon2 verification and hashing are CPU-bound
    let digest = user.password_hash;
    if !blocking(move || auth::verify_password(&current, &digest)).await? {
        return Err(ApiError::PasswordMismatch);
    }

    let new_digest = blocking(move || auth::hash_password(&new_password)).await?;

    let st = state.clone();
    blocking(move || {
        st.db.update_password(id, &new_digest)?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&claims, id)?;

    let st = state.clone();
    if blocking(move || st.db.delete_user(id)).await? == 0 {
        return Err(ApiError::NotFound("User"));
    }

    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}
