use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, CreateUserRequest, CreatedUserResponse, MessageResponse,
            UpdateUserRequest,
        },
        repo_types::User,
        services::UserService,
    },
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/me", patch(update_me).delete(delete_me))
        .route("/users/me/password", put(change_password))
        .route("/users/:id", get(get_user))
}

#[instrument(skip(svc, payload))]
pub async fn create_user(
    State(svc): State<UserService>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreatedUserResponse>)> {
    let created = svc.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(svc))]
pub async fn list_users(
    State(svc): State<UserService>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(svc.read_all().await?))
}

#[instrument(skip(svc))]
pub async fn get_user(
    State(svc): State<UserService>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    svc.read_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[instrument(skip(svc, payload))]
pub async fn update_me(
    State(svc): State<UserService>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(svc.update(user_id, payload).await?))
}

#[instrument(skip(svc, payload))]
pub async fn change_password(
    State(svc): State<UserService>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(svc.update_password(user_id, payload).await?))
}

#[instrument(skip(svc))]
pub async fn delete_me(
    State(svc): State<UserService>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(svc.delete(user_id).await?))
}
