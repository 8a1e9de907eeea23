use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    error::AppResult,
    state::AppState,
    users::{
        dto::{LoginRequest, TokenResponse},
        services::UserService,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(svc, payload))]
pub async fn login(
    State(svc): State<UserService>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(svc.login(payload).await?))
}
