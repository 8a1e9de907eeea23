use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    history::{
        dto::{CreateHistoryRequest, CreatedHistoryResponse, DateFilter},
        repo_types::{HistoryRow, NewHistoryEntry},
        services::HistoryService,
    },
    state::AppState,
};

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(list_history).post(create_history))
        .route("/history/route/:nombre_ruta", get(history_by_route))
        .route("/history/date", get(history_by_date))
}

#[instrument(skip(svc))]
pub async fn list_history(
    State(svc): State<HistoryService>,
    AuthUser(user_id): AuthUser,
) -> Json<Vec<HistoryRow>> {
    Json(svc.get_all(user_id).await)
}

#[instrument(skip(svc))]
pub async fn history_by_route(
    State(svc): State<HistoryService>,
    AuthUser(user_id): AuthUser,
    Path(nombre_ruta): Path<String>,
) -> AppResult<Json<Vec<HistoryRow>>> {
    Ok(Json(svc.get_by_route(user_id, &nombre_ruta).await?))
}

#[instrument(skip(svc))]
pub async fn history_by_date(
    State(svc): State<HistoryService>,
    AuthUser(user_id): AuthUser,
    Query(filter): Query<DateFilter>,
) -> AppResult<Json<Vec<HistoryRow>>> {
    Ok(Json(svc.get_by_date(user_id, filter).await?))
}

#[instrument(skip(svc))]
pub async fn create_history(
    State(svc): State<HistoryService>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateHistoryRequest>,
) -> AppResult<(StatusCode, Json<CreatedHistoryResponse>)> {
    let entry = NewHistoryEntry {
        id_usuarios: user_id,
        id_ruta: body.id_ruta,
        fecha: body.fecha.unwrap_or_else(OffsetDateTime::now_utc),
    };
    let ack = svc.create(entry).await?;
    Ok((StatusCode::CREATED, Json(ack)))
}
