use std::sync::Arc;

use axum::extract::FromRef;
use time::{Date, OffsetDateTime};
use tracing::{error, info};

use crate::{
    error::{AppError, AppResult},
    history::{
        dto::{CreatedHistoryResponse, DateFilter},
        repo::HistoryStore,
        repo_types::{HistoryRow, NewHistoryEntry},
    },
    state::AppState,
};

/// Append-only activity log of a user against routes.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn HistoryStore>,
}

impl FromRef<AppState> for HistoryService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.history.clone())
    }
}

impl HistoryService {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Newest first. Failures are logged and yield an empty list, unlike the
    /// filtered listings which report them.
    pub async fn get_all(&self, id_usuarios: i32) -> Vec<HistoryRow> {
        match self.store.list_for_user(id_usuarios).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, user_id = id_usuarios, "list history failed");
                Vec::new()
            }
        }
    }

    pub async fn get_by_route(
        &self,
        id_usuarios: i32,
        nombre_ruta: &str,
    ) -> AppResult<Vec<HistoryRow>> {
        let rows = self
            .store
            .list_by_route(id_usuarios, nombre_ruta)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = id_usuarios,
                    nombre_ruta,
                    "list history by route failed"
                );
                AppError::service(format!("Error fetching history: {e:#}"))
            })?;
        if rows.is_empty() {
            return Err(AppError::not_found(format!(
                "No history for route '{}' of user {}",
                nombre_ruta, id_usuarios
            )));
        }
        Ok(rows)
    }

    pub async fn get_by_date(
        &self,
        id_usuarios: i32,
        filter: DateFilter,
    ) -> AppResult<Vec<HistoryRow>> {
        self.get_by_date_on(id_usuarios, filter, OffsetDateTime::now_utc().date())
            .await
    }

    pub(crate) async fn get_by_date_on(
        &self,
        id_usuarios: i32,
        filter: DateFilter,
        today: Date,
    ) -> AppResult<Vec<HistoryRow>> {
        let query = filter.resolve(id_usuarios, today)?;
        let page = query.offset / query.limit + 1;
        let rows = self.store.list_by_date(&query).await.map_err(|e| {
            error!(error = %e, user_id = id_usuarios, "list history by date failed");
            AppError::service(format!("Error fetching history: {e:#}"))
        })?;
        if rows.is_empty() {
            return Err(AppError::not_found(format!(
                "No history on page {} for user {}",
                page, id_usuarios
            )));
        }
        Ok(rows)
    }

    pub async fn create(&self, entry: NewHistoryEntry) -> AppResult<CreatedHistoryResponse> {
        self.store.insert(&entry).await.map_err(|e| {
            error!(
                error = %e,
                user_id = entry.id_usuarios,
                id_ruta = entry.id_ruta,
                "insert history failed"
            );
            AppError::service(format!("Error creating history: {e:#}"))
        })?;
        info!(
            user_id = entry.id_usuarios,
            id_ruta = entry.id_ruta,
            "history entry created"
        );
        Ok(CreatedHistoryResponse {
            message: "History entry created",
        })
    }
}
