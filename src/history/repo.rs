use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::history::repo_types::{DateQuery, HistoryRow, NewHistoryEntry};

/// Persistence for `historial_actividades`. Rows are only ever inserted and read.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, id_usuarios: i32) -> anyhow::Result<Vec<HistoryRow>>;
    async fn list_by_route(
        &self,
        id_usuarios: i32,
        nombre_ruta: &str,
    ) -> anyhow::Result<Vec<HistoryRow>>;
    async fn list_by_date(&self, query: &DateQuery) -> anyhow::Result<Vec<HistoryRow>>;
    async fn insert(&self, entry: &NewHistoryEntry) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Direction comes from `SortOrder`; every value is bound. Days are UTC
/// calendar days whatever the session time zone.
pub(crate) fn date_page_query(query: &DateQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT h.id_ruta, r.nombre_ruta, h.fecha \
         FROM historial_actividades h \
         JOIN rutas r ON h.id_ruta = r.id_ruta ",
    );
    qb.push("WHERE h.id_usuarios = ")
        .push_bind(query.id_usuarios)
        .push(" AND (h.fecha AT TIME ZONE 'UTC')::date BETWEEN ")
        .push_bind(query.start)
        .push(" AND ")
        .push_bind(query.end)
        .push(" ORDER BY h.fecha ")
        .push(query.order.as_sql())
        .push(" LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    qb
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn list_for_user(&self, id_usuarios: i32) -> anyhow::Result<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT h.id_ruta, r.nombre_ruta, h.fecha
            FROM historial_actividades h
            JOIN rutas r ON h.id_ruta = r.id_ruta
            WHERE h.id_usuarios = $1
            ORDER BY h.fecha DESC
            "#,
        )
        .bind(id_usuarios)
        .fetch_all(&self.pool)
        .await
        .context("list history")?;
        Ok(rows)
    }

    async fn list_by_route(
        &self,
        id_usuarios: i32,
        nombre_ruta: &str,
    ) -> anyhow::Result<Vec<HistoryRow>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT h.id_ruta, r.nombre_ruta, h.fecha
            FROM historial_actividades h
            JOIN rutas r ON h.id_ruta = r.id_ruta
            WHERE h.id_usuarios = $1 AND r.nombre_ruta = $2
            ORDER BY h.fecha DESC
            "#,
        )
        .bind(id_usuarios)
        .bind(nombre_ruta)
        .fetch_all(&self.pool)
        .await
        .context("list history by route")?;
        Ok(rows)
    }

    async fn list_by_date(&self, query: &DateQuery) -> anyhow::Result<Vec<HistoryRow>> {
        let mut qb = date_page_query(query);
        let rows = qb
            .build_query_as::<HistoryRow>()
            .fetch_all(&self.pool)
            .await
            .context("list history by date")?;
        Ok(rows)
    }

    async fn insert(&self, entry: &NewHistoryEntry) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("begin insert history")?;
        sqlx::query(
            r#"
            INSERT INTO historial_actividades (id_usuarios, id_ruta, fecha)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(entry.id_usuarios)
        .bind(entry.id_ruta)
        .bind(entry.fecha)
        .execute(&mut *tx)
        .await
        .context("insert history")?;
        tx.commit().await.context("commit insert history")?;
        Ok(())
    }
}
