use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::users::repo_types::{Credentials, NewUser, ProfileChanges, User};

/// Persistence for `usuarios`. Counts returned by the write methods are rows affected.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>>;
    async fn find_credentials_by_email(&self, email: &str) -> anyhow::Result<Option<Credentials>>;
    async fn find_password_hash(&self, id: i32) -> anyhow::Result<Option<String>>;
    /// Returns the generated id, `None` if the insert produced no row.
    async fn insert(&self, user: &NewUser) -> anyhow::Result<Option<i32>>;
    async fn update_profile(&self, id: i32, changes: &ProfileChanges) -> anyhow::Result<u64>;
    async fn update_password(&self, id: i32, password_hash: &str) -> anyhow::Result<u64>;
    async fn delete(&self, id: i32) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `UPDATE usuarios SET <col> = $n, ... WHERE id_usuarios = $m`; columns come
/// from `ProfileField`, values are bound.
pub(crate) fn profile_update_query(
    id: i32,
    changes: &ProfileChanges,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE usuarios SET ");
    {
        let mut set = qb.separated(", ");
        for (field, value) in changes.iter() {
            set.push(field.column())
                .push_unseparated(" = ")
                .push_bind_unseparated(value.to_owned());
        }
    }
    qb.push(" WHERE id_usuarios = ").push_bind(id);
    qb
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id_usuarios, nombre, apellido, email, contrasena,
                   fecha_registro, id_suscripciones
            FROM usuarios
            ORDER BY id_usuarios
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id_usuarios, nombre, apellido, email, contrasena,
                   fecha_registro, id_suscripciones
            FROM usuarios
            WHERE id_usuarios = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_credentials_by_email(&self, email: &str) -> anyhow::Result<Option<Credentials>> {
        let creds = sqlx::query_as::<_, Credentials>(
            r#"
            SELECT id_usuarios, contrasena
            FROM usuarios
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find credentials by email")?;
        Ok(creds)
    }

    async fn find_password_hash(&self, id: i32) -> anyhow::Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT contrasena FROM usuarios WHERE id_usuarios = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find password hash")?;
        Ok(hash)
    }

    async fn insert(&self, user: &NewUser) -> anyhow::Result<Option<i32>> {
        let mut tx = self.pool.begin().await.context("begin insert user")?;
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO usuarios
                (nombre, apellido, email, contrasena, fecha_registro, id_suscripciones)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id_usuarios
            "#,
        )
        .bind(&user.nombre)
        .bind(&user.apellido)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.fecha_registro)
        .bind(user.id_suscripciones) // Option<i32> → NULL allowed
        .fetch_optional(&mut *tx)
        .await
        .context("insert user")?;
        tx.commit().await.context("commit insert user")?;
        Ok(id)
    }

    async fn update_profile(&self, id: i32, changes: &ProfileChanges) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin update user")?;
        let mut qb = profile_update_query(id, changes);
        let affected = qb
            .build()
            .execute(&mut *tx)
            .await
            .context("update user")?
            .rows_affected();
        tx.commit().await.context("commit update user")?;
        Ok(affected)
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin update password")?;
        let affected = sqlx::query("UPDATE usuarios SET contrasena = $1 WHERE id_usuarios = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("update password")?
            .rows_affected();
        tx.commit().await.context("commit update password")?;
        Ok(affected)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin delete user")?;
        let affected = sqlx::query("DELETE FROM usuarios WHERE id_usuarios = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user")?
            .rows_affected();
        tx.commit().await.context("commit delete user")?;
        Ok(affected)
    }
}
