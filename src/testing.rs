//! In-memory stand-ins for the Postgres stores, used by the unit tests.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use time::{macros::date, UtcOffset};

use crate::{
    history::{
        repo::HistoryStore,
        repo_types::{DateQuery, HistoryRow, NewHistoryEntry, SortOrder},
    },
    users::{
        repo::UserStore,
        repo_types::{Credentials, NewUser, ProfileChanges, ProfileField, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    next_user_id: i32,
    routes: Vec<(i32, String)>,
    history: Vec<NewHistoryEntry>,
    writes: usize,
    drop_next_insert_id: bool,
    lose_next_password_update: bool,
}

/// Both stores over one set of tables, with the same referential rules as the schema.
#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Routes get ids 1, 2, ... in order.
    pub fn with_routes(names: &[&str]) -> Arc<Self> {
        let db = Self::default();
        {
            let mut t = db.tables.lock().unwrap();
            t.routes = names
                .iter()
                .enumerate()
                .map(|(i, n)| (i as i32 + 1, n.to_string()))
                .collect();
        }
        Arc::new(db)
    }

    /// Inserts a user directly, bypassing the service.
    pub fn add_user(&self, email: &str) -> i32 {
        let mut t = self.tables.lock().unwrap();
        t.next_user_id += 1;
        let id = t.next_user_id;
        t.users.push(User {
            id_usuarios: id,
            nombre: "Test".into(),
            apellido: "User".into(),
            email: email.into(),
            contrasena: String::new(),
            fecha_registro: date!(2024 - 01 - 01),
            id_suscripciones: None,
        });
        id
    }

    /// Rows changed so far.
    pub fn writes(&self) -> usize {
        self.tables.lock().unwrap().writes
    }

    pub fn user(&self, id: i32) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.iter().find(|u| u.id_usuarios == id).cloned()
    }

    pub fn user_ids(&self) -> Vec<i32> {
        let t = self.tables.lock().unwrap();
        t.users.iter().map(|u| u.id_usuarios).collect()
    }

    /// Makes the next insert behave like an INSERT ... RETURNING that yields no row.
    pub fn drop_next_insert_id(&self) {
        self.tables.lock().unwrap().drop_next_insert_id = true;
    }

    /// Makes the next password UPDATE match no row, as if the user vanished
    /// after its hash was read.
    pub fn lose_next_password_update(&self) {
        self.tables.lock().unwrap().lose_next_password_update = true;
    }
}

impl Tables {
    fn joined(&self, entry: &NewHistoryEntry) -> Option<HistoryRow> {
        self.routes
            .iter()
            .find(|(id, _)| *id == entry.id_ruta)
            .map(|(id, name)| HistoryRow {
                id_ruta: *id,
                nombre_ruta: name.clone(),
                fecha: entry.fecha,
            })
    }

    fn rows_for<F>(&self, id_usuarios: i32, mut keep: F) -> Vec<HistoryRow>
    where
        F: FnMut(&HistoryRow) -> bool,
    {
        self.history
            .iter()
            .filter(|e| e.id_usuarios == id_usuarios)
            .filter_map(|e| self.joined(e))
            .filter(|r| keep(r))
            .collect()
    }
}

fn newest_first(rows: &mut [HistoryRow]) {
    rows.sort_by(|a, b| b.fecha.cmp(&a.fecha));
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.lock().unwrap().users.clone())
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_credentials_by_email(&self, email: &str) -> anyhow::Result<Option<Credentials>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).map(|u| Credentials {
            id_usuarios: u.id_usuarios,
            contrasena: u.contrasena.clone(),
        }))
    }

    async fn find_password_hash(&self, id: i32) -> anyhow::Result<Option<String>> {
        Ok(self.user(id).map(|u| u.contrasena))
    }

    async fn insert(&self, user: &NewUser) -> anyhow::Result<Option<i32>> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(anyhow!(
                "duplicate key value violates unique constraint \"usuarios_email_key\""
            ));
        }
        if std::mem::take(&mut t.drop_next_insert_id) {
            return Ok(None);
        }
        t.next_user_id += 1;
        let id = t.next_user_id;
        t.users.push(User {
            id_usuarios: id,
            nombre: user.nombre.clone(),
            apellido: user.apellido.clone(),
            email: user.email.clone(),
            contrasena: user.password_hash.clone(),
            fecha_registro: user.fecha_registro,
            id_suscripciones: user.id_suscripciones,
        });
        t.writes += 1;
        Ok(Some(id))
    }

    async fn update_profile(&self, id: i32, changes: &ProfileChanges) -> anyhow::Result<u64> {
        let mut t = self.tables.lock().unwrap();
        let Some(user) = t.users.iter_mut().find(|u| u.id_usuarios == id) else {
            return Ok(0);
        };
        for (field, value) in changes.iter() {
            let slot = match field {
                ProfileField::Nombre => &mut user.nombre,
                ProfileField::Apellido => &mut user.apellido,
                ProfileField::Email => &mut user.email,
            };
            *slot = value.to_owned();
        }
        t.writes += 1;
        Ok(1)
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> anyhow::Result<u64> {
        let mut t = self.tables.lock().unwrap();
        if std::mem::take(&mut t.lose_next_password_update) {
            return Ok(0);
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id_usuarios == id) else {
            return Ok(0);
        };
        user.contrasena = password_hash.to_owned();
        t.writes += 1;
        Ok(1)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<u64> {
        let mut t = self.tables.lock().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.id_usuarios != id);
        let affected = (before - t.users.len()) as u64;
        if affected > 0 {
            t.history.retain(|e| e.id_usuarios != id);
            t.writes += 1;
        }
        Ok(affected)
    }
}

#[async_trait]
impl HistoryStore for MemoryDb {
    async fn list_for_user(&self, id_usuarios: i32) -> anyhow::Result<Vec<HistoryRow>> {
        let t = self.tables.lock().unwrap();
        let mut rows = t.rows_for(id_usuarios, |_| true);
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn list_by_route(
        &self,
        id_usuarios: i32,
        nombre_ruta: &str,
    ) -> anyhow::Result<Vec<HistoryRow>> {
        let t = self.tables.lock().unwrap();
        let mut rows = t.rows_for(id_usuarios, |r| r.nombre_ruta == nombre_ruta);
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn list_by_date(&self, q: &DateQuery) -> anyhow::Result<Vec<HistoryRow>> {
        let t = self.tables.lock().unwrap();
        let mut rows = t.rows_for(q.id_usuarios, |r| {
            let day = r.fecha.to_offset(UtcOffset::UTC).date();
            q.start <= day && day <= q.end
        });
        match q.order {
            SortOrder::Desc => newest_first(&mut rows),
            SortOrder::Asc => rows.sort_by(|a, b| a.fecha.cmp(&b.fecha)),
        }
        Ok(rows
            .into_iter()
            .skip(q.offset as usize)
            .take(q.limit as usize)
            .collect())
    }

    async fn insert(&self, entry: &NewHistoryEntry) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if !t.users.iter().any(|u| u.id_usuarios == entry.id_usuarios) {
            return Err(anyhow!("violates foreign key constraint on id_usuarios"));
        }
        if !t.routes.iter().any(|(id, _)| *id == entry.id_ruta) {
            return Err(anyhow!("violates foreign key constraint on id_ruta"));
        }
        t.history.push(entry.clone());
        t.writes += 1;
        Ok(())
    }
}

/// Every call fails as if the database were unreachable.
pub struct FailingStore;

fn unreachable_db<T>() -> anyhow::Result<T> {
    Err(anyhow!("connection refused"))
}

#[async_trait]
impl UserStore for FailingStore {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        unreachable_db()
    }
    async fn find_by_id(&self, _id: i32) -> anyhow::Result<Option<User>> {
        unreachable_db()
    }
    async fn find_credentials_by_email(&self, _email: &str) -> anyhow::Result<Option<Credentials>> {
        unreachable_db()
    }
    async fn find_password_hash(&self, _id: i32) -> anyhow::Result<Option<String>> {
        unreachable_db()
    }
    async fn insert(&self, _user: &NewUser) -> anyhow::Result<Option<i32>> {
        unreachable_db()
    }
    async fn update_profile(&self, _id: i32, _changes: &ProfileChanges) -> anyhow::Result<u64> {
        unreachable_db()
    }
    async fn update_password(&self, _id: i32, _hash: &str) -> anyhow::Result<u64> {
        unreachable_db()
    }
    async fn delete(&self, _id: i32) -> anyhow::Result<u64> {
        unreachable_db()
    }
}

#[async_trait]
impl HistoryStore for FailingStore {
    async fn list_for_user(&self, _id_usuarios: i32) -> anyhow::Result<Vec<HistoryRow>> {
        unreachable_db()
    }
    async fn list_by_route(
        &self,
        _id_usuarios: i32,
        _nombre_ruta: &str,
    ) -> anyhow::Result<Vec<HistoryRow>> {
        unreachable_db()
    }
    async fn list_by_date(&self, _q: &DateQuery) -> anyhow::Result<Vec<HistoryRow>> {
        unreachable_db()
    }
    async fn insert(&self, _entry: &NewHistoryEntry) -> anyhow::Result<()> {
        unreachable_db()
    }
}
