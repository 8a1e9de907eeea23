use serde::Serialize;
use sqlx::FromRow;
use time::Date;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id_usuarios: i32,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub contrasena: String, // argon2 PHC string, never exposed in JSON
    pub fecha_registro: Date,
    pub id_suscripciones: Option<i32>,
}

/// What login needs: the id to put in the token and the hash to check against.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id_usuarios: i32,
    pub contrasena: String,
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub password_hash: String,
    pub fecha_registro: Date,
    pub id_suscripciones: Option<i32>,
}

/// Columns a profile update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Nombre,
    Apellido,
    Email,
}

impl ProfileField {
    pub const fn column(self) -> &'static str {
        match self {
            ProfileField::Nombre => "nombre",
            ProfileField::Apellido => "apellido",
            ProfileField::Email => "email",
        }
    }
}

/// Ordered set of column assignments for `UPDATE usuarios SET ...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges(Vec<(ProfileField, String)>);

impl ProfileChanges {
    /// Later values for the same field replace earlier ones.
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }
}
