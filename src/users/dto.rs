use serde::{Deserialize, Serialize};
use time::Date;

use crate::users::repo_types::{ProfileChanges, ProfileField};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    #[serde(default)]
    pub contrasena: Option<String>,
    #[serde(default)]
    pub fecha_registro: Option<Date>, // defaults to today
    #[serde(default)]
    pub id_suscripciones: Option<i32>,
}

/// Partial profile update. Unknown keys (`contrasena`, `id_usuarios`, ...) are dropped by serde.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> ProfileChanges {
        let mut changes = ProfileChanges::default();
        if let Some(v) = self.nombre {
            changes.set(ProfileField::Nombre, v);
        }
        if let Some(v) = self.apellido {
            changes.set(ProfileField::Apellido, v);
        }
        if let Some(v) = self.email {
            changes.set(ProfileField::Email, v);
        }
        changes
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub contrasena_actual: String,
    pub nueva_contrasena: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub contrasena: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub message: String,
    pub id_usuarios: i32,
}
