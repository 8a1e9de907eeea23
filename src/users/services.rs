use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, CreateUserRequest, CreatedUserResponse, LoginRequest,
            MessageResponse, TokenResponse, UpdateUserRequest,
        },
        repo::UserStore,
        repo_types::{NewUser, ProfileField, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

lazy_static! {
    /// Verified against on unknown e-mails so both login failures cost one argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("dummy-password-for-timing").ok();
}

/// Same error for unknown e-mail and wrong password.
fn invalid_credentials() -> AppError {
    AppError::auth("Invalid credentials")
}

fn store_failure(op: &'static str) -> impl FnOnce(anyhow::Error) -> AppError {
    move |e| {
        error!(error = %e, op, "user store failure");
        AppError::service(format!("{op}: {e:#}"))
    }
}

/// Account lifecycle and authentication.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), JwtKeys::from_ref(state))
    }
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub async fn read_all(&self) -> AppResult<Vec<User>> {
        self.store.list().await.map_err(store_failure("list users"))
    }

    pub async fn read_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.store
            .find_by_id(id)
            .await
            .map_err(store_failure("find user"))
    }

    pub async fn create(&self, req: CreateUserRequest) -> AppResult<CreatedUserResponse> {
        let password = match req.contrasena.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => {
                warn!("create user without password");
                return Err(AppError::validation("Password is required"));
            }
        };

        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("Invalid email"));
        }

        let taken = self
            .store
            .find_credentials_by_email(&email)
            .await
            .map_err(store_failure("find user by email"))?;
        if taken.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::validation("Email already registered"));
        }

        let password_hash = hash_password(password).map_err(|e| AppError::service(e.to_string()))?;

        let new_user = NewUser {
            nombre: req.nombre,
            apellido: req.apellido,
            email,
            password_hash,
            fecha_registro: req
                .fecha_registro
                .unwrap_or_else(|| OffsetDateTime::now_utc().date()),
            id_suscripciones: req.id_suscripciones,
        };

        let id = self
            .store
            .insert(&new_user)
            .await
            .map_err(store_failure("insert user"))?
            .ok_or_else(|| {
                error!(email = %new_user.email, "insert returned no id");
                AppError::service("No id returned after insert")
            })?;

        info!(user_id = id, email = %new_user.email, "user created");
        Ok(CreatedUserResponse {
            message: "User created".into(),
            id_usuarios: id,
        })
    }

    pub async fn update(&self, id: i32, req: UpdateUserRequest) -> AppResult<MessageResponse> {
        let mut changes = req.into_changes();
        if changes.is_empty() {
            return Err(AppError::validation("No valid fields provided for update"));
        }

        if let Some(email) = changes.get(ProfileField::Email).map(normalize_email) {
            if !is_valid_email(&email) {
                warn!(email = %email, "invalid email");
                return Err(AppError::validation("Invalid email"));
            }
            changes.set(ProfileField::Email, email);
        }

        let affected = self
            .store
            .update_profile(id, &changes)
            .await
            .map_err(store_failure("update user"))?;
        if affected == 0 {
            return Err(AppError::not_found("User not found"));
        }

        info!(user_id = id, "user updated");
        Ok(MessageResponse::new("User updated"))
    }

    pub async fn update_password(
        &self,
        id: i32,
        req: ChangePasswordRequest,
    ) -> AppResult<MessageResponse> {
        if req.nueva_contrasena.is_empty() {
            return Err(AppError::validation("New password is required"));
        }

        let current_hash = self
            .store
            .find_password_hash(id)
            .await
            .map_err(store_failure("find password hash"))?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let ok = verify_password(&req.contrasena_actual, &current_hash)
            .map_err(|e| AppError::service(e.to_string()))?;
        if !ok {
            warn!(user_id = id, "current password mismatch");
            return Err(AppError::auth("Current password is incorrect"));
        }

        let new_hash =
            hash_password(&req.nueva_contrasena).map_err(|e| AppError::service(e.to_string()))?;
        let affected = self
            .store
            .update_password(id, &new_hash)
            .await
            .map_err(store_failure("update password"))?;
        // The row can vanish between the read and the write.
        if affected == 0 {
            return Err(AppError::not_found("User not found"));
        }

        info!(user_id = id, "password changed");
        Ok(MessageResponse::new("Password updated"))
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<TokenResponse> {
        let email = normalize_email(&req.email);

        let creds = match self
            .store
            .find_credentials_by_email(&email)
            .await
            .map_err(store_failure("find credentials"))?
        {
            Some(c) => c,
            None => {
                if let Some(hash) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(&req.contrasena, hash);
                }
                warn!(email = %email, "login unknown email");
                return Err(invalid_credentials());
            }
        };

        let ok = verify_password(&req.contrasena, &creds.contrasena)
            .map_err(|e| AppError::service(e.to_string()))?;
        if !ok {
            warn!(user_id = creds.id_usuarios, "login invalid password");
            return Err(invalid_credentials());
        }

        let token = self
            .keys
            .sign_access(creds.id_usuarios)
            .map_err(|e| AppError::service(e.to_string()))?;

        info!(user_id = creds.id_usuarios, "user logged in");
        Ok(TokenResponse::bearer(token))
    }

    pub async fn delete(&self, id: i32) -> AppResult<MessageResponse> {
        let affected = self
            .store
            .delete(id)
            .await
            .map_err(store_failure("delete user"))?;
        if affected == 0 {
            return Err(AppError::not_found("User not found"));
        }
        info!(user_id = id, "user deleted");
        Ok(MessageResponse::new("User deleted"))
    }
}
