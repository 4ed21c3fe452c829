use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{debug, info};
use uuid::Uuid;

use brainly_db::{Store, StoreError};
use brainly_types::api::{Claims, MessageResponse, SigninRequest, SigninResponse, SignupRequest};
use brainly_types::validate::validate_signup;

use crate::share::random_hash;
use crate::{ApiError, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn Store>,
    pub auth: AuthConfig,
    /// Produces share hashes of the requested length.
    pub hash_source: fn(usize) -> String,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn Store>, auth: AuthConfig) -> AppState {
        Self::with_hash_source(store, auth, random_hash)
    }

    pub fn with_hash_source(
        store: Arc<dyn Store>,
        auth: AuthConfig,
        hash_source: fn(usize) -> String,
    ) -> AppState {
        Arc::new(Self {
            store,
            auth,
            hash_source,
        })
    }
}

/// Token signing settings, built once from the process configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// `None` issues tokens without an `exp` claim.
    pub token_ttl: Option<Duration>,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        debug!("Rejected signup body: {}", e.body_text());
        ApiError::InvalidInput
    })?;

    // Field-level detail stays in the log
    if let Err(errors) = validate_signup(&req) {
        let detail: Vec<String> = errors.iter().map(ToString::to_string).collect();
        debug!("Signup validation failed: {}", detail.join("; "));
        return Err(ApiError::InvalidInput);
    }

    let username = req.username.clone();
    blocking(&state, move |store| {
        if store.find_user_by_username(&req.username)?.is_some() {
            return Err(ApiError::UserExists);
        }

        let password_hash = hash_password(&req.password)?;

        // A concurrent signup can still win the race; the unique index decides
        store
            .insert_user(&req.username, &password_hash)
            .map_err(|e| match e {
                StoreError::Conflict(_) => ApiError::UserExists,
                other => other.into(),
            })?;
        Ok(())
    })
    .await?;

    info!("User {} signed up", username);
    Ok(Json(MessageResponse::new("signed up successfully")))
}

pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<SigninResponse>, ApiError> {
    let Json(req) = payload.map_err(ApiError::malformed)?;

    let user_id = blocking(&state, move |store| {
        let user = store
            .find_user_by_username(&req.username)?
            .ok_or(ApiError::BadCredentials)?;
        verify_password(&req.password, &user.password)?;
        Ok(user.id)
    })
    .await?;

    let token = create_token(&state.auth, user_id)?;

    debug!("User {} signed in", user_id);
    Ok(Json(SigninResponse {
        token,
        message: "signed in successfully".into(),
    }))
}

/// Argon2id with a fresh random salt, as a PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal("HashError", e))
}

fn verify_password(password: &str, stored: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(stored).map_err(|e| ApiError::internal("HashError", e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::BadCredentials)
}

pub fn create_token(auth: &AuthConfig, user_id: Uuid) -> Result<String, ApiError> {
    let claims = Claims {
        id: user_id,
        exp: auth
            .token_ttl
            .map(|ttl| (Utc::now() + ttl).timestamp().max(0) as u64),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal("TokenError", e))
}
