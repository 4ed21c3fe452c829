use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use brainly_types::api::Claims;

use crate::{ApiError, AppState};

/// Id of the caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Validate the token in the `authorization` header.
///
/// The header holds the raw token; a `Bearer ` prefix is accepted too.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::TokenMissing)?;

    // Any present header is a token attempt, even one that is not text
    let token = value.to_str().map_err(|_| {
        debug!("Authorization header is not valid UTF-8");
        ApiError::SessionExpired
    })?;
    let token = token.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let claims = decode_token(&state.auth.jwt_secret, token).map_err(|e| {
        debug!("Token verification failed: {}", e);
        ApiError::SessionExpired
    })?;

    req.extensions_mut().insert(AuthUser(claims.id));
    Ok(next.run(req).await)
}

/// HS256 signature check; `exp` is enforced when present but not required.
pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::default();
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}
