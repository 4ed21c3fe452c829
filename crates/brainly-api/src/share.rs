use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rand::{Rng, distr::Alphanumeric};
use tracing::{debug, info, warn};

use brainly_db::StoreError;
use brainly_types::api::{MessageResponse, ShareRequest, ShareResponse, SharedBrainResponse};

use crate::content::content_item;
use crate::middleware::AuthUser;
use crate::{ApiError, AppState, blocking};

pub const SHARE_HASH_LEN: usize = 10;

/// Fresh draws allowed when a generated hash is already taken.
const HASH_ATTEMPTS: usize = 3;

/// Uniform over `[A-Za-z0-9]`.
pub fn random_hash(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// `{share: true}` returns the caller's hash, creating it on first use.
/// Anything else removes the caller's link, including a missing or
/// unreadable body.
pub async fn share_brain(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = payload.map(|Json(req)| req).unwrap_or_else(|e| {
        debug!("Unreadable share body treated as share=false: {}", e.body_text());
        ShareRequest::default()
    });

    if !req.share {
        let removed =
            blocking(&state, move |store| Ok(store.delete_link_by_owner(user_id)?)).await?;
        if removed {
            info!("Sharing disabled for user {}", user_id);
        }
        return Ok(Json(MessageResponse::new("Link Removed")).into_response());
    }

    let draw = state.hash_source;
    let link = blocking(&state, move |store| {
        if let Some(existing) = store.find_link_by_owner(user_id)? {
            return Ok(existing);
        }

        let mut attempt = 1;
        loop {
            match store.insert_link_if_absent(user_id, &draw(SHARE_HASH_LEN)) {
                Err(StoreError::Conflict(detail)) if attempt < HASH_ATTEMPTS => {
                    warn!("Share hash collision ({}), drawing again", detail);
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    })
    .await?;

    info!("Sharing enabled for user {}", user_id);
    Ok(Json(ShareResponse { hash: link.hash }).into_response())
}

/// Public, read-only view of one user's collection.
pub async fn shared_brain(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<SharedBrainResponse>, ApiError> {
    let (username, rows) = blocking(&state, move |store| {
        let link = store
            .find_link_by_hash(&hash)?
            .ok_or(ApiError::InvalidShareLink)?;
        let owner = store
            .find_user_by_id(link.owner_id)?
            .ok_or(ApiError::InvalidShareLink)?;
        let rows = store.find_contents_by_owner(owner.id)?;
        Ok((owner.username, rows))
    })
    .await?;

    Ok(Json(SharedBrainResponse {
        username,
        content: rows.into_iter().map(content_item).collect(),
    }))
}
