use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::debug;
use uuid::Uuid;

use brainly_db::models::{NewContent, OwnedContent};
use brainly_types::api::{
    ContentItem, ContentListResponse, CreateContentRequest, DeleteContentRequest,
    MessageResponse, OwnerRef,
};

use crate::middleware::AuthUser;
use crate::{ApiError, AppState, blocking};

pub async fn add_content(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<CreateContentRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    // An unreadable body carries no fields, so it fails the same checks
    let req = payload.map(|Json(req)| req).unwrap_or_else(|e| {
        debug!("Unreadable content body: {}", e.body_text());
        CreateContentRequest::default()
    });

    // Type and required fields are enforced by the store schema
    let record = blocking(&state, move |store| {
        let content = NewContent::parse(user_id, req.title, req.link, req.kind)?;
        Ok(store.insert_content(content)?)
    })
    .await?;

    debug!("User {} added {} content {}", user_id, record.kind, record.id);
    Ok(Json(MessageResponse::new("Content Added")))
}

pub async fn list_content(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<ContentListResponse>, ApiError> {
    let rows = blocking(&state, move |store| Ok(store.find_contents_by_owner(user_id)?)).await?;

    Ok(Json(ContentListResponse {
        content: rows.into_iter().map(content_item).collect(),
    }))
}

/// Deletes only the caller's own content. Someone else's id gets the same
/// "not found" as a nonexistent one.
pub async fn delete_content(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    payload: Result<Json<DeleteContentRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let raw_id = payload
        .ok()
        .and_then(|Json(req)| req.content_id)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::ContentIdMissing)?;

    let Ok(content_id) = Uuid::parse_str(&raw_id) else {
        return Err(ApiError::ContentNotFound);
    };

    let removed = blocking(&state, move |store| {
        store
            .delete_content(content_id, user_id)
            .map_err(ApiError::DeleteFailed)
    })
    .await?;

    if !removed {
        return Err(ApiError::ContentNotFound);
    }

    debug!("User {} deleted content {}", user_id, content_id);
    Ok(Json(MessageResponse::new("Content deleted successfully")))
}

pub(crate) fn content_item(row: OwnedContent) -> ContentItem {
    let c = row.content;
    ContentItem {
        id: c.id,
        title: c.title,
        link: c.link,
        kind: c.kind,
        tag: c.tags,
        owner: OwnerRef {
            id: c.owner_id,
            username: row.owner_username,
        },
        created_at: c.created_at,
    }
}
