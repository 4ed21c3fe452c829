use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ContentType;

// -- JWT Claims --

/// Token payload. `exp` is omitted when the server issues non-expiring
/// tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninResponse {
    pub token: String,
    pub message: String,
}

/// Body of every plain acknowledgement and every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    /// Kind name of a server-side failure, never its details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

// -- Content --

/// Fields are optional on the wire; missing ones are rejected by the store,
/// not by deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateContentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteContentRequest {
    #[serde(default, rename = "contentId")]
    pub content_id: Option<String>,
}

/// The owner reference of a content item, expanded to the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub link: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default)]
    pub tag: Vec<Uuid>,
    #[serde(rename = "userId")]
    pub owner: OwnerRef,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentListResponse {
    pub content: Vec<ContentItem>,
}

// -- Sharing --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareRequest {
    #[serde(default)]
    pub share: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedBrainResponse {
    pub username: String,
    pub content: Vec<ContentItem>,
}
