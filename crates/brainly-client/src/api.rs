use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use brainly_types::api::{
    ContentItem, ContentListResponse, CreateContentRequest, DeleteContentRequest,
    MessageResponse, ShareRequest, ShareResponse, SharedBrainResponse, SigninRequest,
    SigninResponse, SignupRequest,
};
use brainly_types::models::ContentType;

use crate::error::{ClientError, Result};

/// Thin typed wrapper over the REST contract. Holds the session token once
/// signed in and sends it raw in the `authorization` header.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/api/v1/signup"))
            .json(&SignupRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: MessageResponse = read(resp).await?;
        Ok(body.message)
    }

    /// Returns the new token and keeps it for later calls.
    pub async fn signin(&mut self, username: &str, password: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/api/v1/signin"))
            .json(&SigninRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: SigninResponse = read(resp).await?;
        self.token = Some(body.token.clone());
        Ok(body.token)
    }

    pub async fn add_content(&self, title: &str, kind: ContentType, link: &str) -> Result<()> {
        let req = CreateContentRequest {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            kind: Some(kind.as_str().to_string()),
        };
        let resp = self
            .authed(self.http.post(self.url("/api/v1/content")))?
            .json(&req)
            .send()
            .await?;
        let _: MessageResponse = read(resp).await?;
        Ok(())
    }

    pub async fn list_content(&self) -> Result<Vec<ContentItem>> {
        let resp = self
            .authed(self.http.get(self.url("/api/v1/content")))?
            .send()
            .await?;
        let body: ContentListResponse = read(resp).await?;
        debug!("Fetched {} items", body.content.len());
        Ok(body.content)
    }

    pub async fn delete_content(&self, id: Uuid) -> Result<()> {
        let resp = self
            .authed(self.http.delete(self.url("/api/v1/delete")))?
            .json(&DeleteContentRequest {
                content_id: Some(id.to_string()),
            })
            .send()
            .await?;
        let _: MessageResponse = read(resp).await?;
        Ok(())
    }

    /// Returns the caller's share hash, creating it if needed.
    pub async fn enable_share(&self) -> Result<String> {
        let body: ShareResponse = self.share(true).await?;
        Ok(body.hash)
    }

    pub async fn disable_share(&self) -> Result<()> {
        let _: MessageResponse = self.share(false).await?;
        Ok(())
    }

    /// Unauthenticated read of someone's shared collection.
    pub async fn shared_brain(&self, hash: &str) -> Result<SharedBrainResponse> {
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/brain/{}", hash)))
            .send()
            .await?;
        read(resp).await
    }

    async fn share<T: DeserializeOwned>(&self, share: bool) -> Result<T> {
        let resp = self
            .authed(self.http.post(self.url("/api/v1/brain/share")))?
            .json(&ShareRequest { share })
            .send()
            .await?;
        read(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, rb: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotSignedIn)?;
        Ok(rb.header("authorization", token))
    }
}

/// Decodes a success body, or turns the server's `message` into an error.
async fn read<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let message = match resp.json::<MessageResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
