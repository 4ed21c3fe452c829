pub mod auth;
pub mod content;
pub mod error;
pub mod middleware;
pub mod share;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tracing::error;

use brainly_db::Store;

pub use auth::{AppState, AppStateInner, AuthConfig};
pub use error::ApiError;

/// The full `/api/v1` surface. Cross-cutting layers (CORS, tracing) are
/// added by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/signup", post(auth::signup))
        .route("/api/v1/signin", post(auth::signin))
        .route("/api/v1/brain/{share_link}", get(share::shared_brain));

    let protected_routes = Router::new()
        .route(
            "/api/v1/content",
            post(content::add_content).get(content::list_content),
        )
        .route("/api/v1/delete", delete(content::delete_content))
        .route("/api/v1/brain/share", post(share::share_brain))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Runs blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn Store) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("TaskError", e)
        })?
}
