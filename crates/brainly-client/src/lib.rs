//! Client side of Brainly: a typed HTTP client for the `/api/v1` surface,
//! the persisted session token, and the list helpers the views use.

pub mod api;
pub mod error;
pub mod session;
pub mod view;

pub use api::ApiClient;
pub use error::ClientError;
pub use session::TokenStore;
