#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `message` is the server's own text.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("not signed in; run `brainly signin` first")]
    NotSignedIn,

    #[error("no config directory available for the session token")]
    NoConfigDir,

    #[error("token store: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
