//! Crate-level error types.
//!
//! [`StoreError`] unifies the infrastructure error sources (configuration,
//! storage, HTTP, JSON, terminal) behind a single enum so callers can match
//! on the variant they care about while still using the `?` operator.
//! Checkout outcomes have their own domain enum in
//! [`checkout`](crate::checkout).

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An environment variable or rule value was malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing the persisted store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An HTTP request (catalog fetch, geocoding, order submission) failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TLS configuration could not be built.
    #[error("tls error: {0}")]
    Tls(String),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A remote payload did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Terminal setup or teardown failed.
    #[error("io error: {0}")]
    Io(String),
}
