/// Errors raised while querying the render API.
///
/// All of them mean "no event this tick"; the next task retries naturally.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The task's deadline passed before or during the request.
    #[error("render: deadline elapsed")]
    DeadlineElapsed,

    /// Transport-level failure (connect, TLS, body read).
    #[error("render: request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("render: unexpected status {0}")]
    Status(u16),

    /// The response body was not valid render JSON.
    #[error("render: decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
