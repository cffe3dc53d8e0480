use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Token endpoint rejected the credentials or could not be reached.
    #[error("authentication failed{}: {body}", status_suffix(.status))]
    Authentication {
        status: Option<StatusCode>,
        body: String,
    },

    #[error("API error (status {status}): {body}")]
    Api { status: StatusCode, body: String },

    /// No response was received at all.
    #[error("transport error")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response body for page {page}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {page} still rate limited after {attempts} attempts")]
    RateLimitExhausted { page: u32, attempts: u32 },

    #[error("failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    match status {
        Some(status) => format!(" (status {})", status.as_u16()),
        None => String::new(),
    }
}
