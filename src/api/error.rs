use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - API token missing or expired")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - retry later")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

/// Response bodies in error messages are capped so a misbehaving server
/// cannot flood the logs.
const MAX_ERROR_BODY: usize = 400;

impl ApiError {
    fn clip(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY {
            return body.to_string();
        }
        // Back the cut up to a char boundary; servers return arbitrary
        // bodies (HTML error pages, typographic quotes) and a mid-character
        // slice would panic.
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... ({} bytes total)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = Self::clip(body);
        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server {
                status: status.as_u16(),
                body,
            },
            _ => ApiError::Unexpected(format!("status {}: {}", status, body)),
        }
    }
}
