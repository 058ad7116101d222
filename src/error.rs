use hyper::StatusCode;
use thiserror::Error;

/// Errors produced while setting up an application or while handling a request.
///
/// Request-time variants never terminate the process: whatever escapes the
/// middleware chain is turned into a response by [`Error::status_code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid route `{path}`: {message}")]
    Route { path: String, message: String },

    #[error("malformed JSON body: {0}")]
    BindJson(#[source] serde_json::Error),

    #[error("malformed form body: {0}")]
    BindForm(#[source] serde_urlencoded::de::Error),

    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),

    #[error("failed to encode JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render view `{view}`: {message}")]
    View { view: String, message: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// An error that answers the request with an explicit status.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BindJson(_) | Error::BindForm(_) => StatusCode::BAD_REQUEST,
            Error::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors carry their own message; server errors are masked.
    pub fn public_message(&self) -> String {
        let status = self.status_code();
        if status.is_client_error() {
            self.to_string()
        } else if let Error::Status { message, .. } = self {
            message.clone()
        } else {
            format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_input_is_a_client_error() {
        let err = Error::BindJson(serde_json::from_str::<u8>("nope").unwrap_err());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().starts_with("malformed JSON body"));
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = Error::View {
            view: "index".into(),
            message: "secret path /etc".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "500 Internal Server Error");
    }

    #[test]
    fn explicit_status_keeps_its_message() {
        let err = Error::status(StatusCode::SERVICE_UNAVAILABLE, "maintenance");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), "maintenance");
    }
}
