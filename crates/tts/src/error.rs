use axum::response::IntoResponse;
use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Errors that can occur during speech synthesis
#[derive(Debug, Error)]
pub enum TtsError {
    /// Client sent a malformed or invalid request; never retried
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credential bootstrap call or token parsing failed
    #[error("credential error: {0}")]
    Credential(String),

    /// Vendor rejected the credential even after a forced refresh
    #[error("authentication rejected by vendor: {0}")]
    AuthRejected(String),

    /// Vendor voices or synthesis endpoint returned a non-auth failure
    #[error("vendor API error ({status}): {message}")]
    ProviderApi { status: u16, message: String },

    /// Transport-level failure reaching the vendor
    #[error("connection error: {0}")]
    Connection(String),

    /// External audio concatenation process failed
    #[error("audio merge failed: {0}")]
    Merge(String),

    /// Caller cancelled the request or its deadline expired
    #[error("request cancelled")]
    Cancelled,

    /// Server-side misconfiguration detected at build time
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal error
    #[error("internal error")]
    Internal(Option<String>),
}

impl TtsError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Credential(_) | Self::AuthRejected(_) | Self::ProviderApi { .. } | Self::Connection(_) => {
                StatusCode::BAD_GATEWAY
            }
            // Nginx's non-standard "client closed request", distinct from
            // generic failure so dashboards can tell the two apart
            Self::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Merge(_) | Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error type
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Credential(_) => "credential_error",
            Self::AuthRejected(_) => "authentication_rejected",
            Self::ProviderApi { .. } => "upstream_error",
            Self::Connection(_) => "connection_error",
            Self::Merge(_) => "merge_error",
            Self::Cancelled => "cancelled",
            Self::Config(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to expose to API consumers
    pub fn client_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for TtsError {
    fn into_response(self) -> axum::response::Response {
        // Client-facing messages mask internals, so keep the full error
        // in the log
        if self.status_code().is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.client_message(),
            }
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}
