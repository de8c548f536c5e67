use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Gateway error variants. Each maps to one HTTP status and a stable `kind` string.
///
/// Variants wrapping an `anyhow::Error` carry the dependency failure for logging only;
/// the client sees the opaque `#[error]` text.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid email address")]
    BadAddress,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid code")]
    InvalidCode,
    #[error("missing or invalid access token")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no active reset code")]
    NoActiveChallenge,
    #[error("user not found")]
    UnknownUser,
    #[error("account already exists")]
    Conflict,
    #[error("too many requests")]
    TooManyRequests,
    #[error("failed to deliver verification code")]
    DeliveryFailed(#[source] anyhow::Error),
    #[error("storage unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error("user service unavailable")]
    UpstreamUnavailable(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadAddress => "BAD_ADDRESS",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Rejected(_) => "REJECTED",
            Self::InvalidCode => "INVALID_CODE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::NoActiveChallenge => "NO_ACTIVE_CHALLENGE",
            Self::UnknownUser => "UNKNOWN_USER",
            Self::Conflict => "CONFLICT",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::DeliveryFailed(_) => "DELIVERY_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadAddress | Self::BadRequest(_) | Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCode | Self::Unauthorized | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::NoActiveChallenge | Self::UnknownUser => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::DeliveryFailed(_) | Self::StoreUnavailable(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn source_chain(&self) -> Option<&anyhow::Error> {
        match self {
            Self::DeliveryFailed(e)
            | Self::StoreUnavailable(e)
            | Self::UpstreamUnavailable(e)
            | Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Only dependency failures are logged here; the trace layer already records the
        // status of every request. The event lands in the request span, so it carries
        // the request id.
        if let Some(e) = self.source_chain() {
            let chain = format!("{e:#}");
            tracing::error!(error = %chain, kind = self.kind(), "request failed");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for GatewayError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for GatewayError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Failures of the verification-mail sender.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Template missing, unreadable, or without exactly one `{code}` placeholder.
    #[error("template error: {0}")]
    Template(String),
    /// Connect, handshake, command or data-write failure, including timeouts.
    #[error("transport error: {0}")]
    Transport(String),
}
