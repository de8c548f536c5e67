//! Bearer-token identity extractor.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::{HeaderMap, StatusCode};

use crate::token::validate_access_token;

/// HMAC secret used to verify access tokens. Handlers reach it through `FromRef`
/// on the service state.
#[derive(Clone)]
pub struct JwtSecret(Arc<str>);

impl JwtSecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

/// Authenticated caller, taken from the `Authorization` header.
///
/// Accepts both `Bearer <jwt>` and a bare `<jwt>`. Returns 401 when the header is
/// absent or the token fails validation.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => raw,
    };
    (!token.is_empty()).then(|| token.to_owned())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    JwtSecret: FromRef<S>,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send`; extract synchronously and
    // hand back a 'static future so no borrow of `parts` crosses the await.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = JwtSecret::from_ref(state);
        let token = bearer_token(&parts.headers);

        async move {
            let token = token.ok_or(StatusCode::UNAUTHORIZED)?;
            let info = validate_access_token(&token, secret.expose()).map_err(|e| {
                tracing::debug!(error = %e, "rejected access token");
                StatusCode::UNAUTHORIZED
            })?;
            Ok(Self {
                user_id: info.user_id,
            })
        }
    }
}
