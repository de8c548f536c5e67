pub mod account;
pub mod health;
pub mod password_reset;
pub mod profile;

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use portico_auth_types::identity::Identity;

use crate::domain::types::UserHandle;
use crate::error::GatewayError;
use crate::state::AppState;

/// `axum::Json` whose rejections render as `BAD_REQUEST` error bodies.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `axum::extract::Multipart` whose rejections render as `BAD_REQUEST` error bodies.
pub struct MultipartBody(pub Multipart);

impl<S> FromRequest<S> for MultipartBody
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Multipart::from_request(req, state).await?))
    }
}

/// Client address used for per-IP rate limiting.
///
/// The socket peer unless `trusted_proxy_hops` is set, in which case that many
/// `x-forwarded-for` entries are walked from the right.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

const FORWARDED_FOR: &str = "x-forwarded-for";

fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted_hops: usize) -> Option<IpAddr> {
    let mut client = peer?;
    if trusted_hops == 0 {
        return Some(client);
    }
    let forwarded: Vec<&str> = headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .collect();
    // Each trusted hop vouches for the entry it appended; stop at anything unparseable.
    for hop in forwarded.iter().rev().take(trusted_hops) {
        match hop.trim().parse() {
            Ok(ip) => client = ip,
            Err(_) => break,
        }
    }
    Some(client)
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr.ip());
        let ip = client_ip(&parts.headers, peer, state.trusted_proxy_hops);
        Ok(Self(ip.map(|ip| ip.to_string())))
    }
}

/// Bearer-authenticated caller; rejects with an `UNAUTHORIZED` error body.
#[derive(Debug, Clone)]
pub struct Caller(pub UserHandle);

impl FromRequestParts<AppState> for Caller {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state)
            .await
            .map_err(|_| GatewayError::Unauthorized)?;
        Ok(Self(UserHandle(identity.user_id)))
    }
}

/// Acknowledgement body for operations without a payload.
#[derive(serde::Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
