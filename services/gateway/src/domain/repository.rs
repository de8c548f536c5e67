#![allow(async_fn_in_trait)]

use std::time::Duration;

use bytes::Bytes;

use crate::domain::challenge::Challenge;
use crate::domain::types::{ProfileUpdate, Registration, UserHandle, UserProfile};
use crate::error::{GatewayError, MailError};

/// Port for the identity lookups and password overwrite used by the reset flow.
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when no account owns the address.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserHandle>, GatewayError>;

    async fn update_password(&self, id: &UserHandle, password: &str)
    -> Result<(), GatewayError>;
}

/// Port for the account operations the gateway forwards verbatim.
pub trait AccountDirectory: Send + Sync {
    /// Returns the access token issued for the new account.
    async fn register(&self, registration: &Registration) -> Result<String, GatewayError>;

    /// Returns an access token, or `InvalidCredentials`.
    async fn login(&self, email: &str, password: &str) -> Result<String, GatewayError>;

    async fn get_profile(&self, id: &UserHandle) -> Result<Option<UserProfile>, GatewayError>;

    async fn update_profile(
        &self,
        id: &UserHandle,
        update: &ProfileUpdate,
    ) -> Result<(), GatewayError>;

    async fn change_password(
        &self,
        id: &UserHandle,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), GatewayError>;
}

/// Short-lived storage of reset codes, one record per address.
///
/// Expiry is the store's job: once `ttl` has elapsed, `get` must report absence.
pub trait CodeStore: Send + Sync {
    /// Overwrite any existing record for `address` and reset its TTL, failure count and
    /// claim.
    async fn put(
        &self,
        address: &str,
        challenge: &Challenge,
        ttl: Duration,
    ) -> Result<(), GatewayError>;

    async fn get(&self, address: &str) -> Result<Option<Challenge>, GatewayError>;

    /// Remove the record, its failure counter and any claim. Deleting nothing is not an
    /// error.
    async fn delete(&self, address: &str) -> Result<(), GatewayError>;

    /// Take the exclusive right to consume the record. `false` when another redemption
    /// holds it. The claim lapses after `ttl` if never released or deleted.
    async fn claim(&self, address: &str, ttl: Duration) -> Result<bool, GatewayError>;

    /// Give up a claim without consuming the record.
    async fn release(&self, address: &str) -> Result<(), GatewayError>;

    /// Count one wrong guess against the live record; returns the running total.
    async fn record_failure(&self, address: &str, ttl: Duration) -> Result<u32, GatewayError>;
}

/// Delivery of the verification mail.
pub trait Mailer: Send + Sync {
    /// Resolves only after the relay accepted the message.
    async fn send_code(&self, to: &str, challenge: &Challenge) -> Result<(), MailError>;
}

/// Media storage for avatars.
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, GatewayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Admission hook in front of code issuance.
pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision;
    fn check_email(&self, email: &str) -> RateLimitDecision;
}
