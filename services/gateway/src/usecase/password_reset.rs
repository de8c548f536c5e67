use std::sync::Arc;
use std::time::Duration;

use crate::domain::challenge::Challenge;
use crate::domain::email::{is_valid_email, normalize_address};
use crate::domain::repository::{CodeStore, Mailer, RateLimitDecision, RateLimiter, UserDirectory};
use crate::domain::types::{REDEEM_CLAIM_TTL_SECS, UserHandle};
use crate::error::GatewayError;

const REDEEM_CLAIM_TTL: Duration = Duration::from_secs(REDEEM_CLAIM_TTL_SECS);

pub struct IssueResetInput {
    pub email: String,
    /// Caller address as seen by the edge, when known.
    pub client_ip: Option<String>,
}

pub struct RedeemResetInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Two-step password reset: mail a one-time code, then trade it for a password change.
pub struct ResetCoordinator<U, C, M>
where
    U: UserDirectory,
    C: CodeStore,
    M: Mailer,
{
    pub users: U,
    pub codes: C,
    pub mailer: M,
    pub limiter: Arc<dyn RateLimiter>,
    pub code_ttl: Duration,
    /// Wrong guesses before the code is revoked; 0 never revokes.
    pub max_failed_attempts: u32,
}

fn checked_address(raw: &str) -> Result<String, GatewayError> {
    let address = normalize_address(raw);
    if is_valid_email(&address) {
        Ok(address)
    } else {
        Err(GatewayError::BadAddress)
    }
}

impl<U, C, M> ResetCoordinator<U, C, M>
where
    U: UserDirectory,
    C: CodeStore,
    M: Mailer,
{
    /// Send a fresh code to the address. Succeeds whether or not an account owns it.
    pub async fn issue(&self, input: IssueResetInput) -> Result<(), GatewayError> {
        let address = checked_address(&input.email)?;

        if self.limiter.check_ip(input.client_ip.as_deref()) == RateLimitDecision::Limited
            || self.limiter.check_email(&address) == RateLimitDecision::Limited
        {
            tracing::info!(client_ip = ?input.client_ip, "reset code request rate limited");
            return Err(GatewayError::TooManyRequests);
        }

        let challenge = Challenge::generate();

        // A code that was never delivered must not become redeemable.
        self.mailer
            .send_code(&address, &challenge)
            .await
            .map_err(|e| GatewayError::DeliveryFailed(e.into()))?;

        self.codes.put(&address, &challenge, self.code_ttl).await?;
        tracing::debug!(ttl_secs = self.code_ttl.as_secs(), "reset code issued");
        Ok(())
    }

    /// Check the code and overwrite the password of the account owning the address.
    pub async fn redeem(&self, input: RedeemResetInput) -> Result<(), GatewayError> {
        let address = checked_address(&input.email)?;
        if input.new_password.is_empty() {
            return Err(GatewayError::BadRequest("password must not be empty".to_owned()));
        }

        let stored = self
            .codes
            .get(&address)
            .await?
            .ok_or(GatewayError::NoActiveChallenge)?;

        if !stored.matches(&input.code) {
            self.count_failure(&address).await?;
            return Err(GatewayError::InvalidCode);
        }

        // Only one redemption per code may reach the user service.
        if !self.codes.claim(&address, REDEEM_CLAIM_TTL).await? {
            return Err(GatewayError::NoActiveChallenge);
        }

        let user = match self.change_password(&address, &input.new_password).await {
            Ok(user) => user,
            Err(e) => {
                if let Err(release) = self.codes.release(&address).await {
                    tracing::warn!(error = %release, "failed to release reset code claim");
                }
                return Err(e);
            }
        };

        // The password already changed; a stale record expires on its own.
        if let Err(e) = self.codes.delete(&address).await {
            tracing::warn!(error = %e, "failed to remove redeemed reset code");
        }
        tracing::info!(user_id = %user.as_str(), "password reset completed");
        Ok(())
    }

    async fn change_password(
        &self,
        address: &str,
        new_password: &str,
    ) -> Result<UserHandle, GatewayError> {
        let user = self
            .users
            .find_by_email(address)
            .await?
            .ok_or(GatewayError::UnknownUser)?;
        self.users.update_password(&user, new_password).await?;
        Ok(user)
    }

    async fn count_failure(&self, address: &str) -> Result<(), GatewayError> {
        if self.max_failed_attempts == 0 {
            return Ok(());
        }
        let failures = self.codes.record_failure(address, self.code_ttl).await?;
        if failures >= self.max_failed_attempts {
            tracing::info!(failures, "reset code revoked after repeated wrong guesses");
            self.codes.delete(address).await?;
        }
        Ok(())
    }
}
