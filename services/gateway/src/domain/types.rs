use serde::Serialize;

/// Opaque user identifier owned by the user service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle(pub String);

impl UserHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Profile as returned to the account owner.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub photo: String,
    pub role: String,
}

/// New-account payload forwarded to the user service.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
}

/// Partial profile update; `None` fields are left untouched upstream.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub photo: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.photo.is_none()
    }
}

/// Subject line of the verification mail.
pub const RESET_MAIL_SUBJECT: &str = "Your verification code";

/// Placeholder substituted with the challenge in the mail template.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Default code lifetime in seconds (10 minutes).
pub const DEFAULT_CODE_TTL_SECS: u64 = 600;

/// Accepted range for the configured code lifetime, in seconds.
pub const MIN_CODE_TTL_SECS: u64 = 60;
pub const MAX_CODE_TTL_SECS: u64 = 1800;

/// How long a redemption may hold a code while the password update is in flight.
pub const REDEEM_CLAIM_TTL_SECS: u64 = 30;

/// Wrong guesses tolerated before a live code is revoked.
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
