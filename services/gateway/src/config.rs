use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure};
use portico_core::config::{optional, parse_or, required};

use crate::domain::types::{
    DEFAULT_CODE_TTL_SECS, DEFAULT_MAX_FAILED_ATTEMPTS, MAX_CODE_TTL_SECS, MIN_CODE_TTL_SECS,
};
use crate::infra::mail::SmtpSecurity;

/// SMTP relay and message settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Relay host. Env var: `SMTP_HOST`.
    pub smtp_host: String,
    /// Relay port (default 25). Env var: `SMTP_PORT`.
    pub smtp_port: u16,
    /// Transport mode (default plain). Env var: `SMTP_SECURITY`.
    pub security: SmtpSecurity,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Connect and per-command bound (default 10s). Env var: `SMTP_TIMEOUT_SECS`.
    pub smtp_timeout: Duration,
    /// Whole-send bound (default 30s). Env var: `SMTP_SEND_DEADLINE_SECS`.
    pub send_deadline: Duration,
    /// Envelope and header sender. Env var: `MAIL_FROM`.
    pub from: String,
    /// Optional display name for the sender. Env var: `MAIL_FROM_NAME`.
    pub from_name: Option<String>,
    /// HTML template with one `{code}` placeholder. Env var: `TEMPLATE_PATH`.
    pub template_path: PathBuf,
}

/// S3-compatible object store used for avatars.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base of the URLs handed back to clients; defaults to `endpoint`.
    pub public_base_url: String,
}

/// Password-reset policy.
#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// Code lifetime, 60..=1800s (default 600). Env var: `CODE_TTL_SECONDS`.
    pub code_ttl: Duration,
    /// Wrong guesses before the code is revoked; 0 disables. Env var: `CODE_MAX_FAILED_ATTEMPTS`.
    pub max_failed_attempts: u32,
    /// Token-bucket capacity per address; 0 disables. Env var: `RESET_RATE_ADDRESS_CAPACITY`.
    pub rate_address_capacity: u32,
    /// Token-bucket capacity per client IP; 0 disables. Env var: `RESET_RATE_IP_CAPACITY`.
    pub rate_ip_capacity: u32,
    /// Seconds per refilled token. Env var: `RESET_RATE_REFILL_SECS`.
    pub rate_refill: Duration,
}

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// TCP port to listen on (default 8080). Env var: `GATEWAY_PORT`.
    pub port: u16,
    /// Outer per-request deadline (default 30s). Env var: `REQUEST_TIMEOUT_SECS`.
    pub request_timeout: Duration,
    /// Redis URL of the code store. Env var: `CODE_STORE_URL`.
    pub code_store_url: String,
    /// Per-operation bound on the code store (default 2s). Env var: `CODE_STORE_TIMEOUT_SECS`.
    pub code_store_timeout: Duration,
    /// User service gRPC URL (e.g. "http://users:50051"). Env var: `USER_SERVICE_URL`.
    pub user_service_url: String,
    /// Per-call bound on the user service (default 5s). Env var: `USER_SERVICE_TIMEOUT_SECS`.
    pub user_service_timeout: Duration,
    /// HS256 secret shared with the token issuer. Env var: `JWT_SECRET`.
    pub jwt_secret: String,
    /// Avatar size cap in bytes (default 5 MiB). Env var: `MAX_UPLOAD_BYTES`.
    pub max_upload_bytes: usize,
    /// Reverse proxies in front of the gateway whose `x-forwarded-for` entries are
    /// believed; 0 (default) keys rate limits on the socket peer. Env var: `TRUSTED_PROXY_HOPS`.
    pub trusted_proxy_hops: usize,
    pub mail: MailConfig,
    pub object_store: ObjectStoreConfig,
    pub reset: ResetConfig,
}

fn secs(name: &str, default: u64) -> anyhow::Result<Duration> {
    let value: u64 = parse_or(name, default)?;
    ensure!(value > 0, "{name} must be positive");
    Ok(Duration::from_secs(value))
}

/// Check the configured code lifetime against the accepted window.
pub fn validate_code_ttl(secs: u64) -> anyhow::Result<Duration> {
    ensure!(
        (MIN_CODE_TTL_SECS..=MAX_CODE_TTL_SECS).contains(&secs),
        "CODE_TTL_SECONDS must be within {MIN_CODE_TTL_SECS}..={MAX_CODE_TTL_SECS}, got {secs}"
    );
    Ok(Duration::from_secs(secs))
}

/// Submission requires credentials; plain ignores them.
pub fn validate_smtp_credentials(
    security: SmtpSecurity,
    username: Option<&str>,
    password: Option<&str>,
) -> anyhow::Result<()> {
    match (security, username, password) {
        (SmtpSecurity::Submission, Some(_), Some(_)) => Ok(()),
        (SmtpSecurity::Submission, _, _) => {
            bail!("SMTP_SECURITY=submission requires SMTP_USERNAME and SMTP_PASSWORD")
        }
        (_, Some(_), None) | (_, None, Some(_)) => {
            bail!("SMTP_USERNAME and SMTP_PASSWORD must be set together")
        }
        _ => Ok(()),
    }
}

impl MailConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let security: SmtpSecurity = parse_or("SMTP_SECURITY", SmtpSecurity::Plain)?;
        let smtp_username = optional("SMTP_USERNAME");
        let smtp_password = optional("SMTP_PASSWORD");
        validate_smtp_credentials(security, smtp_username.as_deref(), smtp_password.as_deref())?;

        Ok(Self {
            smtp_host: required("SMTP_HOST")?,
            smtp_port: parse_or("SMTP_PORT", 25)?,
            security,
            smtp_username,
            smtp_password,
            smtp_timeout: secs("SMTP_TIMEOUT_SECS", 10)?,
            send_deadline: secs("SMTP_SEND_DEADLINE_SECS", 30)?,
            from: required("MAIL_FROM")?,
            from_name: optional("MAIL_FROM_NAME"),
            template_path: PathBuf::from(
                optional("TEMPLATE_PATH")
                    .unwrap_or_else(|| "templates/verification_code.html".to_owned()),
            ),
        })
    }
}

impl ObjectStoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = required("OBJECT_STORE_ENDPOINT")?;
        Ok(Self {
            public_base_url: optional("OBJECT_STORE_PUBLIC_URL")
                .unwrap_or_else(|| endpoint.clone()),
            endpoint,
            bucket: optional("OBJECT_STORE_BUCKET").unwrap_or_else(|| "photos".to_owned()),
            access_key: required("OBJECT_STORE_ACCESS_KEY")?,
            secret_key: required("OBJECT_STORE_SECRET_KEY")?,
            region: optional("OBJECT_STORE_REGION").unwrap_or_else(|| "us-east-1".to_owned()),
        })
    }
}

impl ResetConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            code_ttl: validate_code_ttl(parse_or("CODE_TTL_SECONDS", DEFAULT_CODE_TTL_SECS)?)?,
            max_failed_attempts: parse_or("CODE_MAX_FAILED_ATTEMPTS", DEFAULT_MAX_FAILED_ATTEMPTS)?,
            rate_address_capacity: parse_or("RESET_RATE_ADDRESS_CAPACITY", 3)?,
            rate_ip_capacity: parse_or("RESET_RATE_IP_CAPACITY", 20)?,
            rate_refill: secs("RESET_RATE_REFILL_SECS", 60)?,
        })
    }
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: parse_or("GATEWAY_PORT", 8080)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 30)?,
            code_store_url: required("CODE_STORE_URL")?,
            code_store_timeout: secs("CODE_STORE_TIMEOUT_SECS", 2)?,
            user_service_url: required("USER_SERVICE_URL")?,
            user_service_timeout: secs("USER_SERVICE_TIMEOUT_SECS", 5)?,
            jwt_secret: required("JWT_SECRET")?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            trusted_proxy_hops: parse_or("TRUSTED_PROXY_HOPS", 0)?,
            mail: MailConfig::from_env()?,
            object_store: ObjectStoreConfig::from_env()?,
            reset: ResetConfig::from_env()?,
        })
    }
}
