use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRef;
use deadpool_redis::Pool as RedisPool;
use tonic::transport::Endpoint;

use portico_auth_types::identity::JwtSecret;

use crate::config::GatewayConfig;
use crate::domain::repository::RateLimiter;
use crate::infra::cache::RedisCodeStore;
use crate::infra::grpc::GrpcUserDirectory;
use crate::infra::mail::SmtpMailer;
use crate::infra::rate_limit::TokenBucketRateLimiter;
use crate::infra::storage::S3ObjectStore;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub redis: RedisPool,
    pub code_store_timeout: Duration,
    pub users: GrpcUserDirectory,
    pub mailer: SmtpMailer,
    pub objects: S3ObjectStore,
    pub limiter: Arc<dyn RateLimiter>,
    pub jwt_secret: JwtSecret,
    pub code_ttl: Duration,
    pub max_failed_attempts: u32,
    pub max_upload_bytes: usize,
    pub trusted_proxy_hops: usize,
}

impl AppState {
    /// Build every client from config. Nothing here opens a connection: the Redis pool
    /// and the gRPC channel connect on first use.
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let redis = deadpool_redis::Config::from_url(config.code_store_url.as_str())
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .context("failed to create code store pool")?;

        let channel = Endpoint::from_shared(config.user_service_url.clone())
            .with_context(|| format!("invalid USER_SERVICE_URL {:?}", config.user_service_url))?
            .timeout(config.user_service_timeout)
            .connect_timeout(config.user_service_timeout)
            .connect_lazy();

        let limiter = TokenBucketRateLimiter::new(
            config.reset.rate_address_capacity,
            config.reset.rate_ip_capacity,
            config.reset.rate_refill,
        );

        Ok(Self {
            redis,
            code_store_timeout: config.code_store_timeout,
            users: GrpcUserDirectory::new(channel),
            mailer: SmtpMailer::new(&config.mail)?,
            objects: S3ObjectStore::new(&config.object_store),
            limiter: Arc::new(limiter),
            jwt_secret: JwtSecret::new(config.jwt_secret.as_str()),
            code_ttl: config.reset.code_ttl,
            max_failed_attempts: config.reset.max_failed_attempts,
            max_upload_bytes: config.max_upload_bytes,
            trusted_proxy_hops: config.trusted_proxy_hops,
        })
    }

    pub fn code_store(&self) -> RedisCodeStore {
        RedisCodeStore {
            pool: self.redis.clone(),
            op_timeout: self.code_store_timeout,
        }
    }

    pub fn user_directory(&self) -> GrpcUserDirectory {
        self.users.clone()
    }

    pub fn mailer(&self) -> SmtpMailer {
        self.mailer.clone()
    }

    pub fn object_store(&self) -> S3ObjectStore {
        self.objects.clone()
    }
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_secret.clone()
    }
}
