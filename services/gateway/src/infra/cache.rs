use std::future::Future;
use std::time::Duration;

use anyhow::{Context, anyhow};
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};

use crate::domain::challenge::Challenge;
use crate::domain::repository::CodeStore;
use crate::error::GatewayError;

/// Redis-backed code store. TTLs are native Redis expirations.
#[derive(Clone)]
pub struct RedisCodeStore {
    pub pool: Pool,
    /// Upper bound for each operation, including pool checkout.
    pub op_timeout: Duration,
}

fn code_key(address: &str) -> String {
    format!("password_reset:{}", address)
}

fn failures_key(address: &str) -> String {
    format!("password_reset_failures:{}", address)
}

fn claim_key(address: &str) -> String {
    format!("password_reset_claim:{}", address)
}

impl RedisCodeStore {
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| anyhow!("code store {op} timed out after {:?}", self.op_timeout))
            .and_then(|res| res.with_context(|| format!("code store {op} failed")))
            .map_err(GatewayError::StoreUnavailable)
    }

    /// Readiness check.
    pub async fn ping(&self) -> bool {
        self.bounded("ping", async {
            let mut conn = self.pool.get().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong)
        })
        .await
        .is_ok()
    }
}

impl CodeStore for RedisCodeStore {
    async fn put(
        &self,
        address: &str,
        challenge: &Challenge,
        ttl: Duration,
    ) -> Result<(), GatewayError> {
        let key = code_key(address);
        let stale = vec![failures_key(address), claim_key(address)];
        let value = challenge.expose().to_owned();
        let secs = ttl.as_secs().max(1);
        self.bounded("put", async {
            let mut conn = self.pool.get().await?;
            // One MULTI/EXEC so a fresh code never inherits old failures or claims.
            let ((), _removed): ((), i64) = redis::pipe()
                .atomic()
                .set_ex(&key, value, secs)
                .del(stale)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, address: &str) -> Result<Option<Challenge>, GatewayError> {
        let key = code_key(address);
        self.bounded("get", async {
            let mut conn = self.pool.get().await?;
            let value: Option<String> = conn.get(&key).await?;
            Ok(value.map(Challenge::from_stored))
        })
        .await
    }

    async fn delete(&self, address: &str) -> Result<(), GatewayError> {
        let keys = vec![code_key(address), failures_key(address), claim_key(address)];
        self.bounded("delete", async {
            let mut conn = self.pool.get().await?;
            let _removed: i64 = conn.del(keys).await?;
            Ok(())
        })
        .await
    }

    async fn claim(&self, address: &str, ttl: Duration) -> Result<bool, GatewayError> {
        let key = claim_key(address);
        let secs = ttl.as_secs().max(1);
        self.bounded("claim", async {
            let mut conn = self.pool.get().await?;
            let set: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(1)
                .arg("NX")
                .arg("EX")
                .arg(secs)
                .query_async(&mut conn)
                .await?;
            Ok(set.is_some())
        })
        .await
    }

    async fn release(&self, address: &str) -> Result<(), GatewayError> {
        let key = claim_key(address);
        self.bounded("release", async {
            let mut conn = self.pool.get().await?;
            let _removed: i64 = conn.del(&key).await?;
            Ok(())
        })
        .await
    }

    async fn record_failure(&self, address: &str, ttl: Duration) -> Result<u32, GatewayError> {
        let key = failures_key(address);
        let secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        self.bounded("record_failure", async {
            let mut conn = self.pool.get().await?;
            let count: u32 = conn.incr(&key, 1).await?;
            if count == 1 {
                let _set: i64 = conn.expire(&key, secs).await?;
            }
            Ok(count)
        })
        .await
    }
}
