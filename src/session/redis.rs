//! Redis-backed session store.
//!
//! Records are stored as JSON strings with `SET key value EX ttl`, so Redis
//! enforces the expiry on its own.

use super::{SessionRecord, SessionStore};
use crate::{Error, Result};
use async_trait::async_trait;
use deadpool_redis::{redis::cmd, Config, Connection, Pool, PoolConfig, Runtime, Timeouts};
use std::{cell::Cell, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info_span, Instrument};

/// How often idle connections are checked against the pool limits.
pub const REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Bounds for the Redis connection pool.
#[derive(Clone, Debug)]
pub struct RedisPoolSettings {
    /// Maximum open connections.
    pub max_size: usize,
    /// Idle connections kept after a reap pass.
    pub max_idle: usize,
    /// Close connections unused for longer than this.
    pub idle_timeout: Option<Duration>,
    /// Close connections older than this.
    pub max_lifetime: Option<Duration>,
    /// How long a caller waits for a free connection; `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    pub create_timeout: Option<Duration>,
}

impl Default for RedisPoolSettings {
    fn default() -> Self {
        Self {
            max_size: 50,
            max_idle: 10,
            idle_timeout: Some(Duration::from_secs(300)),
            max_lifetime: None,
            wait_timeout: None,
            create_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl RedisPoolSettings {
    /// Whether an idle connection survives a reap pass, given how many were
    /// already kept during the same pass.
    #[must_use]
    pub fn keeps_idle(&self, kept: usize, idle_for: Duration, age: Duration) -> bool {
        kept < self.max_idle
            && self.idle_timeout.map_or(true, |limit| idle_for < limit)
            && self.max_lifetime.map_or(true, |limit| age < limit)
    }
}

#[derive(Clone)]
pub struct RedisSessionStore {
    pool: Pool,
    settings: RedisPoolSettings,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("pool", &self.pool.status())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RedisSessionStore {
    /// Build a pool for `url`. Connections are opened lazily; call
    /// [`SessionStore::ping`] to verify connectivity.
    ///
    /// # Errors
    /// Returns an error if the pool configuration is invalid.
    pub fn connect(url: &str, settings: &RedisPoolSettings) -> anyhow::Result<Self> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig {
            max_size: settings.max_size,
            timeouts: Timeouts {
                wait: settings.wait_timeout,
                create: settings.create_timeout,
                recycle: None,
            },
            ..PoolConfig::default()
        });
        let pool = config.create_pool(Some(Runtime::Tokio1))?;

        Ok(Self {
            pool,
            settings: settings.clone(),
        })
    }

    /// Drop idle connections that exceed the idle count, idle timeout or
    /// lifetime. Connections checked out by callers are left alone.
    pub fn reap(&self) {
        let before = self.pool.status().size;
        let kept = Cell::new(0_usize);
        let _ = self.pool.retain(|_, metrics| {
            let keep = self
                .settings
                .keeps_idle(kept.get(), metrics.last_used(), metrics.age());
            if keep {
                kept.set(kept.get() + 1);
            }
            keep
        });

        let closed = before.saturating_sub(self.pool.status().size);
        if closed > 0 {
            debug!(closed, "closed idle redis connections");
        }
    }

    /// Run [`Self::reap`] every [`REAP_INTERVAL`] for the life of the process.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(REAP_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.reap();
            }
        })
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|err| Error::internal("session store unavailable").with_source(err))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, key: &str) -> Result<Option<SessionRecord>> {
        let mut conn = self.connection().await?;
        let span = info_span!("redis.command", db.system = "redis", db.operation = "GET");
        let raw: Option<String> = cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .instrument(span)
            .await
            .map_err(|err| Error::internal("session store error").with_source(err))?;

        raw.map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|err| Error::internal("corrupt session record").with_source(err))
        })
        .transpose()
    }

    async fn save(&self, key: &str, record: &SessionRecord, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(record)
            .map_err(|err| Error::internal("failed to encode session").with_source(err))?;
        // Redis rejects EX 0.
        let seconds = ttl.as_secs().max(1);

        let mut conn = self.connection().await?;
        let span = info_span!("redis.command", db.system = "redis", db.operation = "SET");
        let _: () = cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .instrument(span)
            .await
            .map_err(|err| Error::internal("session store error").with_source(err))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let span = info_span!("redis.command", db.system = "redis", db.operation = "DEL");
        let _: i64 = cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .instrument(span)
            .await
            .map_err(|err| Error::internal("session store error").with_source(err))?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let span = info_span!("redis.command", db.system = "redis", db.operation = "PING");
        let _: String = cmd("PING")
            .query_async(&mut conn)
            .instrument(span)
            .await
            .map_err(|err| Error::internal("session store unavailable").with_source(err))?;

        Ok(())
    }
}
