//! Redis-backed store.

use super::{Member, QueueStore, ScoredMember};
use crate::error::{BrokerError, BrokerResult};
use crate::message::TaskId;
use crate::metrics::StoreMetrics;
use crate::queue::StorageShape;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use taskyard_config::RedisConfig;
use tracing::{debug, info};

/// Server-side move of one sorted-set member into the ready list.
///
/// KEYS[1] source sorted set, KEYS[2] ready list.
/// ARGV[1] score, ARGV[2] task ID.
///
/// Candidates sharing the score are decoded one by one; members that are not
/// valid JSON are passed over. The first member whose `ID` matches is removed
/// from the source and pushed onto the head of ready. Returns 1 on a move and
/// 0 otherwise.
pub const MOVE_TO_READY_SCRIPT: &str = r#"
local msgs = redis.call("ZRANGEBYSCORE", KEYS[1], ARGV[1], ARGV[1])
for _, msg in ipairs(msgs) do
  local ok, decoded = pcall(cjson.decode, msg)
  if ok and type(decoded) == "table" and decoded["ID"] == ARGV[2] then
    redis.call("ZREM", KEYS[1], msg)
    redis.call("LPUSH", KEYS[2], msg)
    return 1
  end
end
return 0
"#;

/// Create a Redis connection pool.
pub async fn create_pool(config: &RedisConfig) -> BrokerResult<Pool> {
    info!("Creating Redis connection pool for broker...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| BrokerError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| BrokerError::Configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let connect_timeout = config.connect_timeout();
    tokio::time::timeout(connect_timeout, async {
        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok::<_, BrokerError>(())
    })
    .await
    .map_err(|_| BrokerError::Timeout(connect_timeout))??;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Store backed by a Redis connection pool.
pub struct RedisStore {
    pool: Pool,
    move_script: Script,
    command_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl RedisStore {
    /// Wrap an existing pool.
    pub fn new(pool: Pool, command_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            move_script: Script::new(MOVE_TO_READY_SCRIPT),
            command_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Build a pool from configuration, verify it, and wrap it.
    pub async fn connect(config: &RedisConfig) -> BrokerResult<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool, config.command_timeout()))
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> BrokerResult<deadpool_redis::Connection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        Ok(self.pool.get().await?)
    }

    /// Runs one round trip under the command timeout and records its duration.
    async fn run<T, F>(&self, operation: &'static str, fut: F) -> BrokerResult<T>
    where
        F: Future<Output = BrokerResult<T>> + Send,
    {
        let started = Instant::now();
        let result = match self.command_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or(Err(BrokerError::Timeout(limit))),
            None => fut.await,
        };
        StoreMetrics::operation(operation, started.elapsed());
        result
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn list_range(&self, key: &str) -> BrokerResult<Vec<Member>> {
        self.run("lrange", async {
            let mut conn = self.conn().await?;
            let members: Vec<Vec<u8>> = conn.lrange(key, 0, -1).await?;
            Ok(members)
        })
        .await
    }

    async fn list_len(&self, key: &str) -> BrokerResult<u64> {
        self.run("llen", async {
            let mut conn = self.conn().await?;
            let len: u64 = conn.llen(key).await?;
            Ok(len)
        })
        .await
    }

    async fn list_push_head(&self, key: &str, member: &[u8]) -> BrokerResult<()> {
        self.run("lpush", async {
            let mut conn = self.conn().await?;
            let _: i64 = conn.lpush(key, member).await?;
            Ok(())
        })
        .await
    }

    async fn sorted_range_with_scores(&self, key: &str) -> BrokerResult<Vec<ScoredMember>> {
        self.run("zrange", async {
            let mut conn = self.conn().await?;
            let members: Vec<(Vec<u8>, f64)> = conn.zrange_withscores(key, 0, -1).await?;
            Ok(members
                .into_iter()
                .map(|(member, score)| ScoredMember { member, score })
                .collect())
        })
        .await
    }

    async fn sorted_card(&self, key: &str) -> BrokerResult<u64> {
        self.run("zcard", async {
            let mut conn = self.conn().await?;
            let card: u64 = conn.zcard(key).await?;
            Ok(card)
        })
        .await
    }

    async fn sorted_add(&self, key: &str, member: &[u8], score: f64) -> BrokerResult<()> {
        self.run("zadd", async {
            let mut conn = self.conn().await?;
            let _: i64 = conn.zadd(key, member, score).await?;
            Ok(())
        })
        .await
    }

    async fn sorted_remove(&self, key: &str, member: &[u8]) -> BrokerResult<bool> {
        self.run("zrem", async {
            let mut conn = self.conn().await?;
            let removed: i64 = conn.zrem(key, member).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn sorted_range_by_score(&self, key: &str, score: f64) -> BrokerResult<Vec<Member>> {
        self.run("zrangebyscore", async {
            let mut conn = self.conn().await?;
            let members: Vec<Vec<u8>> = conn.zrangebyscore(key, score, score).await?;
            Ok(members)
        })
        .await
    }

    async fn cardinalities(&self, keys: &[(&str, StorageShape)]) -> BrokerResult<Vec<u64>> {
        self.run("cardinalities", async {
            let mut conn = self.conn().await?;
            let mut pipe = redis::pipe();
            for (key, shape) in keys {
                match shape {
                    StorageShape::List => pipe.llen(*key),
                    StorageShape::SortedSet => pipe.zcard(*key),
                };
            }
            let counts: Vec<u64> = pipe.query_async(&mut *conn).await?;
            Ok(counts)
        })
        .await
    }

    async fn move_to_ready(
        &self,
        source_key: &str,
        ready_key: &str,
        id: &TaskId,
        score: f64,
    ) -> BrokerResult<i64> {
        self.run("move_to_ready", async {
            let mut conn = self.conn().await?;
            let reply: Value = self
                .move_script
                .key(source_key)
                .key(ready_key)
                .arg(score)
                .arg(id.to_string())
                .invoke_async(&mut *conn)
                .await?;

            match reply {
                Value::Int(moved) => Ok(moved),
                other => Err(BrokerError::UnexpectedReply(format!("{:?}", other))),
            }
        })
        .await
    }

    async fn ping(&self) -> BrokerResult<()> {
        self.run("ping", async {
            let mut conn = self.conn().await?;
            redis::cmd("PING").query_async::<String>(&mut *conn).await?;
            Ok(())
        })
        .await
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close();
            debug!("Redis store closed");
        }
    }
}
