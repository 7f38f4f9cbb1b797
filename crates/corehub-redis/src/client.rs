//! Redis connection pool management and document helpers.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Redis error types.
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for Redis operations.
pub type RedisResult<T> = Result<T, RedisError>;

/// Redis connection pool. ConnectionManager multiplexes internally and is
/// Clone, so callers clone it to get a mutable handle for each operation.
pub type RedisPool = ConnectionManager;

/// Initialize a Redis connection pool from a URL.
///
/// Example URL: `redis://127.0.0.1:6379`
pub async fn init_pool(redis_url: &str) -> RedisResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

/// Current time as RFC 3339 plus the millisecond score used by sorted-set indexes.
pub(crate) fn now_stamp() -> (String, i64) {
    let now = chrono::Utc::now();
    (now.to_rfc3339(), now.timestamp_millis())
}

/// Write a JSON document into the `data` field of a hash.
pub(crate) async fn put_doc<T: Serialize>(pool: &RedisPool, key: &str, doc: &T) -> RedisResult<()> {
    let mut conn = pool.clone();
    let json = serde_json::to_string(doc)?;
    conn.hset::<_, _, _, ()>(key, "data", json).await?;
    Ok(())
}

/// Read a JSON document; `None` when the key does not exist.
pub(crate) async fn get_doc<T: DeserializeOwned>(pool: &RedisPool, key: &str) -> RedisResult<Option<T>> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(key, "data").await?;
    match json {
        Some(j) => Ok(Some(serde_json::from_str(&j)?)),
        None => Ok(None),
    }
}

/// Read many documents, skipping keys that vanished or no longer decode.
pub(crate) async fn get_docs<T: DeserializeOwned>(
    pool: &RedisPool,
    keys: Vec<String>,
) -> RedisResult<Vec<T>> {
    let mut docs = Vec::with_capacity(keys.len());
    for key in keys {
        let mut conn = pool.clone();
        let json: Option<String> = conn.hget(&key, "data").await?;
        if let Some(j) = json {
            match serde_json::from_str::<T>(&j) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping undecodable document"),
            }
        }
    }
    Ok(docs)
}

/// Claim a unique key with `SET NX`. Returns false when it is already taken.
pub(crate) async fn claim_unique(pool: &RedisPool, key: &str, owner: &str) -> RedisResult<bool> {
    let mut conn = pool.clone();
    let claimed: bool = conn.set_nx(key, owner).await?;
    Ok(claimed)
}

/// Release a unique key claimed with [`claim_unique`].
pub(crate) async fn release_unique(pool: &RedisPool, key: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.del::<_, ()>(key).await?;
    Ok(())
}

/// Resolve a unique key to its owner id.
pub(crate) async fn lookup_unique(pool: &RedisPool, key: &str) -> RedisResult<Option<String>> {
    let mut conn = pool.clone();
    let owner: Option<String> = conn.get(key).await?;
    Ok(owner)
}

/// Ids stored in a sorted-set index, oldest first.
pub(crate) async fn index_members(pool: &RedisPool, zkey: &str) -> RedisResult<Vec<String>> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn.zrange(zkey, 0, -1).await?;
    Ok(ids)
}

/// Add an id to a sorted-set index.
pub(crate) async fn index_add(pool: &RedisPool, zkey: &str, id: &str, score: i64) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.zadd::<_, _, _, ()>(zkey, id, score).await?;
    Ok(())
}

/// Remove an id from a sorted-set index.
pub(crate) async fn index_remove(pool: &RedisPool, zkey: &str, id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.zrem::<_, _, ()>(zkey, id).await?;
    Ok(())
}
