//! Redis SessionStore 实现
//!
//! 会话记录依赖 Redis 的 key 级 TTL 自动过期；批量读取用 MGET，
//! 一次扫描 + 一次批量往返，不做 N 次顺序 get

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::debug;
use warden_errors::{AuthError, AuthResult};
use warden_ports::SessionStore;

/// Redis 会话存储
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// 连接 Redis 并完成一次 PING 探活
    pub async fn connect(url: &str) -> AuthResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AuthError::store_unavailable(format!("Bad Redis url: {}", e)))?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::store_unavailable(format!("Failed to connect to Redis: {}", e))
        })?;
        let store = Self { conn };
        store.check_connection().await?;
        debug!("redis session store connected");
        Ok(store)
    }

    /// PING 探活，供健康检查复用
    pub async fn check_connection(&self) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                AuthError::store_unavailable(format!("Redis health check failed: {}", e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| AuthError::store_unavailable(format!("Redis get failed: {}", e)))
    }

    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| AuthError::store_unavailable(format!("Redis set failed: {}", e)))
    }

    async fn delete(&self, keys: &[String]) -> AuthResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(keys)
            .await
            .map_err(|e| AuthError::store_unavailable(format!("Redis del failed: {}", e)))?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> AuthResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut iter = conn
            .scan_match::<_, String>(pattern)
            .await
            .map_err(|e| AuthError::store_unavailable(format!("Redis scan failed: {}", e)))?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn bulk_get(&self, keys: &[String]) -> AuthResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::store_unavailable(format!("Redis mget failed: {}", e)))
    }
}
