//! 会话存储 trait 定义
//!
//! 后端必须支持按 TTL 自动过期，过期记录自清理，不需要扫描进程

use std::time::Duration;

use async_trait::async_trait;
use warden_errors::AuthResult;

/// 会话存储 trait
///
/// 轮换竞争的正确性依赖后端单 key 读写的原子性，实现方不做 CAS
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 获取值，不存在返回 None
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// 写入值并设置过期时间，已存在则覆盖
    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()>;

    /// 批量删除，key 不存在不报错
    async fn delete(&self, keys: &[String]) -> AuthResult<()>;

    /// 按模式扫描 key，模式只支持尾部 `*` 通配
    async fn scan_keys(&self, pattern: &str) -> AuthResult<Vec<String>>;

    /// 批量获取，单次往返，结果与入参顺序一致
    async fn bulk_get(&self, keys: &[String]) -> AuthResult<Vec<Option<String>>>;
}
