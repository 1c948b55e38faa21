//! 测试辅助：内存版会话存储和组件装配
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::Secret;
use warden_config::{AccessConfig, TokenStoreMode};
use warden_errors::AuthResult;
use warden_ports::SessionStore;
use warden_token_core::{
    AccessContext, Principal, RefreshCoordinator, RequestMeta, SessionRegistry, TokenIssuer,
    TokenValidator,
};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// 内存会话存储，TTL 懒过期；所有操作同步完成，future 立即就绪
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(entries: &HashMap<String, Entry>, key: &str) -> Option<String> {
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(Self::live_value(&self.entries.lock(), key))
    }

    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> AuthResult<()> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> AuthResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let keys = entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, _)| k.as_str())
            .filter(|key| match pattern.strip_suffix('*') {
                Some(prefix) => key.starts_with(prefix),
                None => *key == pattern,
            })
            .map(str::to_string)
            .collect();
        Ok(keys)
    }

    async fn bulk_get(&self, keys: &[String]) -> AuthResult<Vec<Option<String>>> {
        let entries = self.entries.lock();
        Ok(keys
            .iter()
            .map(|key| Self::live_value(&entries, key))
            .collect())
    }
}

pub const APP: &str = "warden";

pub fn access_config() -> AccessConfig {
    AccessConfig {
        access_secret: Secret::new("test-access-secret".to_string()),
        refresh_secret: Secret::new("test-refresh-secret".to_string()),
        access_expire: 3600,
        refresh_expire: 3600 * 24 * 7,
        conflict: false,
        access_store: false,
        access_check: false,
        token_store: TokenStoreMode::Header,
        token_name: "Authorization".to_string(),
        interceptors: Vec::new(),
    }
}

/// 开启服务端保存/校验 + 冲突检测的配置
pub fn tracked_config() -> AccessConfig {
    let mut config = access_config();
    config.conflict = true;
    config.access_store = true;
    config.access_check = true;
    config
}

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub issuer: TokenIssuer,
    pub validator: TokenValidator,
    pub coordinator: RefreshCoordinator,
    pub registry: SessionRegistry,
}

pub fn build_env(config: AccessConfig) -> TestEnv {
    warden_telemetry::init_test_tracing();
    let config = Arc::new(config);
    let store = Arc::new(MemoryStore::new());
    let session_store: Arc<dyn SessionStore> = store.clone();
    TestEnv {
        store: store.clone(),
        issuer: TokenIssuer::new(APP, config.clone(), Some(session_store.clone())),
        validator: TokenValidator::new(APP, config.clone(), Some(session_store.clone())),
        coordinator: RefreshCoordinator::new(APP, config.clone(), session_store.clone()),
        registry: SessionRegistry::new(APP, session_store),
    }
}

pub fn ctx_with_ip(ip: &str) -> AccessContext {
    AccessContext::new(RequestMeta::new().with_ip(ip))
}

pub fn ctx_with_token(token: &str) -> AccessContext {
    AccessContext::new(
        RequestMeta::new()
            .with_ip("10.0.0.1")
            .with_header("Authorization", format!("Bearer {}", token)),
    )
}

/// 带齐所有可传输字段的测试主体
pub fn alice() -> Principal {
    let mut principal = Principal::new(warden_common::AuthType::User, "alice");
    principal.tenant_id = Some("t1".to_string());
    principal.user_nick = Some("Alice".to_string());
    principal.user_id = Some(42);
    principal.user_code = Some("U-042".to_string());
    principal
        .properties
        .insert("theme".to_string(), serde_json::Value::from("dark"));
    principal.roles = vec!["viewer".to_string(), "editor".to_string()];
    principal.permissions = vec!["system:user:list".to_string()];
    principal.dept_id = Some(7);
    principal.dept_code = Some("D-7".to_string());
    principal.dept_name = Some("platform".to_string());
    principal.cluster_id = Some(1);
    principal.cluster_level = Some(2);
    principal.cluster_name = Some("main".to_string());
    principal
}
