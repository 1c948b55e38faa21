//! 会话记录与存储 key
//!
//! access key: `{app}:auth:{tenant|default}:access:{authType}:{username}:{accessId}`
//! refresh key: `{app}:auth:{tenant|default}:refresh:{authType}:{username}`
//!
//! refresh key 不含 refreshId，每个 (tenant, authType, username) 最多一条
//! 存活记录，轮换总是覆盖写

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_common::AuthType;

use crate::principal::Principal;

const DEFAULT_TENANT: &str = "default";

/// 会话标识，存储 key 的组成部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub access_id: String,
    pub refresh_id: Option<String>,
    pub tenant_id: Option<String>,
    pub auth_type: AuthType,
    pub username: String,
}

impl From<&Principal> for SessionIdentity {
    fn from(principal: &Principal) -> Self {
        Self {
            access_id: principal.access_id.clone(),
            refresh_id: principal.refresh_id.clone(),
            tenant_id: principal.tenant_id.clone(),
            auth_type: principal.auth_type,
            username: principal.username.clone(),
        }
    }
}

/// 服务端 AccessToken 会话记录，TTL 与令牌剩余有效期一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    pub access_id: String,
    pub tenant_id: Option<String>,
    pub auth_type: AuthType,
    pub user_account: String,
    pub user_name: Option<String>,
    pub access_ip: Option<String>,
    pub access_time: Option<DateTime<Utc>>,
    pub login_ip: Option<String>,
    pub login_time: Option<DateTime<Utc>>,
    pub cluster_name: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessRecord {
    pub fn from_principal(
        principal: &Principal,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_id: principal.access_id.clone(),
            tenant_id: principal.tenant_id.clone(),
            auth_type: principal.auth_type,
            user_account: principal.username.clone(),
            user_name: principal.user_nick.clone(),
            access_ip: principal.access_ip.clone(),
            access_time: principal.access_time,
            login_ip: principal.login_ip.clone(),
            login_time: principal.login_time,
            cluster_name: principal.cluster_name.clone(),
            issued_at,
            expires_at,
        }
    }
}

/// 服务端 RefreshToken 会话记录，只保留重建会话所需的身份字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub refresh_id: String,
    pub access_id: String,
    pub tenant_id: Option<String>,
    pub auth_type: AuthType,
    pub username: String,
    pub conflict: bool,
}

impl RefreshRecord {
    pub fn from_principal(principal: &Principal, refresh_id: String) -> Self {
        Self {
            refresh_id,
            access_id: principal.access_id.clone(),
            tenant_id: principal.tenant_id.clone(),
            auth_type: principal.auth_type,
            username: principal.username.clone(),
            conflict: principal.conflict,
        }
    }

    /// 轮换时从记录重建主体，角色/权限由边界层重新解析
    pub fn into_principal(self) -> Principal {
        let mut principal = Principal::new(self.auth_type, self.username);
        principal.tenant_id = self.tenant_id;
        principal.access_id = self.access_id;
        principal.refresh_id = Some(self.refresh_id);
        principal.conflict = self.conflict;
        principal
    }
}

fn tenant_or_default(tenant: Option<&str>) -> &str {
    match tenant {
        Some(t) if !t.is_empty() => t,
        _ => DEFAULT_TENANT,
    }
}

/// AccessToken 记录 key
pub fn access_key(
    app: &str,
    tenant: Option<&str>,
    auth_type: AuthType,
    username: &str,
    access_id: &str,
) -> String {
    format!(
        "{}:auth:{}:access:{}:{}:{}",
        app,
        tenant_or_default(tenant),
        auth_type,
        username,
        access_id
    )
}

/// RefreshToken 记录 key
pub fn refresh_key(app: &str, tenant: Option<&str>, auth_type: AuthType, username: &str) -> String {
    format!(
        "{}:auth:{}:refresh:{}:{}",
        app,
        tenant_or_default(tenant),
        auth_type,
        username
    )
}

/// 租户下全部 access 记录的扫描模式
pub fn tenant_access_pattern(app: &str, tenant: Option<&str>) -> String {
    format!("{}:auth:{}:access:*", app, tenant_or_default(tenant))
}

/// 租户下全部 refresh 记录的扫描模式
pub fn tenant_refresh_pattern(app: &str, tenant: Option<&str>) -> String {
    format!("{}:auth:{}:refresh:*", app, tenant_or_default(tenant))
}

/// 单个用户全部 access 记录的扫描模式
pub fn user_access_pattern(
    app: &str,
    tenant: Option<&str>,
    auth_type: AuthType,
    username: &str,
) -> String {
    format!(
        "{}:auth:{}:access:{}:{}:*",
        app,
        tenant_or_default(tenant),
        auth_type,
        username
    )
}
