//! 已认证主体
//!
//! 凭证校验通过后得到的用户信息，角色/权限作为透明 claims 携带

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_common::AuthType;

/// 管理员角色
pub const ROLE_ADMIN: &str = "sysAdmin";

/// 管理员权限
pub const PERMIT_ADMIN: &str = "*:*:*";

/// 已认证主体
///
/// 密码/凭证校验不在本库范围内，调用方在认证完成后构造 Principal，
/// 会话字段（access_id/refresh_id/ip/时间）由签发方填充
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// 认证方式
    pub auth_type: AuthType,
    /// 租户，空值按 "default" 处理
    pub tenant_id: Option<String>,
    /// 用户账号
    pub username: String,
    /// 用户昵称
    pub user_nick: Option<String>,
    pub user_id: Option<i64>,
    pub user_code: Option<String>,
    /// 透明的用户属性
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// 冒号分层权限串，`*` 为通配段
    #[serde(default)]
    pub permissions: Vec<String>,
    pub dept_id: Option<i64>,
    pub dept_code: Option<String>,
    pub dept_name: Option<String>,
    pub cluster_id: Option<i32>,
    pub cluster_level: Option<i32>,
    pub cluster_name: Option<String>,
    /// 冲突检测标记，签发时由配置填充
    #[serde(default)]
    pub conflict: bool,

    // 会话字段
    pub access_id: String,
    pub refresh_id: Option<String>,
    pub access_ip: Option<String>,
    pub access_time: Option<DateTime<Utc>>,
    pub login_ip: Option<String>,
    pub login_time: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn new(auth_type: AuthType, username: impl Into<String>) -> Self {
        Self {
            auth_type,
            tenant_id: None,
            username: username.into(),
            user_nick: None,
            user_id: None,
            user_code: None,
            properties: HashMap::new(),
            roles: Vec::new(),
            permissions: Vec::new(),
            dept_id: None,
            dept_code: None,
            dept_name: None,
            cluster_id: None,
            cluster_level: None,
            cluster_name: None,
            conflict: false,
            access_id: String::new(),
            refresh_id: None,
            access_ip: None,
            access_time: None,
            login_ip: None,
            login_time: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.is_admin() || self.roles.iter().any(|r| r == role)
    }

    /// 权限判断，持有的权限串按段匹配，`*` 匹配任意一段
    pub fn has_permission(&self, required: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        self.permissions
            .iter()
            .any(|held| permit_matches(held, required))
    }

    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        required.iter().any(|p| self.has_permission(p))
    }
}

fn permit_matches(held: &str, required: &str) -> bool {
    if held == PERMIT_ADMIN {
        return true;
    }
    let mut held_segments = held.split(':');
    let mut required_segments = required.split(':');
    loop {
        match (held_segments.next(), required_segments.next()) {
            (None, None) => return true,
            (Some(h), Some(r)) => {
                if h != "*" && h != r {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
