//! 通用类型定义

use std::fmt;

use serde::{Deserialize, Serialize};

/// 认证方式
///
/// 小写形式进入令牌 claims 和存储 key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    App,
    User,
    Ldap,
    Oauth,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::User => "user",
            Self::Ldap => "ldap",
            Self::Oauth => "oauth",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
