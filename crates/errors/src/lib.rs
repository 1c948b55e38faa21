//! warden-errors - 统一错误处理
//!
//! 认证结果全部使用带标签的错误类型，调用方可以把每种错误映射为
//! 不同的对外响应；基础设施故障与认证结论严格区分

use thiserror::Error;

/// 认证错误类型
#[derive(Debug, Error)]
pub enum AuthError {
    /// 请求中没有携带令牌
    #[error("Access token is missing")]
    NoToken,

    /// 令牌结构损坏，无法解析
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// 令牌已过期
    #[error("Access token has expired")]
    Expired,

    /// 签名校验失败
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// 签名和有效期都正常，但服务端会话记录已不存在（已注销/被踢出）
    #[error("Access denied: session has been revoked")]
    Denied,

    /// 令牌绑定的 IP 与请求来源不一致
    #[error("Access denied: request ip changed")]
    IpChanged,

    /// 刷新令牌已被更早的轮换消费（重放/盗用检测）
    #[error("Refresh token has already been rotated")]
    Conflict,

    /// 刷新会话记录不存在，需要重新认证
    #[error("Refresh session does not exist")]
    NoSession,

    /// 会话记录不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 存储后端不可用，与"未认证"严格区分
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// 内部错误（签名、序列化等）
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 是否属于认证结论（而非基础设施故障）
    pub fn is_auth_outcome(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_) | Self::Internal(_))
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoToken
            | Self::Malformed(_)
            | Self::Expired
            | Self::Invalid(_)
            | Self::Denied
            | Self::IpChanged
            | Self::Conflict
            | Self::NoSession => 401,
            Self::NotFound(_) => 404,
            Self::StoreUnavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// 对应的 i18n 消息 key，边界层用来生成用户可见的提示
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::NoToken => "frame.auth.access.empty",
            Self::Malformed(_) => "frame.auth.access.malformed",
            Self::Expired => "frame.auth.access.expire",
            Self::Invalid(_) => "frame.auth.access.invalid",
            Self::Denied => "frame.auth.access.denied",
            Self::IpChanged => "frame.auth.access.changed.ip",
            Self::Conflict => "frame.auth.refresh.changed",
            Self::NoSession => "frame.auth.refresh.empty",
            Self::NotFound(_) => "frame.auth.access.notfound",
            Self::StoreUnavailable(_) => "frame.auth.store.unavailable",
            Self::Internal(_) => "frame.auth.internal",
        }
    }
}

/// Result 类型别名
pub type AuthResult<T> = Result<T, AuthError>;
