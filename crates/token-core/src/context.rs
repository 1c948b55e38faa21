//! 请求级访问上下文
//!
//! 显式的 per-request 对象，由边界层创建并沿调用链传递，
//! 不使用进程级单例。主体在一次请求内单写多读，请求结束时
//! 必须 clear，避免串到复用线程上的下一个请求

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::principal::Principal;

/// 入站请求元信息，由边界层在进入核心前填好
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub remote_ip: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RequestMeta {
    pub fn new() -> Self {
        Self {
            headers: HashMap::new(),
            cookies: HashMap::new(),
            remote_ip: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.remote_ip = Some(ip.into());
        self
    }
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// 签发时生成的 Set-Cookie 指令，由边界层写回响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: i64,
}

/// 请求级访问上下文
pub struct AccessContext {
    meta: RequestMeta,
    principal: RwLock<Option<Principal>>,
    cookie: RwLock<Option<CookieDirective>>,
}

impl AccessContext {
    pub fn new(meta: RequestMeta) -> Self {
        Self {
            meta,
            principal: RwLock::new(None),
            cookie: RwLock::new(None),
        }
    }

    /// 读取请求头，名称不区分大小写
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta
            .headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cookie_value(&self, name: &str) -> Option<&str> {
        self.meta.cookies.get(name).map(String::as_str)
    }

    pub fn access_ip(&self) -> Option<&str> {
        self.meta.remote_ip.as_deref()
    }

    pub fn access_time(&self) -> DateTime<Utc> {
        self.meta.received_at
    }

    /// 发布已认证主体，一次请求内只有签发/校验方写入
    pub fn set_principal(&self, principal: Principal) {
        *self.principal.write() = Some(principal);
    }

    pub fn principal(&self) -> Option<Principal> {
        self.principal.read().clone()
    }

    pub fn set_cookie(&self, cookie: CookieDirective) {
        *self.cookie.write() = Some(cookie);
    }

    /// 取走待写回的 Set-Cookie 指令
    pub fn take_cookie(&self) -> Option<CookieDirective> {
        self.cookie.write().take()
    }

    /// 请求结束时清空，防止复用线程泄漏主体
    pub fn clear(&self) {
        *self.principal.write() = None;
        *self.cookie.write() = None;
    }
}
