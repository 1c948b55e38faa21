//! 令牌校验
//!
//! 校验失败不会让调用方崩溃，全部以带标签的错误返回，由边界层
//! 翻译成对外响应

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::debug;
use warden_config::{AccessConfig, TokenStoreMode};
use warden_errors::{AuthError, AuthResult};
use warden_ports::SessionStore;

use crate::claims::{AccessClaims, ClaimsCodec, ClaimsMap};
use crate::context::AccessContext;
use crate::interceptor::InterceptorChain;
use crate::principal::Principal;
use crate::session::access_key;

const BEARER_PREFIX: &str = "Bearer ";

/// 令牌校验器
#[derive(Clone)]
pub struct TokenValidator {
    app_name: String,
    config: Arc<AccessConfig>,
    codec: Arc<ClaimsCodec>,
    store: Option<Arc<dyn SessionStore>>,
    interceptors: InterceptorChain,
}

impl TokenValidator {
    pub fn new(
        app_name: impl Into<String>,
        config: Arc<AccessConfig>,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        let codec = Arc::new(ClaimsCodec::new(
            config.access_secret.expose_secret(),
            config.refresh_secret.expose_secret(),
        ));
        Self {
            app_name: app_name.into(),
            config,
            codec,
            store,
            interceptors: InterceptorChain::default(),
        }
    }

    pub fn with_interceptors(mut self, interceptors: InterceptorChain) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// 按 token_store 配置从请求头或 Cookie 提取令牌
    fn extract(&self, ctx: &AccessContext) -> Option<String> {
        let raw = match self.config.token_store {
            TokenStoreMode::Cookie => ctx.cookie_value(&self.config.token_name),
            TokenStoreMode::Header => ctx.header(&self.config.token_name),
        }?;
        let raw = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }

    /// 解析 AccessToken
    ///
    /// 未携带令牌返回 NoToken；签名/有效期都正常但服务端记录已
    /// 不存在时返回 Denied，这是吊销在令牌自身过期前生效的机制
    pub async fn parse_access(&self, ctx: &AccessContext) -> AuthResult<Principal> {
        let raw = self.extract(ctx).ok_or(AuthError::NoToken)?;
        self.parse_access_token(ctx, &raw).await
    }

    /// 解析给定的 AccessToken 字符串
    pub async fn parse_access_token(
        &self,
        ctx: &AccessContext,
        raw: &str,
    ) -> AuthResult<Principal> {
        let (claims, raw_claims) = self.codec.decode_access(raw)?;
        self.finish_parse(ctx, claims, raw_claims).await
    }

    /// 解析 AccessToken 并校验 IP 绑定
    ///
    /// 冲突标记的令牌来源 IP 与签发 IP 不一致时返回 IpChanged；
    /// 未开启冲突检测的令牌不受影响
    pub async fn parse_access_pinned(&self, ctx: &AccessContext) -> AuthResult<Principal> {
        let raw = self.extract(ctx).ok_or(AuthError::NoToken)?;
        let (claims, raw_claims) = self.codec.decode_access(&raw)?;
        if claims.conflict && claims.access_ip.as_deref() != ctx.access_ip() {
            debug!(
                username = %claims.username,
                token_ip = ?claims.access_ip,
                request_ip = ?ctx.access_ip(),
                "access token ip changed"
            );
            return Err(AuthError::IpChanged);
        }
        self.finish_parse(ctx, claims, raw_claims).await
    }

    async fn finish_parse(
        &self,
        ctx: &AccessContext,
        claims: AccessClaims,
        raw_claims: ClaimsMap,
    ) -> AuthResult<Principal> {
        let mut principal = claims.into_principal();

        // 服务端校验：记录不存在说明会话已被吊销
        if self.config.access_check {
            if let Some(store) = &self.store {
                let key = access_key(
                    &self.app_name,
                    principal.tenant_id.as_deref(),
                    principal.auth_type,
                    &principal.username,
                    &principal.access_id,
                );
                if store.get(&key).await?.is_none() {
                    debug!(
                        username = %principal.username,
                        access_id = %principal.access_id,
                        "access token denied: no session record"
                    );
                    return Err(AuthError::Denied);
                }
            }
        }

        self.interceptors.on_parse(&raw_claims, &mut principal)?;

        ctx.set_principal(principal.clone());
        Ok(principal)
    }

    /// 快速探测令牌是否结构完整且签名有效
    pub fn valid_access(&self, raw: &str) -> bool {
        let raw = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw);
        !raw.is_empty() && self.codec.decode_access(raw).is_ok()
    }
}
