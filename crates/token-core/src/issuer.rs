//! 令牌签发
//!
//! 每次签发都分配新的 access_id/refresh_id；refresh 记录按
//! (tenant, authType, username) 覆盖写，后写者生效

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::debug;
use warden_common::new_session_id;
use warden_config::{AccessConfig, TokenStoreMode};
use warden_errors::{AuthError, AuthResult};
use warden_ports::SessionStore;

use crate::claims::{AccessClaims, ClaimsCodec, ClaimsMap, RefreshClaims};
use crate::context::{AccessContext, CookieDirective};
use crate::interceptor::InterceptorChain;
use crate::principal::Principal;
use crate::session::{access_key, refresh_key, AccessRecord, RefreshRecord};

/// 一次签发产生的令牌对
///
/// refresh_token 只出现在签发响应里，不会被自动附加到请求上
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// 令牌签发器
#[derive(Clone)]
pub struct TokenIssuer {
    app_name: String,
    config: Arc<AccessConfig>,
    codec: Arc<ClaimsCodec>,
    store: Option<Arc<dyn SessionStore>>,
    interceptors: InterceptorChain,
}

impl TokenIssuer {
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

    pub(crate) fn codec(&self) -> Arc<ClaimsCodec> {
        self.codec.clone()
    }

    /// 签发 AccessToken
    ///
    /// 分配新 access_id，发布主体到请求上下文；开启服务端保存时
    /// 写入会话记录（TTL 与令牌有效期一致）；cookie 模式下生成
    /// Set-Cookie 指令
    pub async fn issue_access(
        &self,
        ctx: &AccessContext,
        principal: &mut Principal,
    ) -> AuthResult<String> {
        principal.access_id = new_session_id();
        principal.conflict = self.config.conflict;
        principal.access_ip = ctx.access_ip().map(str::to_string);
        principal.access_time = Some(ctx.access_time());
        if principal.login_time.is_none() {
            principal.login_ip = principal.access_ip.clone();
            principal.login_time = principal.access_time;
        }

        let issued_at = Utc::now();
        let claims = AccessClaims::from_principal(principal, issued_at, self.config.access_expire);
        let mut extra = ClaimsMap::new();
        self.interceptors.access_claims(&mut extra);
        let token = self.codec.encode_access(&claims, &extra)?;

        ctx.set_principal(principal.clone());

        if self.config.token_store == TokenStoreMode::Cookie {
            ctx.set_cookie(CookieDirective {
                name: self.config.token_name.clone(),
                value: token.clone(),
                path: "/".to_string(),
                max_age: self.config.access_expire,
            });
        }

        if self.config.access_store {
            if let Some(store) = &self.store {
                let expires_at =
                    issued_at + chrono::Duration::seconds(self.config.access_expire);
                let record = AccessRecord::from_principal(principal, issued_at, expires_at);
                let value = serde_json::to_string(&record).map_err(|e| {
                    AuthError::internal(format!("Failed to serialize access record: {}", e))
                })?;
                let key = access_key(
                    &self.app_name,
                    principal.tenant_id.as_deref(),
                    principal.auth_type,
                    &principal.username,
                    &principal.access_id,
                );
                store
                    .put_with_expiry(&key, &value, expire_secs(self.config.access_expire))
                    .await?;
            }
        }

        debug!(
            username = %principal.username,
            access_id = %principal.access_id,
            auth_type = %principal.auth_type,
            "access token issued"
        );
        Ok(token)
    }

    /// 签发 AccessToken + RefreshToken
    ///
    /// refresh 记录无条件覆盖同用户的旧记录；同一主体并发登录会
    /// 得到各自独立的 access 会话
    pub async fn issue_access_and_refresh(
        &self,
        ctx: &AccessContext,
        principal: &mut Principal,
    ) -> AuthResult<IssuedPair> {
        // 先分配 refresh_id 再签发 access 令牌，令牌携带的
        // Token.refresh 始终是存活记录里的那一个
        let refresh_id = new_session_id();
        principal.refresh_id = Some(refresh_id.clone());

        let access_token = self.issue_access(ctx, principal).await?;

        let issued_at = Utc::now();
        let claims = RefreshClaims {
            auth_type: principal.auth_type,
            refresh_id: refresh_id.clone(),
            conflict: principal.conflict,
            tenant_id: principal.tenant_id.clone(),
            username: principal.username.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + chrono::Duration::seconds(self.config.refresh_expire)).timestamp(),
        };
        let mut extra = ClaimsMap::new();
        self.interceptors.refresh_claims(&mut extra);
        let refresh_token = self.codec.encode_refresh(&claims, &extra)?;

        if let Some(store) = &self.store {
            let record = RefreshRecord::from_principal(principal, refresh_id);
            let value = serde_json::to_string(&record).map_err(|e| {
                AuthError::internal(format!("Failed to serialize refresh record: {}", e))
            })?;
            let key = refresh_key(
                &self.app_name,
                principal.tenant_id.as_deref(),
                principal.auth_type,
                &principal.username,
            );
            store
                .put_with_expiry(&key, &value, expire_secs(self.config.refresh_expire))
                .await?;
        }

        debug!(
            username = %principal.username,
            access_id = %principal.access_id,
            "access/refresh token pair issued"
        );
        Ok(IssuedPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_expire,
        })
    }
}

fn expire_secs(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}
