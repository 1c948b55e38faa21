//! 令牌轮换状态机
//!
//! ACTIVE → ROTATING → (ACTIVE' | REVOKED | EXPIRED)
//!
//! 不持有任何进程内锁；并发轮换的正确性依赖存储后端单 key
//! 读写的原子性。开启冲突检测时，同一 refresh 令牌的两次并发
//! 轮换恰有一次成功，另一次读到已被改写的记录后以 Conflict 失败
//! ——这是要求的行为，不是缺陷。未开启时两次都成功，后写者生效

use std::sync::Arc;

use tracing::{info, warn};
use warden_config::AccessConfig;
use warden_errors::{AuthError, AuthResult};
use warden_ports::SessionStore;

use crate::claims::ClaimsCodec;
use crate::context::AccessContext;
use crate::interceptor::InterceptorChain;
use crate::issuer::{IssuedPair, TokenIssuer};
use crate::principal::Principal;
use crate::session::{access_key, refresh_key, RefreshRecord};
use crate::validator::TokenValidator;

/// 令牌轮换协调器
///
/// 轮换是"必须成功"路径：会话记录缺失是安全事实而非瞬时故障，
/// 直接要求重新认证，不做重试
#[derive(Clone)]
pub struct RefreshCoordinator {
    app_name: String,
    config: Arc<AccessConfig>,
    codec: Arc<ClaimsCodec>,
    store: Arc<dyn SessionStore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl RefreshCoordinator {
    pub fn new(
        app_name: impl Into<String>,
        config: Arc<AccessConfig>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let app_name = app_name.into();
        let issuer = TokenIssuer::new(app_name.clone(), config.clone(), Some(store.clone()));
        let validator = TokenValidator::new(app_name.clone(), config.clone(), Some(store.clone()));
        let codec = issuer.codec();
        Self {
            app_name,
            config,
            codec,
            store,
            issuer,
            validator,
        }
    }

    pub fn with_interceptors(mut self, interceptors: InterceptorChain) -> Self {
        self.issuer = self.issuer.with_interceptors(interceptors.clone());
        self.validator = self.validator.with_interceptors(interceptors);
        self
    }

    /// 只轮换 AccessToken，RefreshToken 不变
    ///
    /// 先解析当前令牌（开启服务端校验时同样要求会话记录存在，
    /// 与双令牌轮换路径保持一致），删除旧会话记录后用新的
    /// access_id/IP/时间重新签发
    pub async fn refresh_access(&self, ctx: &AccessContext) -> AuthResult<String> {
        let mut principal = self.validator.parse_access(ctx).await?;

        if self.config.access_store {
            let old_key = access_key(
                &self.app_name,
                principal.tenant_id.as_deref(),
                principal.auth_type,
                &principal.username,
                &principal.access_id,
            );
            self.store.delete(&[old_key]).await?;
        }

        let token = self.issuer.issue_access(ctx, &mut principal).await?;
        info!(
            username = %principal.username,
            access_id = %principal.access_id,
            "access token rotated"
        );
        Ok(token)
    }

    /// 用 RefreshToken 轮换出新的 access/refresh 令牌对
    ///
    /// 记录缺失返回 NoSession；冲突检测开启且 refresh_id 与记录
    /// 不一致返回 Conflict（令牌已被更早的轮换消费，重放/盗用）
    pub async fn refresh_access_and_refresh(
        &self,
        ctx: &AccessContext,
        refresh_token: &str,
    ) -> AuthResult<(Principal, IssuedPair)> {
        let claims = self.codec.decode_refresh(refresh_token)?;

        let record_key = refresh_key(
            &self.app_name,
            claims.tenant_id.as_deref(),
            claims.auth_type,
            &claims.username,
        );
        let raw = self
            .store
            .get(&record_key)
            .await?
            .ok_or(AuthError::NoSession)?;
        let record: RefreshRecord = serde_json::from_str(&raw)
            .map_err(|e| AuthError::internal(format!("Bad refresh record: {}", e)))?;

        // 比对 id，判断令牌是否已经被轮换消费过
        if claims.conflict && claims.refresh_id != record.refresh_id {
            warn!(
                username = %claims.username,
                auth_type = %claims.auth_type,
                "refresh token replay detected"
            );
            return Err(AuthError::Conflict);
        }

        // 旧 AccessToken 的会话记录失效
        if self.config.access_store {
            let old_access_key = access_key(
                &self.app_name,
                record.tenant_id.as_deref(),
                record.auth_type,
                &record.username,
                &record.access_id,
            );
            self.store.delete(&[old_access_key]).await?;
        }

        let mut principal = record.into_principal();
        let pair = self
            .issuer
            .issue_access_and_refresh(ctx, &mut principal)
            .await?;

        info!(
            username = %principal.username,
            access_id = %principal.access_id,
            "access/refresh token pair rotated"
        );
        Ok((principal, pair))
    }
}
