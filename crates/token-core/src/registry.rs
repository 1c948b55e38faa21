//! 会话登记簿
//!
//! 面向管理端的会话列表与批量吊销。列表是一次前缀扫描加一次
//! 批量读取，吊销同理，不做 N 次顺序往返

use std::sync::Arc;

use tracing::info;
use warden_common::AuthType;
use warden_errors::{AuthError, AuthResult};
use warden_ports::SessionStore;

use crate::session::{
    access_key, refresh_key, tenant_access_pattern, tenant_refresh_pattern, user_access_pattern,
    AccessRecord, RefreshRecord, SessionIdentity,
};

/// 会话登记簿
#[derive(Clone)]
pub struct SessionRegistry {
    app_name: String,
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    pub fn new(app_name: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            app_name: app_name.into(),
            store,
        }
    }

    /// 列出租户下所有未过期的 access 会话
    pub async fn list_access_sessions(&self, tenant: Option<&str>) -> AuthResult<Vec<AccessRecord>> {
        let pattern = tenant_access_pattern(&self.app_name, tenant);
        let keys = self.store.scan_keys(&pattern).await?;
        let values = self.store.bulk_get(&keys).await?;
        // 扫描和读取之间过期的记录返回 None，直接跳过
        values
            .into_iter()
            .flatten()
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AuthError::internal(format!("Bad access record: {}", e)))
            })
            .collect()
    }

    /// 列出租户下所有未过期的 refresh 会话
    pub async fn list_refresh_sessions(
        &self,
        tenant: Option<&str>,
    ) -> AuthResult<Vec<RefreshRecord>> {
        let pattern = tenant_refresh_pattern(&self.app_name, tenant);
        let keys = self.store.scan_keys(&pattern).await?;
        let values = self.store.bulk_get(&keys).await?;
        values
            .into_iter()
            .flatten()
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AuthError::internal(format!("Bad refresh record: {}", e)))
            })
            .collect()
    }

    /// 吊销单个 access 会话，返回被吊销的记录
    pub async fn revoke_access(
        &self,
        tenant: Option<&str>,
        auth_type: AuthType,
        username: &str,
        access_id: &str,
    ) -> AuthResult<AccessRecord> {
        let key = access_key(&self.app_name, tenant, auth_type, username, access_id);
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("access session {}", access_id)))?;
        let record: AccessRecord = serde_json::from_str(&raw)
            .map_err(|e| AuthError::internal(format!("Bad access record: {}", e)))?;
        self.store.delete(&[key]).await?;
        info!(username, access_id, "access session revoked");
        Ok(record)
    }

    /// 全端退出：删除 refresh 记录，并批量删除该用户全部 access 记录
    pub async fn revoke_all_refresh(
        &self,
        tenant: Option<&str>,
        auth_type: AuthType,
        username: &str,
    ) -> AuthResult<Option<RefreshRecord>> {
        let record_key = refresh_key(&self.app_name, tenant, auth_type, username);
        let record = match self.store.get(&record_key).await? {
            Some(raw) => Some(
                serde_json::from_str::<RefreshRecord>(&raw)
                    .map_err(|e| AuthError::internal(format!("Bad refresh record: {}", e)))?,
            ),
            None => None,
        };

        let pattern = user_access_pattern(&self.app_name, tenant, auth_type, username);
        let mut keys = self.store.scan_keys(&pattern).await?;
        keys.push(record_key);
        self.store.delete(&keys).await?;

        info!(username, %auth_type, "all sessions revoked");
        Ok(record)
    }

    /// 退出当前会话：删除自己的 access 记录和 refresh 记录
    pub async fn revoke_session(&self, identity: &SessionIdentity) -> AuthResult<()> {
        let keys = vec![
            access_key(
                &self.app_name,
                identity.tenant_id.as_deref(),
                identity.auth_type,
                &identity.username,
                &identity.access_id,
            ),
            refresh_key(
                &self.app_name,
                identity.tenant_id.as_deref(),
                identity.auth_type,
                &identity.username,
            ),
        ];
        self.store.delete(&keys).await?;
        info!(
            username = %identity.username,
            access_id = %identity.access_id,
            "session logged out"
        );
        Ok(())
    }
}
