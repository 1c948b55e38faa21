//! Claims 拦截器
//!
//! 启动时按配置从注册表组装成显式调用链，替代运行期的反射查找；
//! 所有实现都是编译期已知的静态类型

use std::collections::HashMap;
use std::sync::Arc;

use warden_errors::{AuthError, AuthResult};

use crate::claims::ClaimsMap;
use crate::principal::Principal;

/// 自定义 claims 钩子
///
/// 附加 claims 不会覆盖标准字段；on_parse 可以做额外校验，
/// 返回错误即拒绝该令牌
pub trait ClaimsInterceptor: Send + Sync {
    /// 签发 AccessToken 时附加 claims
    fn access_claims(&self, _claims: &mut ClaimsMap) {}

    /// 签发 RefreshToken 时附加 claims
    fn refresh_claims(&self, _claims: &mut ClaimsMap) {}

    /// 解析通过后的额外校验
    fn on_parse(&self, _claims: &ClaimsMap, _principal: &mut Principal) -> AuthResult<()> {
        Ok(())
    }
}

/// 拦截器注册表，key 为配置中引用的名称
#[derive(Default)]
pub struct InterceptorRegistry {
    entries: HashMap<String, Arc<dyn ClaimsInterceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, interceptor: Arc<dyn ClaimsInterceptor>) {
        self.entries.insert(name.into(), interceptor);
    }

    /// 按配置的名称顺序组装调用链，未注册的名称视为配置错误
    pub fn build_chain(&self, names: &[String]) -> AuthResult<InterceptorChain> {
        let mut chain = Vec::with_capacity(names.len());
        for name in names {
            let interceptor = self
                .entries
                .get(name)
                .ok_or_else(|| AuthError::internal(format!("Unknown interceptor: {}", name)))?;
            chain.push(interceptor.clone());
        }
        Ok(InterceptorChain { chain })
    }
}

/// 组装好的拦截器调用链
#[derive(Clone, Default)]
pub struct InterceptorChain {
    chain: Vec<Arc<dyn ClaimsInterceptor>>,
}

impl InterceptorChain {
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn access_claims(&self, claims: &mut ClaimsMap) {
        for interceptor in &self.chain {
            interceptor.access_claims(claims);
        }
    }

    pub fn refresh_claims(&self, claims: &mut ClaimsMap) {
        for interceptor in &self.chain {
            interceptor.refresh_claims(claims);
        }
    }

    pub fn on_parse(&self, claims: &ClaimsMap, principal: &mut Principal) -> AuthResult<()> {
        for interceptor in &self.chain {
            interceptor.on_parse(claims, principal)?;
        }
        Ok(())
    }
}
