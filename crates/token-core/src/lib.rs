//! warden-token-core - 令牌生命周期核心库
//!
//! 签发/校验/轮换/吊销带签名的 bearer 凭证，配合服务端会话存储
//! 实现对无状态令牌的集中控制（吊销、冲突检测、IP 绑定）

pub mod claims;
pub mod context;
pub mod interceptor;
pub mod issuer;
pub mod principal;
pub mod refresh;
pub mod registry;
pub mod session;
pub mod validator;

pub use claims::*;
pub use context::*;
pub use interceptor::*;
pub use issuer::*;
pub use principal::*;
pub use refresh::*;
pub use registry::*;
pub use session::*;
pub use validator::*;
