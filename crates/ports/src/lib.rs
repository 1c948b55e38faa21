//! warden-ports - 抽象 trait 层
//!
//! 定义会话存储的抽象接口

mod session_store;

pub use session_store::*;
