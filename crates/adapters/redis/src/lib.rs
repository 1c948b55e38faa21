//! warden-adapter-redis - Redis 会话存储适配器

mod store;

pub use store::*;
