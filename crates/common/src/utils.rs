//! 通用工具函数

use uuid::Uuid;

/// 生成会话 id（无连字符的随机 UUID）
///
/// 每次签发/轮换都必须调用，保证 access_id/refresh_id 唯一
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert_ne!(id, new_session_id());
    }
}
