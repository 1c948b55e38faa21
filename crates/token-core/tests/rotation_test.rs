//! 令牌轮换状态机测试

mod support;

use warden_common::AuthType;
use warden_errors::AuthError;
use warden_ports::SessionStore;
use warden_token_core::{access_key, refresh_key, RefreshRecord};

use support::{access_config, alice, build_env, ctx_with_ip, ctx_with_token, tracked_config, APP};

#[tokio::test]
async fn test_full_rotation_scenario() {
    // alice@t1，access 3600s + refresh 604800s
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();
    let first_access_id = principal.access_id.clone();
    let first_refresh_id = principal.refresh_id.clone().unwrap();

    let old_access_key = access_key(APP, Some("t1"), AuthType::User, "alice", &first_access_id);
    assert!(env.store.get(&old_access_key).await.unwrap().is_some());

    // 轮换一次
    let (rotated, new_pair) = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.refresh_token)
        .await
        .unwrap();

    assert_ne!(rotated.access_id, first_access_id);
    assert_ne!(rotated.refresh_id.clone().unwrap(), first_refresh_id);
    assert_ne!(new_pair.refresh_token, pair.refresh_token);

    // 旧 access 记录已删除，新记录存在
    assert!(env.store.get(&old_access_key).await.unwrap().is_none());
    let new_access_key = access_key(APP, Some("t1"), AuthType::User, "alice", &rotated.access_id);
    assert!(env.store.get(&new_access_key).await.unwrap().is_some());

    // refresh 记录被覆盖成新 id
    let record_key = refresh_key(APP, Some("t1"), AuthType::User, "alice");
    let raw = env.store.get(&record_key).await.unwrap().unwrap();
    let record: RefreshRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.refresh_id, rotated.refresh_id.clone().unwrap());
    assert_eq!(record.access_id, rotated.access_id);

    // 重放最初的 refresh 令牌：已被消费，Conflict
    let replay = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.3"), &pair.refresh_token)
        .await;
    assert!(matches!(replay, Err(AuthError::Conflict)));
}

#[tokio::test]
async fn test_access_token_carries_live_refresh_id() {
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();
    let record_key = refresh_key(APP, Some("t1"), AuthType::User, "alice");

    // 登录后 access 令牌里的 refresh_id 与存活记录一致
    let parsed = env
        .validator
        .parse_access(&ctx_with_token(&pair.access_token))
        .await
        .unwrap();
    let raw = env.store.get(&record_key).await.unwrap().unwrap();
    let record: RefreshRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.refresh_id.as_deref(), Some(record.refresh_id.as_str()));

    // 轮换后新 access 令牌携带的仍是覆盖写后的那一个
    let (_, new_pair) = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.refresh_token)
        .await
        .unwrap();
    let parsed = env
        .validator
        .parse_access(&ctx_with_token(&new_pair.access_token))
        .await
        .unwrap();
    let raw = env.store.get(&record_key).await.unwrap().unwrap();
    let record: RefreshRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.refresh_id.as_deref(), Some(record.refresh_id.as_str()));
}

#[tokio::test]
async fn test_concurrent_rotation_exactly_one_wins() {
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    let ctx_a = ctx_with_ip("10.0.0.2");
    let ctx_b = ctx_with_ip("10.0.0.3");
    let (a, b) = tokio::join!(
        env.coordinator
            .refresh_access_and_refresh(&ctx_a, &pair.refresh_token),
        env.coordinator
            .refresh_access_and_refresh(&ctx_b, &pair.refresh_token),
    );

    // 恰有一个成功，另一个读到已改写的记录后 Conflict
    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if outcomes[0] { b } else { a };
    assert!(matches!(loser, Err(AuthError::Conflict)));
}

#[tokio::test]
async fn test_loose_mode_allows_both_rotations() {
    // conflict=false：宽松模式，后写者生效
    let mut config = access_config();
    config.access_store = true;
    let env = build_env(config);
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    env.coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.refresh_token)
        .await
        .unwrap();
    env.coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.3"), &pair.refresh_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rotation_after_logout_everywhere_is_no_session() {
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    env.registry
        .revoke_all_refresh(Some("t1"), AuthType::User, "alice")
        .await
        .unwrap();

    // 旧 refresh 令牌轮换：记录已删除
    let result = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.refresh_token)
        .await;
    assert!(matches!(result, Err(AuthError::NoSession)));

    // 旧 access 令牌解析：服务端校验拒绝
    let parse = env
        .validator
        .parse_access(&ctx_with_token(&pair.access_token))
        .await;
    assert!(matches!(parse, Err(AuthError::Denied)));
}

#[tokio::test]
async fn test_access_only_rotation_keeps_refresh() {
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();
    let first_access_id = principal.access_id.clone();
    let first_refresh_id = principal.refresh_id.clone().unwrap();

    let rotate_ctx = ctx_with_token(&pair.access_token);
    let new_token = env.coordinator.refresh_access(&rotate_ctx).await.unwrap();
    assert_ne!(new_token, pair.access_token);

    // 旧 access 记录删除，新记录存在
    let old_key = access_key(APP, Some("t1"), AuthType::User, "alice", &first_access_id);
    assert!(env.store.get(&old_key).await.unwrap().is_none());
    let rotated = rotate_ctx.principal().unwrap();
    let new_key = access_key(APP, Some("t1"), AuthType::User, "alice", &rotated.access_id);
    assert!(env.store.get(&new_key).await.unwrap().is_some());

    // refresh 记录原样保留
    let record_key = refresh_key(APP, Some("t1"), AuthType::User, "alice");
    let raw = env.store.get(&record_key).await.unwrap().unwrap();
    let record: RefreshRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.refresh_id, first_refresh_id);

    // 新令牌可正常解析
    env.validator
        .parse_access(&ctx_with_token(&new_token))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_access_only_rotation_requires_live_session() {
    // 已吊销的会话不能借 access-only 路径复活
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    env.registry
        .revoke_access(Some("t1"), AuthType::User, "alice", &principal.access_id)
        .await
        .unwrap();

    let result = env
        .coordinator
        .refresh_access(&ctx_with_token(&pair.access_token))
        .await;
    assert!(matches!(result, Err(AuthError::Denied)));
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let mut config = tracked_config();
    config.refresh_expire = -60;
    let env = build_env(config);
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    let result = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.refresh_token)
        .await;
    assert!(matches!(result, Err(AuthError::Expired)));
}

#[tokio::test]
async fn test_rotation_with_forged_refresh_token() {
    let env = build_env(tracked_config());
    let mut principal = alice();
    let pair = env
        .issuer
        .issue_access_and_refresh(&ctx_with_ip("10.0.0.1"), &mut principal)
        .await
        .unwrap();

    // access 令牌不能当 refresh 令牌用：密钥独立，验签失败
    let result = env
        .coordinator
        .refresh_access_and_refresh(&ctx_with_ip("10.0.0.2"), &pair.access_token)
        .await;
    assert!(matches!(result, Err(AuthError::Invalid(_))));
}
