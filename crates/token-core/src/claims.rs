//! Claims 编解码
//!
//! HS512 签名的三段式令牌；access 与 refresh 使用各自独立的密钥，
//! 泄露 refresh 密钥无法伪造 access 令牌。解码错误区分
//! Expired / Invalid / Malformed，下游按类型给出不同提示

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_common::AuthType;
use warden_errors::{AuthError, AuthResult};

use crate::principal::Principal;

/// 附加 claims 的载体
pub type ClaimsMap = serde_json::Map<String, Value>;

/// conflict 标记在载荷里写作 "Y"/"N"
mod yn {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Y" } else { "N" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s == "Y")
    }
}

/// AccessToken claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "Token.type")]
    pub auth_type: AuthType,
    #[serde(rename = "Token.access")]
    pub access_id: String,
    #[serde(rename = "Token.refresh", default, skip_serializing_if = "Option::is_none")]
    pub refresh_id: Option<String>,
    #[serde(rename = "Token.conflict", with = "yn")]
    pub conflict: bool,
    #[serde(rename = "Token.ip", default, skip_serializing_if = "Option::is_none")]
    pub access_ip: Option<String>,
    #[serde(rename = "Tenant.id", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(rename = "User.id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(rename = "User.code", default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    #[serde(rename = "User.properties", default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, Value>,
    #[serde(rename = "User.name", default, skip_serializing_if = "Option::is_none")]
    pub user_nick: Option<String>,
    #[serde(rename = "User.account")]
    pub username: String,
    #[serde(rename = "User.role", default)]
    pub roles: Vec<String>,
    #[serde(rename = "User.permission", default)]
    pub permissions: Vec<String>,
    #[serde(rename = "Dept.id", default, skip_serializing_if = "Option::is_none")]
    pub dept_id: Option<i64>,
    #[serde(rename = "Dept.code", default, skip_serializing_if = "Option::is_none")]
    pub dept_code: Option<String>,
    #[serde(rename = "Dept.name", default, skip_serializing_if = "Option::is_none")]
    pub dept_name: Option<String>,
    #[serde(rename = "Cluster.id", default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<i32>,
    #[serde(rename = "Cluster.level", default, skip_serializing_if = "Option::is_none")]
    pub cluster_level: Option<i32>,
    #[serde(rename = "Cluster.name", default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    pub fn from_principal(principal: &Principal, issued_at: DateTime<Utc>, ttl_secs: i64) -> Self {
        Self {
            auth_type: principal.auth_type,
            access_id: principal.access_id.clone(),
            refresh_id: principal.refresh_id.clone(),
            conflict: principal.conflict,
            access_ip: principal.access_ip.clone(),
            tenant_id: principal.tenant_id.clone(),
            user_id: principal.user_id,
            user_code: principal.user_code.clone(),
            properties: principal.properties.clone(),
            user_nick: principal.user_nick.clone(),
            username: principal.username.clone(),
            roles: principal.roles.clone(),
            permissions: principal.permissions.clone(),
            dept_id: principal.dept_id,
            dept_code: principal.dept_code.clone(),
            dept_name: principal.dept_name.clone(),
            cluster_id: principal.cluster_id,
            cluster_level: principal.cluster_level,
            cluster_name: principal.cluster_name.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(ttl_secs)).timestamp(),
        }
    }

    pub fn into_principal(self) -> Principal {
        let mut principal = Principal::new(self.auth_type, self.username);
        principal.tenant_id = self.tenant_id;
        principal.user_nick = self.user_nick;
        principal.user_id = self.user_id;
        principal.user_code = self.user_code;
        principal.properties = self.properties;
        principal.roles = self.roles;
        principal.permissions = self.permissions;
        principal.dept_id = self.dept_id;
        principal.dept_code = self.dept_code;
        principal.dept_name = self.dept_name;
        principal.cluster_id = self.cluster_id;
        principal.cluster_level = self.cluster_level;
        principal.cluster_name = self.cluster_name;
        principal.conflict = self.conflict;
        principal.access_id = self.access_id;
        principal.refresh_id = self.refresh_id;
        principal.access_ip = self.access_ip;
        principal
    }
}

/// RefreshToken claims，只携带重建会话所需的身份字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "Token.type")]
    pub auth_type: AuthType,
    #[serde(rename = "Token.refresh")]
    pub refresh_id: String,
    #[serde(rename = "Token.conflict", with = "yn")]
    pub conflict: bool,
    #[serde(rename = "Tenant.id", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(rename = "User.account")]
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims 编解码器
#[derive(Clone)]
pub struct ClaimsCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            validation,
        }
    }

    /// 签发 AccessToken，extra 为拦截器附加的 claims，不覆盖标准字段
    pub fn encode_access(&self, claims: &AccessClaims, extra: &ClaimsMap) -> AuthResult<String> {
        let payload = merge_claims(claims, extra)?;
        encode(&Header::new(Algorithm::HS512), &payload, &self.access_encoding)
            .map_err(|e| AuthError::internal(format!("Failed to sign access token: {}", e)))
    }

    /// 解码 AccessToken，返回结构化 claims 和原始载荷
    pub fn decode_access(&self, token: &str) -> AuthResult<(AccessClaims, ClaimsMap)> {
        let data = decode::<Value>(token, &self.access_decoding, &self.validation)
            .map_err(map_decode_error)?;
        let raw = match data.claims {
            Value::Object(map) => map,
            _ => return Err(AuthError::malformed("claims payload is not an object")),
        };
        let claims: AccessClaims = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| AuthError::malformed(format!("bad access claims: {}", e)))?;
        Ok((claims, raw))
    }

    /// 签发 RefreshToken，使用独立密钥
    pub fn encode_refresh(&self, claims: &RefreshClaims, extra: &ClaimsMap) -> AuthResult<String> {
        let payload = merge_claims(claims, extra)?;
        encode(&Header::new(Algorithm::HS512), &payload, &self.refresh_encoding)
            .map_err(|e| AuthError::internal(format!("Failed to sign refresh token: {}", e)))
    }

    pub fn decode_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map_err(map_decode_error)?;
        Ok(data.claims)
    }
}

fn merge_claims<T: Serialize>(claims: &T, extra: &ClaimsMap) -> AuthResult<Value> {
    let mut value = serde_json::to_value(claims)
        .map_err(|e| AuthError::internal(format!("Failed to serialize claims: {}", e)))?;
    if let Value::Object(map) = &mut value {
        for (key, extra_value) in extra {
            map.entry(key.clone()).or_insert_with(|| extra_value.clone());
        }
    }
    Ok(value)
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::malformed(e.to_string()),
        _ => AuthError::invalid(e.to_string()),
    }
}
