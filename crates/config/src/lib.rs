//! warden-config - 配置加载库

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 令牌携带方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreMode {
    /// 从请求头读取（可带 "Bearer " 前缀）
    #[default]
    Header,
    /// 从命名 Cookie 读取，签发时回写 Set-Cookie
    Cookie,
}

/// 访问鉴权配置
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// AccessToken 签名密钥
    pub access_secret: Secret<String>,
    /// RefreshToken 签名密钥，独立于 access_secret
    pub refresh_secret: Secret<String>,
    /// AccessToken 有效期（秒）
    #[serde(default = "default_access_expire")]
    pub access_expire: i64,
    /// RefreshToken 有效期（秒）
    #[serde(default = "default_refresh_expire")]
    pub refresh_expire: i64,
    /// 是否开启冲突检测（刷新重放拒绝 + IP 绑定）
    #[serde(default)]
    pub conflict: bool,
    /// 是否在服务端保存 AccessToken 会话记录
    #[serde(default)]
    pub access_store: bool,
    /// 解析时是否校验服务端会话记录
    #[serde(default)]
    pub access_check: bool,
    /// 令牌携带方式
    #[serde(default)]
    pub token_store: TokenStoreMode,
    /// 请求头/Cookie 名称
    #[serde(default = "default_token_name")]
    pub token_name: String,
    /// 启用的 claims 拦截器名称，按顺序组成调用链
    #[serde(default)]
    pub interceptors: Vec<String>,
}

fn default_access_expire() -> i64 {
    3600
}

fn default_refresh_expire() -> i64 {
    3600 * 24 * 7
}

fn default_token_name() -> String {
    "Authorization".to_string()
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 应用名，作为所有存储 key 的首段
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub access: AccessConfig,
    pub redis: Option<RedisConfig>,
    #[serde(default = "default_telemetry")]
    pub telemetry: TelemetryConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_telemetry() -> TelemetryConfig {
    TelemetryConfig {
        log_level: default_log_level(),
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("WARDEN_").split("_"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
