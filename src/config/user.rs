/// ユーザー設定モジュール
///
/// 実行時にユーザーディレクトリから読み込まれる動的設定を管理します。
/// Windows: C:\Users\<User>\AppData\Roaming\lessonup\config.toml
/// macOS:   /Users/<User>/Library/Application Support/lessonup/config.toml
/// Linux:   /home/<user>/.config/lessonup/config.toml
///
/// 初回起動時にデフォルト値から自動的にconfig.tomlを作成します。
use crate::config::APP_CONFIG;
use crate::config::error::ConfigError;
use crate::config::permissions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// デフォルトのログレベル
const DEFAULT_LOG_LEVEL: &str = "warn";

/// 受け付けるログレベル
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 認証設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// プラットフォームのアクセストークン（Bearer）
    pub access_token: String,
}

/// ユーザー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// 認証情報
    pub auth: Option<AuthConfig>,

    /// API エンドポイントの上書き（ステージング環境など）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    /// ログレベル（RUST_LOG が未設定の場合に使用）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            auth: None,
            api_endpoint: None,
            log_level: default_log_level(),
        }
    }
}

impl UserConfig {
    /// ユーザー設定ファイルのパスを取得
    ///
    /// # Errors
    /// 設定ディレクトリが取得できない場合に ConfigError::DirectoryNotFound を返します。
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .ok_or_else(|| ConfigError::directory_not_found("Failed to get user config directory"))
            .map(|config_dir| config_dir.join("lessonup").join("config.toml"))
    }

    /// 既定の場所からユーザー設定を読み込む
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスからユーザー設定を読み込む
    ///
    /// 設定ファイルが存在しない場合は、デフォルトテンプレートから自動的に作成します。
    /// 読み込み後、自動的に検証を実行します（Fail Fast）。
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to read config file: {}", config_path.display()),
                e,
            )
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ConfigError::parse_error(
                format!("Failed to parse config file ({})", config_path.display()),
                e,
            )
        })?;

        config.validate()?;

        Ok(config)
    }

    fn create_default_config(config_path: &Path) -> Result<(), ConfigError> {
        Self::ensure_parent(config_path)?;

        fs::write(config_path, Self::default_toml_content()).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to create default config file: {}", config_path.display()),
                e,
            )
        })
    }

    /// デフォルトTOML設定を生成
    fn default_toml_content() -> String {
        format!(
            r#"# lessonup - User Configuration
# The access token is stored with 'lessonup login'

# Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
log_level = "{}"

# Uncomment to point at another deployment
# api_endpoint = "{}"
"#,
            DEFAULT_LOG_LEVEL, APP_CONFIG.api.endpoint
        )
    }

    /// 既定の場所に保存する
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// 指定パスに保存し、所有者のみアクセス可能にする
    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        Self::ensure_parent(config_path)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::serialize_error("Failed to serialize config", e))?;

        fs::write(config_path, content).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to write config file: {}", config_path.display()),
                e,
            )
        })?;

        permissions::restrict_to_owner(config_path)
    }

    fn ensure_parent(config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::file_system(
                    format!("Failed to create config directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// ユーザー設定を検証
    ///
    /// # 検証内容
    /// - auth.access_token: 空文字列でないこと
    /// - api_endpoint: http(s) URL であること
    /// - log_level: 既知のレベルであること
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(auth) = &self.auth {
            if auth.access_token.trim().is_empty() {
                return Err(ConfigError::validation_error(
                    "Access token cannot be empty. Please run 'lessonup login' again.",
                ));
            }
        }

        if let Some(endpoint) = &self.api_endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(ConfigError::validation_error(format!(
                    "Invalid api_endpoint '{}'. It must start with http:// or https://",
                    endpoint
                )));
            }
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::validation_error(format!(
                "Invalid log_level '{}'. Expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// 実際に使用する API エンドポイント
    pub fn endpoint(&self) -> &str {
        self.api_endpoint
            .as_deref()
            .unwrap_or(APP_CONFIG.api.endpoint)
            .trim_end_matches('/')
    }

    pub fn set_auth(&mut self, access_token: String) {
        self.auth = Some(AuthConfig { access_token });
    }

    /// 認証情報を取得
    ///
    /// # Errors
    /// 認証情報が設定されていない場合に ConfigError::TokenNotFound を返します。
    pub fn get_auth(&self) -> Result<&AuthConfig, ConfigError> {
        self.auth.as_ref().ok_or_else(|| {
            ConfigError::token_not_found(
                "Access token not found. Please run 'lessonup login' first.",
            )
        })
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    pub fn clear_auth(&mut self) {
        self.auth = None;
    }
}
