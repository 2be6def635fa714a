/// ログインコマンド
///
/// プラットフォームのアクセストークンを検証し、config.toml に保存します。
/// 検証はストレージ設定の取得（認証が必要なエンドポイント）で行います。
use crate::api::PlatformApi;
use crate::commands::platform_with_token;
use crate::commands::result::{CommandResult, LoginResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result};
use tracing::info;

/// ログイン情報
///
/// プレゼンテーション層（input）で取得され、このコマンドに渡されます。
#[derive(Debug)]
pub struct LoginCredentials {
    pub access_token: String,
}

/// ログインコマンドを実行
pub async fn execute(credentials: LoginCredentials) -> Result<CommandResult> {
    let mut config = UserConfig::load().context("Failed to load configuration file")?;
    let was_logged_in = config.has_auth();

    let platform = platform_with_token(&config, credentials.access_token.clone())?;
    let storage = platform
        .fetch_storage_config()
        .await
        .context("Authentication failed. Please verify your access token is correct.")?;
    info!(?storage, "Access token verified");

    config.set_auth(credentials.access_token);
    config.save().context("Failed to save configuration file")?;

    Ok(CommandResult::Login(LoginResult { was_logged_in }))
}
