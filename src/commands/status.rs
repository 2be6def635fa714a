/// ステータスコマンド
///
/// 保存済みのトークンでプラットフォーム API にアクセスできるか（ログイン状態か）を確認します。
use crate::api::PlatformApi;
use crate::api::auth::AuthManager;
use crate::commands::authenticated_platform;
use crate::commands::result::{CommandResult, StatusResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result};
use tracing::warn;

/// ステータスコマンドを実行
pub async fn execute() -> Result<CommandResult> {
    let config = UserConfig::load().context("Failed to load configuration file")?;
    let endpoint = config.endpoint().to_string();

    if !config.has_auth() {
        return Ok(CommandResult::Status(StatusResult {
            is_authenticated: false,
            token: None,
            endpoint,
            storage: None,
        }));
    }

    let auth = config
        .get_auth()
        .context("Failed to retrieve authentication credentials")?;
    let masked = AuthManager::new(auth.access_token.clone()).get_masked_token();
    let platform = authenticated_platform(&config)?;

    let storage = match platform.fetch_storage_config().await {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!(error = %e, "Stored access token was rejected");
            None
        }
    };

    Ok(CommandResult::Status(StatusResult {
        is_authenticated: storage.is_some(),
        token: Some(masked),
        endpoint,
        storage,
    }))
}
