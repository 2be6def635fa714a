/// ログアウトコマンド
///
/// 保存されているアクセストークンを削除します。
use crate::commands::result::{CommandResult, LogoutResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// ログアウトコマンドを実行
pub async fn execute() -> Result<CommandResult> {
    let path = UserConfig::config_path().context("Failed to locate configuration file")?;
    logout_at(&path)
}

fn logout_at(path: &Path) -> Result<CommandResult> {
    let mut config = UserConfig::load_from(path).context("Failed to load configuration file")?;

    let was_logged_in = config.has_auth();
    if !was_logged_in {
        return Ok(CommandResult::Logout(LogoutResult { was_logged_in: false }));
    }

    config.clear_auth();
    config.save_to(path).context("Failed to save configuration file")?;

    Ok(CommandResult::Logout(LogoutResult { was_logged_in: true }))
}
