/// 設定ファイルのパーミッション管理
///
/// アクセストークンを含む config.toml を所有者のみが読み書きできるようにします。
///
/// Unix系 (Linux, macOS): 0600 (rw-------)
/// その他: 既定のACLに任せる
use crate::config::error::ConfigError;
use std::path::Path;

/// トークンを保持するファイルを所有者専用にする
///
/// # Errors
/// ファイルが存在しない場合、またはパーミッション設定に失敗した場合に ConfigError を返します。
pub fn restrict_to_owner(file_path: &Path) -> Result<(), ConfigError> {
    if !file_path.is_file() {
        return Err(ConfigError::file_system(
            format!("Config file not found: {}", file_path.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "File does not exist"),
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file_path, std::fs::Permissions::from_mode(0o600)).map_err(
            |e| {
                ConfigError::file_system(
                    format!("Failed to restrict permissions (0600) on {}", file_path.display()),
                    e,
                )
            },
        )
    }

    #[cfg(not(unix))]
    {
        // Windows のユーザープロファイル配下は既定で本人のみアクセス可能
        Ok(())
    }
}
