/// ホスティング済み URL の割り当てコマンド
///
/// 外部ホスティングに既にある動画を、アップロードせずにコンテンツへ紐付けます。
use crate::api::PlatformApi;
use crate::commands::authenticated_platform;
use crate::commands::result::{AssignUrlResult, CommandResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result, bail};

pub async fn execute(content_id: &str, url: &str) -> Result<CommandResult> {
    let url = url.trim();
    check_url(url)?;

    let config = UserConfig::load().context("Failed to load configuration file")?;
    let platform = authenticated_platform(&config)?;

    let record = platform
        .assign_hosted_url(content_id, url)
        .await
        .with_context(|| format!("Failed to assign hosted URL to content {}", content_id))?;

    Ok(CommandResult::AssignUrl(AssignUrlResult {
        content_id: record.id,
        hosted_url: url.to_string(),
        storage_type: record.video.map(|video| video.storage_type),
    }))
}

fn check_url(url: &str) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        bail!("Hosted URL must start with http:// or https:// (got '{}')", url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_url() {
        assert!(check_url("https://vimeo.com/12345").is_ok());
        assert!(check_url("ftp://example.com/a.mp4").is_err());
        assert!(check_url("").is_err());
    }
}
