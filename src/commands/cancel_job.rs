/// ジョブのキャンセル要求コマンド
///
/// 別の端末で進行中のアップロードジョブに対して、リモートのキャンセルを要求します。
/// アップロード中の Ctrl-C とは異なり、失敗はエラーとして報告します。
use crate::api::PlatformApi;
use crate::commands::authenticated_platform;
use crate::commands::result::{CancelJobResult, CommandResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result};

pub async fn execute(job_id: &str) -> Result<CommandResult> {
    let config = UserConfig::load().context("Failed to load configuration file")?;
    let platform = authenticated_platform(&config)?;

    platform
        .cancel_job(job_id)
        .await
        .with_context(|| format!("Failed to cancel upload job {}", job_id))?;

    Ok(CommandResult::CancelJob(CancelJobResult {
        job_id: job_id.to_string(),
    }))
}
