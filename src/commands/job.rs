/// ジョブ照会コマンド
///
/// サーバー側アップロードジョブの状態を1回だけ取得します。
/// ポーラーと同じく、404 はまだ作成されていないジョブ（queued）として扱います。
use crate::api::PlatformApi;
use crate::api::types::{JobSnapshot, RemoteStatus};
use crate::commands::authenticated_platform;
use crate::commands::result::{CommandResult, JobResult};
use crate::config::user::UserConfig;
use anyhow::{Context, Result};

pub async fn execute(job_id: &str) -> Result<CommandResult> {
    let config = UserConfig::load().context("Failed to load configuration file")?;
    let platform = authenticated_platform(&config)?;
    fetch(&platform, job_id).await
}

async fn fetch<A: PlatformApi + ?Sized>(api: &A, job_id: &str) -> Result<CommandResult> {
    let (snapshot, not_yet_created) = match api.fetch_job(job_id).await {
        Ok(snapshot) => (snapshot, false),
        Err(e) if e.is_not_found() => (
            JobSnapshot {
                status: RemoteStatus::Queued,
                percent: None,
                bytes_uploaded: None,
                total_bytes: None,
                error: None,
            },
            true,
        ),
        Err(e) => return Err(e).with_context(|| format!("Failed to fetch upload job {}", job_id)),
    };

    Ok(CommandResult::Job(JobResult {
        job_id: job_id.to_string(),
        not_yet_created,
        snapshot,
    }))
}
