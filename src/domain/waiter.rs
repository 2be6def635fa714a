/// 完了待ち（ローカル保存の動画のみ）
///
/// サーバーが動画の長さを抽出し終えるまでコンテンツのメタデータを繰り返し取得する。
/// 正の長さが得られた時点で成功し、上限回数に達したら `ProcessingTimeout`。
use crate::api::PlatformApi;
use crate::config::APP_CONFIG;
use crate::domain::error::DomainError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionWaiter {
    interval: Duration,
    max_attempts: u32,
}

impl Default for CompletionWaiter {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(APP_CONFIG.processing.interval_ms),
            APP_CONFIG.processing.max_attempts,
        )
    }
}

impl CompletionWaiter {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// 長さが得られるまで待ち、その値（秒）を返す
    ///
    /// 各試行の前に `interval` だけ待つ。`cancel` が発火したら `TransferAborted`。
    pub async fn wait_for_duration<A: PlatformApi + ?Sized>(
        &self,
        api: &A,
        content_id: &str,
        cancel: &CancellationToken,
    ) -> Result<f64, DomainError> {
        for attempt in 1..=self.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(DomainError::TransferAborted),
                _ = tokio::time::sleep(self.interval) => {}
            }

            let metadata = tokio::select! {
                _ = cancel.cancelled() => return Err(DomainError::TransferAborted),
                metadata = api.fetch_content(content_id) => metadata,
            };

            match metadata {
                Ok(metadata) => {
                    if let Some(duration) = metadata.positive_duration() {
                        info!(content_id, duration, attempt, "Video processing finished");
                        return Ok(duration);
                    }
                    debug!(content_id, attempt, "Video duration not available yet");
                }
                Err(e) => {
                    debug!(content_id, attempt, error = %e, "Failed to read content metadata");
                }
            }
        }

        warn!(content_id, attempts = self.max_attempts, "Gave up waiting for video processing");
        Err(DomainError::ProcessingTimeout {
            content_id: content_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}
