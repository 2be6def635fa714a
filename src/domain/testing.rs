/// テスト用の PlatformApi 偽実装
///
/// 応答をキューに積んでおき、呼び出し順に返す。呼び出し履歴も記録する。
use crate::api::PlatformApi;
use crate::api::error::InfraError;
use crate::api::types::{
    ContentMetadata, ContentRecord, ContentSubmission, JobSnapshot, RemoteStatus, StorageConfig,
    StoredAsset,
};
use crate::api::upload::{ProgressSender, TransferSample};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

pub enum JobReply {
    Snapshot(JobSnapshot),
    Status(u16),
    /// 接続断などの一時的な通信失敗
    Network,
}

impl JobReply {
    pub fn snapshot(status: RemoteStatus, percent: Option<f64>) -> Self {
        Self::Snapshot(JobSnapshot {
            status,
            percent,
            bytes_uploaded: None,
            total_bytes: None,
            error: None,
        })
    }

    pub fn failed(message: &str) -> Self {
        Self::Snapshot(JobSnapshot {
            status: RemoteStatus::Failed,
            percent: None,
            bytes_uploaded: None,
            total_bytes: None,
            error: Some(message.to_string()),
        })
    }
}

#[derive(Clone)]
pub enum SubmitReply {
    Record(ContentRecord),
    Status(u16, String),
    /// 応答を返さず待ち続ける（キャンセルのテスト用）
    Hang,
}

struct SubmitPlan {
    samples: Vec<TransferSample>,
    pace: Duration,
    reply: SubmitReply,
}

pub fn record(id: &str, video: Option<&str>, file: Option<&str>) -> ContentRecord {
    let asset = |storage_type: &str| StoredAsset {
        storage_type: storage_type.to_string(),
        url: None,
    };
    ContentRecord {
        id: id.to_string(),
        video: video.map(asset),
        file: file.map(asset),
    }
}

/// 0 から total まで `steps` 回に分けたサンプル列
pub fn ramp(total: u64, steps: u64) -> Vec<TransferSample> {
    (0..=steps)
        .map(|i| TransferSample::bytes(total * i / steps, total))
        .collect()
}

pub struct FakePlatform {
    storage: StorageConfig,
    submit: Mutex<SubmitPlan>,
    submissions: Mutex<Vec<ContentSubmission>>,
    jobs: Mutex<VecDeque<JobReply>>,
    job_polls: Mutex<Vec<Instant>>,
    job_gate: Mutex<Option<Arc<Semaphore>>>,
    contents: Mutex<VecDeque<ContentMetadata>>,
    content_fetches: Mutex<Vec<Instant>>,
    canceled_jobs: Mutex<Vec<String>>,
    cancel_fails: bool,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::with_storage(StorageConfig::local())
    }

    pub fn with_storage(storage: StorageConfig) -> Self {
        Self {
            storage,
            submit: Mutex::new(SubmitPlan {
                samples: Vec::new(),
                pace: Duration::from_millis(100),
                reply: SubmitReply::Record(record("content-1", None, None)),
            }),
            submissions: Mutex::new(Vec::new()),
            jobs: Mutex::new(VecDeque::new()),
            job_polls: Mutex::new(Vec::new()),
            job_gate: Mutex::new(None),
            contents: Mutex::new(VecDeque::new()),
            content_fetches: Mutex::new(Vec::new()),
            canceled_jobs: Mutex::new(Vec::new()),
            cancel_fails: false,
        }
    }

    pub fn hosted_video() -> Self {
        Self::with_storage(StorageConfig {
            video_provider: "vimeo".to_string(),
            file_provider: "local".to_string(),
            is_hosted_video_enabled: true,
        })
    }

    pub fn storage_config(&self) -> StorageConfig {
        self.storage.clone()
    }

    pub fn failing_cancel(mut self) -> Self {
        self.cancel_fails = true;
        self
    }

    pub fn script_submit(&self, samples: Vec<TransferSample>, reply: SubmitReply) {
        let mut plan = self.submit.lock().unwrap();
        plan.samples = samples;
        plan.reply = reply;
    }

    pub fn push_job(&self, reply: JobReply) {
        self.jobs.lock().unwrap().push_back(reply);
    }

    pub fn push_content(&self, duration: Option<f64>) {
        self.contents.lock().unwrap().push_back(ContentMetadata {
            duration,
            video: None,
        });
    }

    /// 以降の fetch_job を release されるまで止める
    pub fn hold_job_polls(&self) {
        *self.job_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_job_polls(&self) {
        if let Some(gate) = self.job_gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn submissions(&self) -> Vec<ContentSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn job_poll_times(&self) -> Vec<Instant> {
        self.job_polls.lock().unwrap().clone()
    }

    pub fn content_fetch_times(&self) -> Vec<Instant> {
        self.content_fetches.lock().unwrap().clone()
    }

    pub fn canceled_jobs(&self) -> Vec<String> {
        self.canceled_jobs.lock().unwrap().clone()
    }
}

fn status_error(endpoint: &str, status: u16, body: &str) -> InfraError {
    InfraError::api(endpoint, body, Some(status))
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn fetch_storage_config(&self) -> Result<StorageConfig, InfraError> {
        Ok(self.storage.clone())
    }

    async fn submit_content(
        &self,
        submission: &ContentSubmission,
        progress: ProgressSender,
    ) -> Result<ContentRecord, InfraError> {
        self.submissions.lock().unwrap().push(submission.clone());
        let (samples, pace, reply) = {
            let plan = self.submit.lock().unwrap();
            (plan.samples.clone(), plan.pace, plan.reply.clone())
        };

        for sample in samples {
            let _ = progress.send(sample);
            tokio::time::sleep(pace).await;
        }

        match reply {
            SubmitReply::Record(record) => Ok(record),
            SubmitReply::Status(status, body) => Err(status_error("/content-endpoints", status, &body)),
            SubmitReply::Hang => std::future::pending().await,
        }
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, InfraError> {
        self.job_polls.lock().unwrap().push(Instant::now());
        let gate = self.job_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }

        let reply = self.jobs.lock().unwrap().pop_front();
        let endpoint = format!("/video-upload-jobs/{}", job_id);
        match reply {
            Some(JobReply::Snapshot(snapshot)) => Ok(snapshot),
            Some(JobReply::Status(status)) => Err(status_error(&endpoint, status, "")),
            Some(JobReply::Network) => Err(InfraError::network("connection reset")),
            None => Err(status_error(&endpoint, 404, "")),
        }
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), InfraError> {
        self.canceled_jobs.lock().unwrap().push(job_id.to_string());
        if self.cancel_fails {
            return Err(InfraError::network("connection reset"));
        }
        Ok(())
    }

    async fn fetch_content(&self, _content_id: &str) -> Result<ContentMetadata, InfraError> {
        self.content_fetches.lock().unwrap().push(Instant::now());
        Ok(self.contents.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn assign_hosted_url(&self, content_id: &str, url: &str) -> Result<ContentRecord, InfraError> {
        let mut record = record(content_id, Some("hosted"), None);
        if let Some(video) = record.video.as_mut() {
            video.url = Some(url.to_string());
        }
        Ok(record)
    }
}
