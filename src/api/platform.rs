/// プラットフォーム API のポート定義と HTTP 実装
///
/// オーケストレーション（domain）はこのトレイト越しにのみ外部と通信する。
/// テストではスクリプト化した偽実装に差し替える。
use crate::api::client::ApiClient;
use crate::api::error::InfraError;
use crate::api::types::{
    AssignHostedUrlRequest, ContentMetadata, ContentRecord, ContentSubmission, JobSnapshot,
    StorageConfig,
};
use crate::api::upload::{self, ProgressSender};
use async_trait::async_trait;
use tracing::debug;

/// オーケストレーションが利用する外部操作
#[async_trait]
pub trait PlatformApi: Send + Sync + 'static {
    /// `GET /storage-config`
    async fn fetch_storage_config(&self) -> Result<StorageConfig, InfraError>;

    /// `POST /content-endpoints/{kind}`
    ///
    /// 送信中の進捗は `progress` へ流す。戻り値の Future を破棄すると転送は中断される。
    async fn submit_content(
        &self,
        submission: &ContentSubmission,
        progress: ProgressSender,
    ) -> Result<ContentRecord, InfraError>;

    /// `GET /video-upload-jobs/{id}`（404 は「まだ作成されていない」）
    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, InfraError>;

    /// `POST /video-upload-jobs/{id}/cancel`
    async fn cancel_job(&self, job_id: &str) -> Result<(), InfraError>;

    /// `GET /content/{id}`
    async fn fetch_content(&self, content_id: &str) -> Result<ContentMetadata, InfraError>;

    /// `PUT /content/{id}/assign-hosted-url`
    async fn assign_hosted_url(&self, content_id: &str, url: &str) -> Result<ContentRecord, InfraError>;
}

/// reqwest による実装
#[derive(Debug, Clone)]
pub struct HttpPlatform {
    client: ApiClient,
}

impl HttpPlatform {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, InfraError> {
        let response = self.client.get(endpoint).await?;
        let response = ApiClient::check_response(response, endpoint).await?;
        ApiClient::parse_json(response, endpoint).await
    }
}

#[async_trait]
impl PlatformApi for HttpPlatform {
    async fn fetch_storage_config(&self) -> Result<StorageConfig, InfraError> {
        self.get_json("/storage-config").await
    }

    async fn submit_content(
        &self,
        submission: &ContentSubmission,
        progress: ProgressSender,
    ) -> Result<ContentRecord, InfraError> {
        let endpoint = format!("/content-endpoints/{}", submission.kind.path_segment());
        let form = upload::build_form(submission, progress).await?;

        debug!(endpoint = %endpoint, session = ?submission.upload_session_id, "submitting content");
        let response = self.client.post_multipart(&endpoint, form).await?;
        let response = ApiClient::check_response(response, &endpoint).await?;
        ApiClient::parse_json(response, &endpoint).await
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobSnapshot, InfraError> {
        self.get_json(&format!("/video-upload-jobs/{}", job_id)).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), InfraError> {
        let endpoint = format!("/video-upload-jobs/{}/cancel", job_id);
        let response = self.client.post_empty(&endpoint).await?;
        ApiClient::check_response(response, &endpoint).await?;
        Ok(())
    }

    async fn fetch_content(&self, content_id: &str) -> Result<ContentMetadata, InfraError> {
        self.get_json(&format!("/content/{}", content_id)).await
    }

    async fn assign_hosted_url(&self, content_id: &str, url: &str) -> Result<ContentRecord, InfraError> {
        let endpoint = format!("/content/{}/assign-hosted-url", content_id);
        let body = AssignHostedUrlRequest {
            hosted_url: url.to_string(),
        };
        let response = self.client.put_json(&endpoint, &body).await?;
        let response = ApiClient::check_response(response, &endpoint).await?;
        ApiClient::parse_json(response, &endpoint).await
    }
}
