/// API通信用の型定義
///
/// プラットフォーム API のリクエスト・レスポンスをシリアライズするための型。
/// オーケストレーションが必要とするフィールドのみを定義し、それ以外は無視します。
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// ローカルストレージを表すプロバイダ名
pub const LOCAL_PROVIDER: &str = "local";

/// コンテンツ種別
///
/// 必須ファイル（動画・アーカイブ）を決定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Lecture,
    Assignment,
    Project,
}

impl ContentKind {
    /// `POST /content-endpoints/{kind}` のパス要素
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Lecture => "lecture",
            Self::Assignment => "assignment",
            Self::Project => "project",
        }
    }

    pub fn requires_video(self) -> bool {
        matches!(self, Self::Lecture | Self::Project)
    }

    pub fn requires_archive(self) -> bool {
        matches!(self, Self::Assignment | Self::Project)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lecture" => Ok(Self::Lecture),
            "assignment" => Ok(Self::Assignment),
            "project" => Ok(Self::Project),
            other => Err(format!(
                "unknown content kind '{}' (expected lecture, assignment or project)",
                other
            )),
        }
    }
}

/// ストレージ設定（画面ごとに1回取得）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub video_provider: String,
    pub file_provider: String,
    #[serde(default)]
    pub is_hosted_video_enabled: bool,
}

impl StorageConfig {
    /// すべてローカル保存の設定
    pub fn local() -> Self {
        Self {
            video_provider: LOCAL_PROVIDER.to_string(),
            file_provider: LOCAL_PROVIDER.to_string(),
            is_hosted_video_enabled: false,
        }
    }

    /// 動画が外部ホスティングへ転送されるか
    pub fn video_is_hosted(&self) -> bool {
        self.is_hosted_video_enabled && !is_local(&self.video_provider)
    }

    /// アーカイブが外部ホスティングへ転送されるか
    pub fn file_is_hosted(&self) -> bool {
        !is_local(&self.file_provider)
    }
}

fn is_local(provider: &str) -> bool {
    let provider = provider.trim();
    provider.is_empty() || provider.eq_ignore_ascii_case(LOCAL_PROVIDER)
}

/// リモートジョブの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Uploading,
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl RemoteStatus {
    /// これ以上ポーリングしない状態か
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(label)
    }
}

/// `GET /video-upload-jobs/{id}` のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: RemoteStatus,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub bytes_uploaded: Option<u64>,
    #[serde(default)]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 保存先の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    pub storage_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl StoredAsset {
    pub fn is_local(&self) -> bool {
        is_local(&self.storage_type)
    }
}

/// `POST /content-endpoints/{kind}` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub video: Option<StoredAsset>,
    #[serde(default)]
    pub file: Option<StoredAsset>,
}

impl ContentRecord {
    /// 動画がローカルに保存され、サーバー側での処理（長さ抽出）待ちになるか
    pub fn has_local_video(&self) -> bool {
        self.video.as_ref().is_some_and(StoredAsset::is_local)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub duration: Option<f64>,
}

/// `GET /content/{id}` のレスポンス
///
/// 長さは旧フィールド（トップレベル）と新フィールド（video.duration）の
/// どちらかに入る。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub video: Option<VideoMetadata>,
}

impl ContentMetadata {
    /// 正の長さが得られていればそれを返す
    pub fn positive_duration(&self) -> Option<f64> {
        let nested = self.video.as_ref().and_then(|v| v.duration);
        [self.duration, nested]
            .into_iter()
            .flatten()
            .find(|d| d.is_finite() && *d > 0.0)
    }
}

/// マルチパート送信の内容
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSubmission {
    pub kind: ContentKind,
    pub section_id: Option<String>,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub video: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub solution: Option<PathBuf>,
    pub upload_session_id: Option<String>,
}

/// `PUT /content/{id}/assign-hosted-url` のリクエスト
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignHostedUrlRequest {
    pub hosted_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_snapshot_deserialization() {
        let json = r#"{
            "status": "uploading",
            "percent": 42.5,
            "bytesUploaded": 1024,
            "totalBytes": 4096,
            "error": null
        }"#;

        let snapshot: JobSnapshot = serde_json::from_str(json).expect("Failed to parse");
        assert_eq!(snapshot.status, RemoteStatus::Uploading);
        assert_eq!(snapshot.percent, Some(42.5));
        assert_eq!(snapshot.bytes_uploaded, Some(1024));
        assert_eq!(snapshot.total_bytes, Some(4096));
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_job_snapshot_minimal() {
        let snapshot: JobSnapshot = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(snapshot.status, RemoteStatus::Queued);
        assert!(snapshot.percent.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RemoteStatus::Completed.is_terminal());
        assert!(RemoteStatus::Failed.is_terminal());
        assert!(RemoteStatus::Canceled.is_terminal());
        assert!(!RemoteStatus::Queued.is_terminal());
        assert!(!RemoteStatus::Uploading.is_terminal());
        assert!(!RemoteStatus::Processing.is_terminal());
    }

    #[test]
    fn test_storage_config_hosting() {
        let config: StorageConfig = serde_json::from_str(
            r#"{"videoProvider":"vimeo","fileProvider":"local","isHostedVideoEnabled":true}"#,
        )
        .unwrap();
        assert!(config.video_is_hosted());
        assert!(!config.file_is_hosted());

        let disabled = StorageConfig {
            is_hosted_video_enabled: false,
            ..config
        };
        assert!(!disabled.video_is_hosted());
        assert!(!StorageConfig::local().file_is_hosted());
    }

    #[test]
    fn test_content_record_local_video() {
        let record: ContentRecord = serde_json::from_str(
            r#"{"_id":"c1","video":{"storageType":"local","url":"/media/a.mp4"}}"#,
        )
        .unwrap();
        assert_eq!(record.id, "c1");
        assert!(record.has_local_video());

        let hosted: ContentRecord =
            serde_json::from_str(r#"{"id":"c2","video":{"storageType":"vimeo"}}"#).unwrap();
        assert!(!hosted.has_local_video());
    }

    #[test]
    fn test_positive_duration_fields() {
        let legacy: ContentMetadata = serde_json::from_str(r#"{"duration":12.0}"#).unwrap();
        assert_eq!(legacy.positive_duration(), Some(12.0));

        let nested: ContentMetadata =
            serde_json::from_str(r#"{"duration":0,"video":{"duration":33.5}}"#).unwrap();
        assert_eq!(nested.positive_duration(), Some(33.5));

        let pending: ContentMetadata = serde_json::from_str(r#"{"duration":0}"#).unwrap();
        assert!(pending.positive_duration().is_none());
    }

    #[test]
    fn test_content_kind_parsing() {
        assert_eq!("Lecture".parse::<ContentKind>(), Ok(ContentKind::Lecture));
        assert!("quiz".parse::<ContentKind>().is_err());
        assert!(ContentKind::Project.requires_video());
        assert!(ContentKind::Project.requires_archive());
        assert!(!ContentKind::Assignment.requires_video());
    }
}
