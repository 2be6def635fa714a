/// コマンド実行結果を表す型
///
/// 各コマンドはこの型を返し、プレゼンテーション層（presentation::output）で
/// 人間向けと機械向けの出力フォーマットを決定する。
use crate::api::types::{ContentKind, JobSnapshot, StorageConfig};
use serde::Serialize;

/// コマンド実行結果の統一型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Login(LoginResult),
    Logout(LogoutResult),
    Status(StatusResult),
    Upload(UploadResult),
    Job(JobResult),
    CancelJob(CancelJobResult),
    AssignUrl(AssignUrlResult),
}

/// ログインコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    /// 既にログイン済みだったか（上書き更新の場合true）
    pub was_logged_in: bool,
}

/// ログアウトコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResult {
    /// ログイン状態だったか
    pub was_logged_in: bool,
}

/// ステータスコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    /// 認証が通っているか
    pub is_authenticated: bool,
    /// マスキングされたトークン（認証情報がある場合）
    pub token: Option<String>,
    pub endpoint: String,
    /// 検証に成功した場合のストレージ設定
    pub storage: Option<StorageConfig>,
}

/// アップロードの終わり方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Completed,
    Canceled,
}

/// アップロードコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub status: UploadStatus,
    pub kind: ContentKind,
    pub title: String,
    pub content_id: Option<String>,
    /// サーバー側ジョブを追跡した場合のセッションID
    pub session_id: Option<String>,
    /// ローカル処理で得られた動画の長さ（秒）
    pub duration_secs: Option<f64>,
}

/// ジョブ照会の結果
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    /// 404 だった場合 true（`queued` として扱う）
    pub not_yet_created: bool,
    pub snapshot: JobSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelJobResult {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignUrlResult {
    pub content_id: String,
    pub hosted_url: String,
    pub storage_type: Option<String>,
}

impl CommandResult {
    /// 成功メッセージを取得（人間向け出力用）
    pub fn success_message(&self) -> String {
        match self {
            CommandResult::Login(r) => {
                if r.was_logged_in {
                    "Access token updated!".to_string()
                } else {
                    "Login successful!".to_string()
                }
            }
            CommandResult::Logout(r) => {
                if r.was_logged_in {
                    "Logged out successfully.".to_string()
                } else {
                    "Already logged out.".to_string()
                }
            }
            CommandResult::Status(r) => {
                if r.is_authenticated {
                    "Authenticated".to_string()
                } else {
                    "Not authenticated".to_string()
                }
            }
            CommandResult::Upload(r) => match r.status {
                UploadStatus::Completed => format!("Uploaded {} '{}'.", r.kind, r.title),
                UploadStatus::Canceled => "Upload canceled.".to_string(),
            },
            CommandResult::Job(r) => format!("Job {} is {}.", r.job_id, r.snapshot.status),
            CommandResult::CancelJob(r) => format!("Cancel requested for job {}.", r.job_id),
            CommandResult::AssignUrl(r) => format!("Hosted URL assigned to {}.", r.content_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::RemoteStatus;

    #[test]
    fn test_serialization_is_tagged_by_command() {
        let result = CommandResult::CancelJob(CancelJobResult {
            job_id: "job-1".to_string(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["command"], "cancel_job");
        assert_eq!(json["job_id"], "job-1");
    }

    #[test]
    fn test_upload_messages() {
        let mut upload = UploadResult {
            status: UploadStatus::Completed,
            kind: ContentKind::Lecture,
            title: "Intro".to_string(),
            content_id: Some("c1".to_string()),
            session_id: None,
            duration_secs: None,
        };
        assert_eq!(
            CommandResult::Upload(upload.clone()).success_message(),
            "Uploaded lecture 'Intro'."
        );

        upload.status = UploadStatus::Canceled;
        assert_eq!(CommandResult::Upload(upload).success_message(), "Upload canceled.");
    }

    #[test]
    fn test_job_message() {
        let result = CommandResult::Job(JobResult {
            job_id: "j".to_string(),
            not_yet_created: false,
            snapshot: JobSnapshot {
                status: RemoteStatus::Processing,
                percent: Some(80.0),
                bytes_uploaded: None,
                total_bytes: None,
                error: None,
            },
        });
        assert_eq!(result.success_message(), "Job j is processing.");
    }
}
