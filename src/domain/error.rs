/// ドメイン層のエラー定義
///
/// アップロードのオーケストレーションで発生するエラーを分類する。
/// 検証エラーとキャンセルはクライアント側で完結し、
/// 転送失敗・リモートジョブ失敗・処理タイムアウトのみがユーザーに通知される。
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

/// 送信前の検証エラー（ネットワーク呼び出しの前に検出）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// 必須の動画が選択されていない
    #[error("a video file is required for {kind} content")]
    MissingVideo { kind: String },

    /// 必須のアーカイブが選択されていない
    #[error("an archive file is required for {kind} content")]
    MissingArchive { kind: String },

    /// ファイルが見つからない
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// ディレクトリが指定された
    #[error("'{path}' is a directory, not a file")]
    NotAFile { path: String },

    /// ファイルが空
    #[error("file is empty: {path}")]
    EmptyFile { path: String },

    /// ファイルサイズが制限を超過
    #[error("file too large: {size} bytes (maximum allowed: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// 動画形式が無効
    #[error("invalid video format: {path} (expected: {expected}, found: {found})")]
    InvalidFormat {
        path: String,
        expected: String,
        found: String,
    },

    /// アーカイブの拡張子が無効
    #[error("invalid archive extension: {path} (expected: {expected})")]
    InvalidArchive { path: String, expected: String },

    /// 動画が短すぎる
    #[error("video is too short: {duration_secs:.1}s (minimum: {min_secs:.1}s)")]
    VideoTooShort { duration_secs: f64, min_secs: f64 },

    /// タイトルが空
    #[error("title cannot be empty")]
    EmptyTitle,
}

impl ValidationError {
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::MissingVideo { .. } => Some("Pass the lecture video with --video <file>."),
            Self::MissingArchive { .. } => Some("Pass the assignment archive with --archive <file.zip>."),
            Self::FileNotFound { .. } => Some("Please check the file path and ensure the file exists."),
            Self::NotAFile { .. } => Some("Please specify a file, not a directory."),
            Self::EmptyFile { .. } => Some("The file appears to be empty or corrupted."),
            Self::FileTooLarge { .. } => Some("Try compressing the file or split the content."),
            Self::InvalidFormat { .. } => Some("Supported formats: mp4, mov, avi, mkv, webm"),
            Self::InvalidArchive { .. } => Some("Archives must be .zip files."),
            Self::VideoTooShort { .. } => Some("Upload a longer recording."),
            Self::EmptyTitle => Some("Provide a title with --title."),
        }
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// ユーザーによる中断（エラーとして報告しない）
    #[error("transfer aborted by user")]
    TransferAborted,

    /// アップロード呼び出しの失敗
    #[error("upload failed: {message}")]
    TransferFailed { message: String },

    /// リモートジョブが failed を報告
    #[error("hosted transfer failed: {message}")]
    RemoteJobFailed { message: String },

    /// ローカル処理の完了待ちが上限に達した
    #[error("processing did not finish for content {content_id} after {attempts} checks")]
    ProcessingTimeout { content_id: String, attempts: u32 },

    /// 既に別のアップロードが進行中
    #[error("another upload is already in progress")]
    SessionBusy,
}

impl DomainError {
    /// 利用者に通知すべきエラーか（検証・キャンセルは通知しない）
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::RemoteJobFailed { .. } | Self::ProcessingTimeout { .. }
        )
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_) | Self::TransferAborted | Self::SessionBusy => ErrorSeverity::UserError,
            Self::TransferFailed { .. }
            | Self::RemoteJobFailed { .. }
            | Self::ProcessingTimeout { .. } => ErrorSeverity::SystemError,
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Validation(e) => e.hint(),
            Self::TransferAborted => None,
            Self::TransferFailed { .. } => Some("Check the message above and submit the upload again."),
            Self::RemoteJobFailed { .. } => {
                Some("The hosting provider rejected the file. Submit the upload again or contact support.")
            }
            Self::ProcessingTimeout { .. } => {
                Some("The server is still processing the video. Check the content later before re-uploading.")
            }
            Self::SessionBusy => Some("Wait for the current upload to finish or cancel it first."),
        }
    }
}
