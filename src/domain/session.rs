/// アップロードセッションの状態
///
/// 1回の送信試行につき1つ。送信時に作られ、完了・失敗・キャンセル・
/// フォームを閉じた時点で既定値に戻される。
use crate::api::types::{ContentKind, RemoteStatus};
use serde::Serialize;
use std::fmt;

/// ライフサイクル上の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Idle,
    Transferring,
    ServerTracked,
    Processing,
    Done,
    Error,
}

impl Stage {
    /// 送信中（キャンセル可能）な段階か
    pub fn is_active(self) -> bool {
        matches!(self, Self::Transferring | Self::ServerTracked | Self::Processing)
    }

    /// 試行が終わった段階か
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// 許可された遷移か
    ///
    /// 前進は idle → transferring → serverTracked → processing → done の順のみ。
    /// error へは idle 以外から、idle へはキャンセル（reset）でのみ戻る。
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Idle, Transferring) => true,
            (Transferring, ServerTracked) | (Transferring, Done) => true,
            (ServerTracked, Processing) | (ServerTracked, Done) => true,
            (Processing, Done) => true,
            (from, Error) => from != Idle && from != Error,
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Transferring => "transferring",
            Self::ServerTracked => "serverTracked",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// 1回分の送信試行の記録
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSession {
    /// サーバー側ジョブ追跡を行う場合のみ存在する
    pub id: Option<String>,
    pub content_kind: Option<ContentKind>,
    pub stage: Stage,
    pub client_bytes_sent: Option<u64>,
    pub client_bytes_total: Option<u64>,
    pub server_bytes_sent: Option<u64>,
    pub server_bytes_total: Option<u64>,
    pub speed_bytes_per_second: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub remote_status: Option<RemoteStatus>,
    pub error_message: Option<String>,
}

/// UI に公開する読み取り専用のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// 試行番号（古い試行のイベントを捨てるためのタグ）
    pub attempt: u64,
    pub session_id: Option<String>,
    pub content_kind: Option<ContentKind>,
    pub stage: Stage,
    /// 表示用の進捗（0〜100）
    pub percent: f64,
    pub client_bytes_sent: Option<u64>,
    pub client_bytes_total: Option<u64>,
    pub server_bytes_sent: Option<u64>,
    pub server_bytes_total: Option<u64>,
    pub speed_bytes_per_second: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub remote_status: Option<RemoteStatus>,
    pub error_message: Option<String>,
}
