/// ドメイン層モジュール
///
/// アップロードのオーケストレーション（状態機械）を担います。
/// 外部との通信は `api::PlatformApi` 越しにのみ行い、表示には依存しません。
///
/// # モジュール
/// - `initiator`: リモート追跡の要否判定とセッションID発行
/// - `transfer`: クライアント送信の進捗計算
/// - `poller`: サーバー側ジョブのポーリングとバックオフ
/// - `coordinator`: 段階と進捗の統合（状態機械）
/// - `cancellation`: キャンセル要求と転送の中断
/// - `waiter`: ローカル処理の完了待ち
/// - `orchestrator`: 上記をまとめて1回の送信を駆動

pub mod cancellation;
pub mod coordinator;
pub mod error;
pub mod initiator;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod transfer;
pub mod validator;
pub mod waiter;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{UploadOrchestrator, UploadOutcome};
