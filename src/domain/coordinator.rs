/// ステージコーディネーター（状態機械）
///
/// 転送モニターとジョブポーラーの出力を1つのセッション状態へまとめ、
/// 利用者に見せる段階と進捗率を決める。
///
/// 進捗率は段階ごとに1つの信号だけから決める:
/// - transferring: クライアントの送信バイト数
/// - serverTracked / processing: リモートジョブが報告する percent（0〜100 に丸める）
///
/// 2つの信号を平均することはない。
///
/// 非同期のコールバックはすべて `SessionHandle` 越しに現在の状態を読み書きし、
/// 自分の試行番号が現在の試行と一致しない結果は捨てる。
use crate::api::types::{ContentKind, ContentRecord, RemoteStatus};
use crate::api::upload::TransferSample;
use crate::domain::error::DomainError;
use crate::domain::poller::PollUpdate;
use crate::domain::session::{SessionView, Stage, UploadSession};
use crate::domain::transfer::{TransferMonitor, TransferSignal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 送信開始時に決まる段取り
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadPlan {
    /// サーバー側ジョブを追跡する（セッションIDあり）
    pub tracks_remote: bool,
    /// 完了をリモートジョブの `completed` で判定する（外部ホスティングの動画）
    pub await_remote: bool,
    /// 動画がローカル保存され、長さの抽出を待つ必要がある
    pub local_video: bool,
}

/// アップロード呼び出しが成功した後に行うこと
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// 試行は終わっている（done または error）
    Finish,
    /// ローカル処理の完了を待つ
    WaitForProcessing,
    /// リモートジョブの完了を待つ
    WaitForRemote,
}

#[derive(Debug, Default)]
pub struct StageCoordinator {
    attempt: u64,
    session: UploadSession,
    monitor: TransferMonitor,
    plan: UploadPlan,
    percent: f64,
    upload_returned: bool,
    remote_completed: bool,
    awaiting_local: bool,
    /// 応答の到着でサーバー側フェーズへ切り替えた（ポーリング未開始）
    switched_on_return: bool,
}

impl StageCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn stage(&self) -> Stage {
        self.session.stage
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn plan(&self) -> UploadPlan {
        self.plan
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    fn is_current(&self, attempt: u64) -> bool {
        if attempt != self.attempt {
            debug!(attempt, current = self.attempt, "Discarding event from superseded attempt");
            return false;
        }
        true
    }

    /// 段階を進める。許可されていない遷移は記録して無視する
    fn advance(&mut self, next: Stage) -> bool {
        let current = self.session.stage;
        if current == next {
            return true;
        }
        if !current.can_advance_to(next) {
            warn!(from = %current, to = %next, "Rejected stage transition");
            return false;
        }
        info!(from = %current, to = %next, session = ?self.session.id, "Upload stage changed");
        self.session.stage = next;
        true
    }

    fn fail(&mut self, message: String) {
        if self.advance(Stage::Error) {
            self.session.error_message = Some(message);
        }
    }

    fn finish(&mut self) {
        if self.advance(Stage::Done) {
            self.percent = 100.0;
        }
    }

    /// 新しい試行を始める（idle → transferring）
    ///
    /// 送信中の試行がある場合は `SessionBusy`。
    pub fn begin(
        &mut self,
        kind: ContentKind,
        session_id: Option<String>,
        plan: UploadPlan,
    ) -> Result<u64, DomainError> {
        if self.session.stage.is_active() {
            return Err(DomainError::SessionBusy);
        }

        self.attempt += 1;
        self.session = UploadSession {
            id: session_id,
            content_kind: Some(kind),
            ..UploadSession::default()
        };
        self.monitor = TransferMonitor::new(plan.tracks_remote);
        self.plan = plan;
        self.percent = 0.0;
        self.upload_returned = false;
        self.remote_completed = false;
        self.awaiting_local = false;
        self.switched_on_return = false;

        self.advance(Stage::Transferring);
        Ok(self.attempt)
    }

    /// クライアント送信のサンプルを反映する
    pub fn apply_transfer(&mut self, attempt: u64, sample: TransferSample) -> TransferSignal {
        if !self.is_current(attempt) || self.session.stage != Stage::Transferring {
            return TransferSignal::Ignored;
        }

        if sample.bytes_total.is_some() {
            self.session.client_bytes_sent = Some(sample.bytes_sent);
            self.session.client_bytes_total = sample.bytes_total;
        }

        let signal = self.monitor.observe(sample);
        match signal {
            TransferSignal::Progress(percent) => self.percent = percent,
            TransferSignal::ClientPhaseComplete => self.enter_server_phase(),
            TransferSignal::Finished => {
                self.percent = 100.0;
                if !self.plan.local_video {
                    self.finish();
                }
            }
            TransferSignal::Ignored => {}
        }
        signal
    }

    /// 送信フェーズからサーバー側フェーズへ切り替える
    ///
    /// 表示上の進捗はここで 0 に戻り、以降はリモートジョブの値のみを使う。
    fn enter_server_phase(&mut self) {
        if self.advance(Stage::ServerTracked) {
            self.percent = 0.0;
        }
    }

    /// ポーリング結果を反映する
    pub fn apply_poll(&mut self, attempt: u64, update: &PollUpdate) {
        if !self.is_current(attempt) {
            return;
        }
        if !matches!(self.session.stage, Stage::ServerTracked | Stage::Processing) {
            debug!(stage = %self.session.stage, "Ignoring poll update outside server phase");
            return;
        }
        if self.session.id.as_deref() != Some(update.job_id.as_str()) {
            debug!(job_id = %update.job_id, "Ignoring poll update for another job");
            return;
        }

        self.session.remote_status = Some(update.remote_status);
        self.session.error_message = None;
        if update.bytes_uploaded.is_some() {
            self.session.server_bytes_sent = update.bytes_uploaded;
        }
        if update.total_bytes.is_some() {
            self.session.server_bytes_total = update.total_bytes;
        }
        self.session.speed_bytes_per_second = update.speed_bytes_per_second;
        self.session.eta_seconds = update.eta_seconds;
        if let Some(percent) = update.percent.filter(|p| p.is_finite()) {
            self.percent = percent.clamp(0.0, 100.0);
        }

        match update.remote_status {
            RemoteStatus::Queued | RemoteStatus::Uploading => {}
            RemoteStatus::Processing => {
                self.advance(Stage::Processing);
            }
            RemoteStatus::Completed => {
                self.remote_completed = true;
                if self.awaiting_local {
                    self.advance(Stage::Processing);
                } else {
                    self.finish();
                }
            }
            RemoteStatus::Failed => {
                let message = update
                    .error
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "The hosted transfer failed".to_string());
                self.fail(message);
            }
            RemoteStatus::Canceled => {
                // 利用者のキャンセルはここに来る前に idle へ戻っている
                self.fail("The hosted transfer was canceled by the server".to_string());
            }
        }
    }

    /// アップロード呼び出しの成功を反映し、次に待つものを返す
    pub fn upload_succeeded(&mut self, attempt: u64, record: &ContentRecord) -> NextStep {
        if !self.is_current(attempt) || self.session.stage.is_finished() {
            return NextStep::Finish;
        }
        self.upload_returned = true;

        // トランスポートが 100% を報告しないまま応答が返った場合
        if self.session.stage == Stage::Transferring && !self.monitor.is_complete() {
            if self.plan.tracks_remote {
                self.enter_server_phase();
                self.switched_on_return = self.session.stage == Stage::ServerTracked;
            } else {
                self.percent = 100.0;
            }
        }

        if self.plan.local_video || record.has_local_video() {
            self.awaiting_local = true;
            if self.session.stage == Stage::ServerTracked && self.remote_completed {
                self.advance(Stage::Processing);
            }
            return NextStep::WaitForProcessing;
        }

        if self.plan.await_remote && !self.remote_completed {
            return NextStep::WaitForRemote;
        }

        self.finish();
        NextStep::Finish
    }

    /// `upload_succeeded` がサーバー側フェーズへの切り替えを行ったか
    ///
    /// この場合、送信サンプル経由ではポーリングが始まっていない。
    pub fn switched_on_return(&self) -> bool {
        self.switched_on_return
    }

    /// アップロード呼び出しの失敗（キャンセル以外）
    pub fn upload_failed(&mut self, attempt: u64, message: String) {
        if self.is_current(attempt) {
            self.fail(message);
        }
    }

    /// ローカル処理（長さの抽出）が終わった
    pub fn local_processing_finished(&mut self, attempt: u64) {
        if !self.is_current(attempt) || self.session.stage.is_finished() {
            return;
        }
        self.awaiting_local = false;
        if self.plan.await_remote && !self.remote_completed {
            return;
        }
        self.finish();
    }

    pub fn local_processing_failed(&mut self, attempt: u64, message: String) {
        if self.is_current(attempt) {
            self.awaiting_local = false;
            self.fail(message);
        }
    }

    /// 初期状態に戻す（キャンセル・破棄）
    ///
    /// 試行番号を進めるので、進行中の非同期処理の結果はすべて捨てられる。
    pub fn reset(&mut self) {
        if self.session.stage != Stage::Idle {
            info!(from = %self.session.stage, session = ?self.session.id, "Upload session reset to idle");
        }
        let attempt = self.attempt + 1;
        *self = Self {
            attempt,
            ..Self::default()
        };
    }

    pub fn view(&self) -> SessionView {
        let session = &self.session;
        SessionView {
            attempt: self.attempt,
            session_id: session.id.clone(),
            content_kind: session.content_kind,
            stage: session.stage,
            percent: self.percent,
            client_bytes_sent: session.client_bytes_sent,
            client_bytes_total: session.client_bytes_total,
            server_bytes_sent: session.server_bytes_sent,
            server_bytes_total: session.server_bytes_total,
            speed_bytes_per_second: session.speed_bytes_per_second,
            eta_seconds: session.eta_seconds,
            remote_status: session.remote_status,
            error_message: session.error_message.clone(),
        }
    }
}

/// セッション状態への共有ハンドル
///
/// 変更のたびに `SessionView` を watch チャネルへ公開する。
#[derive(Clone)]
pub struct SessionHandle {
    coordinator: Arc<Mutex<StageCoordinator>>,
    view_tx: Arc<watch::Sender<SessionView>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(SessionView::default());
        Self {
            coordinator: Arc::new(Mutex::new(StageCoordinator::new())),
            view_tx: Arc::new(view_tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StageCoordinator> {
        self.coordinator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 状態を変更し、変化があれば公開する
    pub fn update<R>(&self, f: impl FnOnce(&mut StageCoordinator) -> R) -> R {
        let (result, view) = {
            let mut coordinator = self.lock();
            let result = f(&mut coordinator);
            (result, coordinator.view())
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
        result
    }

    pub fn read<R>(&self, f: impl FnOnce(&StageCoordinator) -> R) -> R {
        f(&self.lock())
    }

    pub fn view(&self) -> SessionView {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }
}
