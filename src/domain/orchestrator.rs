/// アップロードのオーケストレーション
///
/// 検証 → セッション開始 → 転送（進捗の監視）→ リモートジョブの追跡 /
/// ローカル処理の完了待ち → 通知、までの1回分の送信を駆動する。
/// キャンセルはどの段階からでも受け付け、セッションを idle に戻す。
use crate::api::PlatformApi;
use crate::api::error::InfraError;
use crate::api::types::{ContentRecord, ContentSubmission, StorageConfig};
use crate::api::upload::{ProgressReceiver, TransferSample};
use crate::domain::cancellation::CancellationController;
use crate::domain::coordinator::{NextStep, SessionHandle, UploadPlan};
use crate::domain::error::DomainError;
use crate::domain::initiator::{new_session_id, should_track_remote_progress};
use crate::domain::notify::{NotificationKind, Notifier};
use crate::domain::poller::{JobPoller, PollObserver, PollTiming, PollUpdate};
use crate::domain::session::{SessionView, Stage};
use crate::domain::transfer::TransferSignal;
use crate::domain::validator::{UploadForm, validate_form};
use crate::domain::waiter::CompletionWaiter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const GENERIC_UPLOAD_FAILURE: &str = "The upload could not be completed. Please try again.";
const GENERIC_REMOTE_FAILURE: &str = "The hosted transfer failed.";

/// 1回の送信の結果
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed {
        content_id: String,
        session_id: Option<String>,
        /// ローカル処理で得られた動画の長さ（秒）
        duration_secs: Option<f64>,
    },
    Canceled,
}

/// ポーリング結果をセッションへ流し込む
struct SessionPollObserver {
    handle: SessionHandle,
    attempt: u64,
}

impl PollObserver for SessionPollObserver {
    fn on_poll(&self, update: PollUpdate) {
        self.handle.update(|c| c.apply_poll(self.attempt, &update));
    }
}

pub struct UploadOrchestrator<A: PlatformApi> {
    api: Arc<A>,
    storage: StorageConfig,
    notifier: Arc<dyn Notifier>,
    handle: SessionHandle,
    poller: JobPoller<A>,
    cancellation: Arc<CancellationController>,
    waiter: CompletionWaiter,
}

impl<A: PlatformApi> UploadOrchestrator<A> {
    pub fn new(api: Arc<A>, storage: StorageConfig, notifier: Arc<dyn Notifier>) -> Self {
        let poller = JobPoller::new(Arc::clone(&api), PollTiming::default());
        Self {
            api,
            storage,
            notifier,
            handle: SessionHandle::new(),
            poller,
            cancellation: Arc::new(CancellationController::new()),
            waiter: CompletionWaiter::default(),
        }
    }

    /// ストレージ設定を取得して組み立てる（画面ごとに1回）
    pub async fn connect(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Result<Self, InfraError> {
        let storage = api.fetch_storage_config().await?;
        debug!(?storage, "Loaded storage configuration");
        Ok(Self::new(api, storage, notifier))
    }

    #[cfg(test)]
    pub fn with_poll_timing(mut self, timing: PollTiming) -> Self {
        self.poller = JobPoller::new(Arc::clone(&self.api), timing);
        self
    }

    #[cfg(test)]
    pub fn with_waiter(mut self, waiter: CompletionWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    /// 送信フォームを処理する
    ///
    /// 検証エラーはネットワーク呼び出し前に返り、セッションは idle のまま。
    /// 利用者のキャンセルは `Ok(UploadOutcome::Canceled)` として返る。
    pub async fn submit(&self, form: UploadForm) -> Result<UploadOutcome, DomainError> {
        validate_form(&form)?;

        let has_video = form.has_video();
        let has_archive = form.has_archive();
        let tracks_remote = should_track_remote_progress(form.kind, has_video, has_archive, &self.storage);
        let plan = UploadPlan {
            tracks_remote,
            await_remote: tracks_remote && has_video && self.storage.video_is_hosted(),
            local_video: has_video && !self.storage.video_is_hosted(),
        };
        let session_id = tracks_remote.then(new_session_id);

        let attempt = self
            .handle
            .update(|c| c.begin(form.kind, session_id.clone(), plan))?;
        let abort = self.cancellation.arm();
        info!(kind = %form.kind, session = ?session_id, ?plan, "Starting upload");

        let submission = ContentSubmission {
            kind: form.kind,
            section_id: form.section_id,
            title: form.title,
            description: form.description,
            order: form.order,
            video: form.video.filter(|_| has_video),
            archive: form.archive.filter(|_| has_archive),
            solution: form.solution,
            upload_session_id: session_id.clone(),
        };

        let observer: Arc<dyn PollObserver> = Arc::new(SessionPollObserver {
            handle: self.handle.clone(),
            attempt,
        });

        let result = tokio::select! {
            _ = abort.cancelled() => None,
            result = self.transfer(&submission, attempt, session_id.as_deref(), &observer) => Some(result),
        };

        let record = match result {
            None => return self.aborted(),
            Some(Err(_)) if self.cancellation.is_requested() => return self.aborted(),
            Some(Err(e)) => {
                let message = e.server_message().unwrap_or_else(|| GENERIC_UPLOAD_FAILURE.to_string());
                warn!(error = %e, "Upload request failed");
                return Err(self.finish_with_error(attempt, DomainError::TransferFailed { message }));
            }
            Some(Ok(record)) => record,
        };
        info!(content_id = %record.id, "Upload request accepted");

        let mut duration_secs = None;
        let (step, switched) = self.handle.update(|c| {
            let step = c.upload_succeeded(attempt, &record);
            (step, c.switched_on_return())
        });
        // 送信サンプルが 100% に届かないまま応答が返った場合はここで追跡を始める
        if switched
            && !self.poller.is_polling()
            && let Some(id) = session_id.as_deref()
        {
            self.poller.start_polling(id, Arc::clone(&observer));
        }
        if step == NextStep::WaitForProcessing {
            match self
                .waiter
                .wait_for_duration(self.api.as_ref(), &record.id, &abort)
                .await
            {
                Ok(duration) => {
                    duration_secs = Some(duration);
                    self.handle.update(|c| c.local_processing_finished(attempt));
                }
                Err(DomainError::TransferAborted) => return self.aborted(),
                Err(e) => return Err(self.finish_with_error(attempt, e)),
            }
        }

        let Some(view) = self.wait_until_settled(attempt, &abort).await else {
            return self.aborted();
        };
        self.poller.stop_polling();
        self.cancellation.disarm();

        match view.stage {
            Stage::Done => {
                info!(content_id = %record.id, "Upload finished");
                self.notifier.notify(NotificationKind::Success, "Upload complete");
                Ok(UploadOutcome::Completed {
                    content_id: record.id,
                    session_id,
                    duration_secs,
                })
            }
            _ => {
                let message = view
                    .error_message
                    .unwrap_or_else(|| GENERIC_REMOTE_FAILURE.to_string());
                self.notifier.notify(NotificationKind::Error, &message);
                Err(DomainError::RemoteJobFailed { message })
            }
        }
    }

    /// アップロード呼び出しを行い、送信サンプルを届いた順にセッションへ反映する
    async fn transfer(
        &self,
        submission: &ContentSubmission,
        attempt: u64,
        session_id: Option<&str>,
        observer: &Arc<dyn PollObserver>,
    ) -> Result<ContentRecord, InfraError> {
        let (tx, mut rx): (_, ProgressReceiver) = mpsc::unbounded_channel();
        let upload = self.api.submit_content(submission, tx);
        tokio::pin!(upload);

        loop {
            tokio::select! {
                biased;
                Some(sample) = rx.recv() => self.apply_sample(attempt, sample, session_id, observer),
                result = &mut upload => {
                    while let Ok(sample) = rx.try_recv() {
                        self.apply_sample(attempt, sample, session_id, observer);
                    }
                    return result;
                }
            }
        }
    }

    fn apply_sample(
        &self,
        attempt: u64,
        sample: TransferSample,
        session_id: Option<&str>,
        observer: &Arc<dyn PollObserver>,
    ) {
        let signal = self.handle.update(|c| c.apply_transfer(attempt, sample));
        if signal != TransferSignal::ClientPhaseComplete {
            return;
        }
        match session_id {
            Some(id) => self.poller.start_polling(id, Arc::clone(observer)),
            None => warn!("Client phase completed without a session id to track"),
        }
    }

    /// 試行が done / error に達するまで待つ
    ///
    /// キャンセルや破棄で試行が入れ替わった場合は None。
    async fn wait_until_settled(&self, attempt: u64, abort: &CancellationToken) -> Option<SessionView> {
        let mut views = self.handle.subscribe();
        loop {
            let view = views.borrow_and_update().clone();
            if view.attempt != attempt {
                return None;
            }
            if view.stage.is_finished() {
                return Some(view);
            }
            tokio::select! {
                _ = abort.cancelled() => return None,
                changed = views.changed() => changed.ok()?,
            }
        }
    }

    fn aborted(&self) -> Result<UploadOutcome, DomainError> {
        if self.cancellation.is_requested() {
            debug!("Upload ended by user cancellation");
            Ok(UploadOutcome::Canceled)
        } else {
            Err(DomainError::TransferAborted)
        }
    }

    /// 失敗を記録して一度だけ通知する
    fn finish_with_error(&self, attempt: u64, error: DomainError) -> DomainError {
        self.poller.stop_polling();
        self.cancellation.disarm();
        let message = match &error {
            DomainError::TransferFailed { message } | DomainError::RemoteJobFailed { message } => message.clone(),
            other => other.to_string(),
        };
        let timed_out = matches!(error, DomainError::ProcessingTimeout { .. });
        self.handle.update(|c| {
            if timed_out {
                c.local_processing_failed(attempt, message.clone())
            } else {
                c.upload_failed(attempt, message.clone())
            }
        });
        if error.is_reportable() {
            self.notifier.notify(NotificationKind::Error, &message);
        }
        error
    }

    /// 送信中の試行をキャンセルする
    ///
    /// idle（または終了済み）のときは何もせず false を返す。
    /// リモートジョブのキャンセル要求は失敗しても無視する。
    pub async fn cancel(&self) -> bool {
        let (active, session_id) = self
            .handle
            .read(|c| (c.stage().is_active(), c.session().id.clone()));
        if !active {
            debug!("Cancel requested with no active upload");
            return false;
        }

        info!(session = ?session_id, "Canceling upload");
        self.cancellation.request();
        self.cancellation.abort_transfer();
        self.poller.stop_polling();
        self.handle.update(|c| c.reset());

        if let Some(id) = session_id {
            if let Err(e) = self.api.cancel_job(&id).await {
                debug!(job_id = %id, error = %e, "Remote job cancel failed, ignoring");
            }
        }

        self.notifier.notify(NotificationKind::Canceled, "Upload canceled");
        true
    }

    /// タイマーと中断トークンをすべて解放する
    pub fn dispose(&self) {
        self.poller.stop_polling();
        if self.handle.read(|c| c.stage().is_active()) {
            self.cancellation.request();
            self.handle.update(|c| c.reset());
        }
        self.cancellation.abort_transfer();
    }
}

impl<A: PlatformApi> Drop for UploadOrchestrator<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}
