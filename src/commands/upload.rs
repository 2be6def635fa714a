/// アップロードコマンド
///
/// CLI 引数から送信フォームを組み立て、オーケストレーターで1回の送信を駆動します。
/// 進捗と通知は `ProgressSink` へ流し、表示方法はプレゼンテーション層が決めます。
/// Ctrl-C はキャンセル要求として扱い、結果は `UploadStatus::Canceled` になります。
use crate::api::PlatformApi;
use crate::api::types::ContentKind;
use crate::commands::authenticated_platform;
use crate::commands::result::{CommandResult, UploadResult, UploadStatus};
use crate::config::user::UserConfig;
use crate::domain::error::DomainError;
use crate::domain::notify::{Notification, NotificationBus, NotificationReceiver};
use crate::domain::session::SessionView;
use crate::domain::validator::UploadForm;
use crate::domain::{UploadOrchestrator, UploadOutcome};
use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const NOTIFICATION_CAPACITY: usize = 16;

/// アップロード要求（CLI 引数）
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: ContentKind,
    pub title: String,
    pub description: Option<String>,
    pub order: u32,
    pub section: Option<String>,
    pub video: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub solution: Option<PathBuf>,
    pub duration_secs: Option<f64>,
}

impl UploadRequest {
    fn into_form(self) -> UploadForm {
        let mut form = UploadForm::new(self.kind, self.title);
        form.section_id = self.section;
        form.description = self.description.unwrap_or_default();
        form.order = self.order;
        form.video = self.video;
        form.archive = self.archive;
        form.solution = self.solution;
        form.video_duration_secs = self.duration_secs;
        form
    }
}

/// 進捗と通知の受け手
///
/// 呼び出しは1つのタスクから順に行われる。
pub trait ProgressSink {
    fn on_view(&mut self, view: &SessionView);
    fn on_notification(&mut self, notification: &Notification);
    /// 送信終了時の最終ビュー
    fn finish(&mut self, view: &SessionView);
}

/// アップロードコマンドを実行
pub async fn execute<S: ProgressSink + ?Sized>(request: UploadRequest, sink: &mut S) -> Result<CommandResult> {
    let kind = request.kind;
    let title = request.title.clone();
    let form = request.into_form();

    let config = UserConfig::load().context("Failed to load configuration file")?;
    let platform = Arc::new(authenticated_platform(&config)?);

    let bus = NotificationBus::new(NOTIFICATION_CAPACITY);
    let mut notifications = bus.subscribe();
    let orchestrator = UploadOrchestrator::connect(platform, Arc::new(bus))
        .await
        .context("Failed to load storage configuration")?;

    let outcome = drive(&orchestrator, form, tokio::signal::ctrl_c(), &mut notifications, sink)
        .await
        .context("Upload failed")?;

    Ok(CommandResult::Upload(to_result(outcome, kind, title)))
}

/// 送信・割り込み・進捗の購読を1つのループで回す
async fn drive<A, F, S>(
    orchestrator: &UploadOrchestrator<A>,
    form: UploadForm,
    interrupt: F,
    notifications: &mut NotificationReceiver,
    sink: &mut S,
) -> Result<UploadOutcome, DomainError>
where
    A: PlatformApi,
    F: Future<Output = io::Result<()>>,
    S: ProgressSink + ?Sized,
{
    let mut views = orchestrator.session().subscribe();
    let submit = orchestrator.submit(form);
    tokio::pin!(submit);
    tokio::pin!(interrupt);

    let mut interrupted = false;
    let mut views_open = true;
    let mut notifications_open = true;

    let outcome = loop {
        tokio::select! {
            biased;

            outcome = &mut submit => break outcome,
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        info!("Interrupt received, canceling upload");
                        orchestrator.cancel().await;
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for interrupt signal"),
                }
            }
            changed = views.changed(), if views_open => match changed {
                Ok(()) => {
                    let view = views.borrow_and_update().clone();
                    sink.on_view(&view);
                }
                Err(_) => views_open = false,
            },
            received = notifications.recv(), if notifications_open => match received {
                Ok(notification) => sink.on_notification(&notification),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped upload notifications"),
                Err(RecvError::Closed) => notifications_open = false,
            },
        }
    };

    while let Ok(notification) = notifications.try_recv() {
        sink.on_notification(&notification);
    }
    sink.finish(&orchestrator.session().view());

    outcome
}

fn to_result(outcome: UploadOutcome, kind: ContentKind, title: String) -> UploadResult {
    match outcome {
        UploadOutcome::Completed {
            content_id,
            session_id,
            duration_secs,
        } => UploadResult {
            status: UploadStatus::Completed,
            kind,
            title,
            content_id: Some(content_id),
            session_id,
            duration_secs,
        },
        UploadOutcome::Canceled => UploadResult {
            status: UploadStatus::Canceled,
            kind,
            title,
            content_id: None,
            session_id: None,
            duration_secs: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::RemoteStatus;
    use crate::domain::notify::NotificationKind;
    use crate::domain::session::Stage;
    use crate::domain::testing::{FakePlatform, JobReply, SubmitReply, ramp, record};
    use std::future::pending;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        views: Vec<SessionView>,
        notifications: Vec<Notification>,
        finished: Option<SessionView>,
    }

    impl ProgressSink for RecordingSink {
        fn on_view(&mut self, view: &SessionView) {
            self.views.push(view.clone());
        }

        fn on_notification(&mut self, notification: &Notification) {
            self.notifications.push(notification.clone());
        }

        fn finish(&mut self, view: &SessionView) {
            self.finished = Some(view.clone());
        }
    }

    fn orchestrator(api: FakePlatform) -> (UploadOrchestrator<FakePlatform>, NotificationReceiver) {
        let storage = api.storage_config();
        let bus = NotificationBus::new(NOTIFICATION_CAPACITY);
        let notifications = bus.subscribe();
        (UploadOrchestrator::new(Arc::new(api), storage, Arc::new(bus)), notifications)
    }

    fn lecture_request(dir: &TempDir) -> UploadRequest {
        let video = dir.path().join("intro.mp4");
        std::fs::write(&video, vec![1u8; 128]).unwrap();
        UploadRequest {
            kind: ContentKind::Lecture,
            title: "Intro".to_string(),
            description: None,
            order: 1,
            section: Some("s1".to_string()),
            video: Some(video),
            archive: None,
            solution: None,
            duration_secs: None,
        }
    }

    #[test]
    fn test_request_into_form() {
        let request = UploadRequest {
            kind: ContentKind::Project,
            title: "Capstone".to_string(),
            description: Some("Final".to_string()),
            order: 3,
            section: Some("s9".to_string()),
            video: Some(PathBuf::from("a.mp4")),
            archive: Some(PathBuf::from("a.zip")),
            solution: None,
            duration_secs: Some(42.0),
        };

        let form = request.into_form();
        assert_eq!(form.kind, ContentKind::Project);
        assert_eq!(form.description, "Final");
        assert_eq!(form.order, 3);
        assert_eq!(form.section_id.as_deref(), Some("s9"));
        assert_eq!(form.video_duration_secs, Some(42.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_reports_views_and_success() {
        let dir = TempDir::new().unwrap();
        let api = FakePlatform::hosted_video();
        api.script_submit(ramp(1000, 4), SubmitReply::Record(record("c1", Some("vimeo"), None)));
        api.push_job(JobReply::snapshot(RemoteStatus::Completed, Some(100.0)));
        let (orchestrator, mut notifications) = orchestrator(api);
        let mut sink = RecordingSink::default();

        let outcome = drive(
            &orchestrator,
            lecture_request(&dir).into_form(),
            pending(),
            &mut notifications,
            &mut sink,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, UploadOutcome::Completed { .. }));
        assert!(sink.views.iter().any(|v| v.stage == Stage::Transferring));
        assert_eq!(sink.finished.unwrap().stage, Stage::Done);
        let kinds: Vec<_> = sink.notifications.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Success]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_cancels_upload() {
        let dir = TempDir::new().unwrap();
        let api = FakePlatform::hosted_video();
        api.script_submit(ramp(1000, 4), SubmitReply::Hang);
        let (orchestrator, mut notifications) = orchestrator(api);
        let mut sink = RecordingSink::default();

        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(())
        };
        let outcome = drive(
            &orchestrator,
            lecture_request(&dir).into_form(),
            interrupt,
            &mut notifications,
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(outcome, UploadOutcome::Canceled);
        assert_eq!(sink.finished.unwrap().stage, Stage::Idle);
        let kinds: Vec<_> = sink.notifications.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Canceled]);
    }

    #[test]
    fn test_canceled_outcome_has_no_ids() {
        let result = to_result(UploadOutcome::Canceled, ContentKind::Lecture, "Intro".to_string());
        assert_eq!(result.status, UploadStatus::Canceled);
        assert!(result.content_id.is_none());
        assert!(result.session_id.is_none());
    }
}
