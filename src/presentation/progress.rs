/// プレゼンテーション層: アップロード進捗の表示
///
/// ドメイン層の`SessionView`をUI表示に適した`DisplayProgress`へ変換し、
/// 人間向け（indicatif のプログレスバー、stderr）または
/// 機械向け（JSON Lines、stdout）に描画します。
///
/// # 設計方針
/// - `From<&SessionView>`で借用による変換（所有権を奪わない）
/// - `Option<DisplayProgress>`で表示抑制（idle）を明示的に表現
/// - フェーズ（ブラウザ送信 → サーバー側転送）が切り替わったらバーをリセットする
use crate::commands::upload::ProgressSink;
use crate::domain::notify::{Notification, NotificationKind};
use crate::domain::session::{SessionView, Stage};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}% {msg}";

/// 進捗表示のカテゴリ
///
/// バーのリセット単位。カテゴリが変わるとバーを作り直す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCategory {
    /// このクライアントからサーバーへの送信
    Upload,
    /// サーバーからホスティング先への転送
    HostedTransfer,
    /// 送信後の処理待ち
    Processing,
    Completed,
    Failed,
}

/// プレゼンテーション層用の進捗情報
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayProgress {
    pub message: String,
    pub category: ProgressCategory,
    /// 0〜100
    pub percent: u64,
    pub details: Option<String>,
}

impl From<&SessionView> for Option<DisplayProgress> {
    fn from(view: &SessionView) -> Self {
        let (category, message) = match view.stage {
            Stage::Idle => return None,
            Stage::Transferring => (ProgressCategory::Upload, "Uploading files".to_string()),
            Stage::ServerTracked => (
                ProgressCategory::HostedTransfer,
                "Transferring to hosting provider".to_string(),
            ),
            Stage::Processing => (ProgressCategory::Processing, "Processing upload".to_string()),
            Stage::Done => (ProgressCategory::Completed, "Upload complete".to_string()),
            Stage::Error => (
                ProgressCategory::Failed,
                match &view.error_message {
                    Some(message) => format!("Upload failed: {}", message),
                    None => "Upload failed".to_string(),
                },
            ),
        };

        Some(DisplayProgress {
            message,
            category,
            percent: view.percent.clamp(0.0, 100.0).round() as u64,
            details: format_details(view),
        })
    }
}

/// 転送量・速度・残り時間
fn format_details(view: &SessionView) -> Option<String> {
    let (sent, total) = match view.stage {
        Stage::ServerTracked | Stage::Processing => (view.server_bytes_sent, view.server_bytes_total),
        _ => (view.client_bytes_sent, view.client_bytes_total),
    };

    let mut parts = Vec::new();
    if let (Some(sent), Some(total)) = (sent, total) {
        parts.push(format!("{} / {}", format_bytes(sent), format_bytes(total)));
    }
    if let Some(speed) = view.speed_bytes_per_second
        && speed > 0.0
    {
        parts.push(format!("{}/s", format_bytes(speed as u64)));
    }
    if let Some(eta) = view.eta_seconds {
        parts.push(format!("ETA {}", format_eta(eta)));
    }

    (!parts.is_empty()).then(|| parts.join(", "))
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    if total >= 60 {
        format!("{}m{:02}s", total / 60, total % 60)
    } else {
        format!("{}s", total)
    }
}

/// 進捗表示を行わない受け手（`--progress` なし）
pub struct QuietProgress;

impl ProgressSink for QuietProgress {
    fn on_view(&mut self, _view: &SessionView) {}
    fn on_notification(&mut self, _notification: &Notification) {}
    fn finish(&mut self, _view: &SessionView) {}
}

/// indicatif によるプログレスバー（stderr）
#[derive(Default)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
    category: Option<ProgressCategory>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_for(&mut self, category: ProgressCategory) -> &ProgressBar {
        if self.category != Some(category) {
            // 新しいフェーズは 0% から描き直す
            if let Some(previous) = self.bar.take() {
                previous.finish_and_clear();
            }
            self.category = Some(category);
        }
        self.bar.get_or_insert_with(new_bar)
    }
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    match ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        Ok(style) => bar.set_style(style.progress_chars("#>-")),
        Err(e) => warn!(error = %e, "Invalid progress bar template"),
    }
    bar
}

impl ProgressSink for TerminalProgress {
    fn on_view(&mut self, view: &SessionView) {
        let Some(display) = Option::<DisplayProgress>::from(view) else {
            return;
        };
        if matches!(display.category, ProgressCategory::Completed | ProgressCategory::Failed) {
            // 完了表示は finish で行う
            return;
        }

        let bar = self.bar_for(display.category);
        bar.set_position(display.percent);
        match display.details {
            Some(details) => bar.set_message(format!("{} ({})", display.message, details)),
            None => bar.set_message(display.message),
        }
    }

    fn on_notification(&mut self, notification: &Notification) {
        // エラーは main のエラー表示に任せる
        if notification.kind == NotificationKind::Error {
            return;
        }
        let message = notification.message.clone();
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{}", message),
        }
    }

    fn finish(&mut self, view: &SessionView) {
        let Some(bar) = self.bar.take() else {
            return;
        };
        match view.stage {
            Stage::Done => {
                bar.set_position(100);
                bar.finish_with_message("Upload complete");
            }
            Stage::Error => bar.abandon_with_message("Upload failed"),
            _ => bar.abandon_with_message("Upload canceled"),
        }
        self.category = None;
    }
}

/// JSON Lines による機械向け進捗（stdout）
pub struct JsonProgress;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ProgressEvent<'a> {
    Progress(&'a SessionView),
    Notification(&'a Notification),
    Finished(&'a SessionView),
}

impl JsonProgress {
    fn emit(event: ProgressEvent<'_>) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to serialize progress event"),
        }
    }
}

impl ProgressSink for JsonProgress {
    fn on_view(&mut self, view: &SessionView) {
        Self::emit(ProgressEvent::Progress(view));
    }

    fn on_notification(&mut self, notification: &Notification) {
        Self::emit(ProgressEvent::Notification(notification));
    }

    fn finish(&mut self, view: &SessionView) {
        Self::emit(ProgressEvent::Finished(view));
    }
}

/// 出力モードに応じた受け手を選ぶ
pub fn sink_for(show_progress: bool, machine_output: bool) -> Box<dyn ProgressSink> {
    match (show_progress, machine_output) {
        (false, _) => Box::new(QuietProgress),
        (true, false) => Box::new(TerminalProgress::new()),
        (true, true) => Box::new(JsonProgress),
    }
}
