/// 利用者向け通知の送出口
///
/// オーケストレーションは `Notifier` に `notify(kind, message)` するだけで、
/// 表示方法は購読側（presentation）が決める。
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    /// 中立的な通知（エラー扱いしない）
    Canceled,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Canceled => "canceled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

pub type NotificationReceiver = broadcast::Receiver<Notification>;

/// broadcast チャネルによる通知バス
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }
}

impl Notifier for NotificationBus {
    fn notify(&self, kind: NotificationKind, message: &str) {
        let notification = Notification {
            kind,
            message: message.to_string(),
        };
        // 購読者が居なければ捨てる
        if self.sender.send(notification).is_err() {
            debug!(%kind, "No notification subscribers");
        }
    }
}
