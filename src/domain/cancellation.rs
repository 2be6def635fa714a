/// キャンセル制御
///
/// 「キャンセル要求済み」フラグと、進行中の転送を中断するトークンを持つ。
/// 転送の完了ハンドラーはフラグを見て、利用者のキャンセルと本当の失敗を区別する。
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CancellationController {
    requested: AtomicBool,
    transfer: Mutex<Option<CancellationToken>>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい転送用のトークンを発行する（フラグは下ろす）
    ///
    /// 前の転送のトークンが残っていれば中断される。
    pub fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .transfer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        self.requested.store(false, Ordering::SeqCst);
        token
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// 転送が進行中か（トークンが発行済みで未発火）
    pub fn is_armed(&self) -> bool {
        self.transfer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// 進行中の転送を中断する
    pub fn abort_transfer(&self) {
        let token = self.transfer.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(token) = token {
            debug!("Aborting in-flight transfer");
            token.cancel();
        }
    }

    /// 転送が終わったのでトークンを手放す（中断はしない）
    pub fn disarm(&self) {
        self.transfer.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_clears_request_flag() {
        let controller = CancellationController::new();
        controller.request();
        assert!(controller.is_requested());

        let token = controller.arm();
        assert!(!controller.is_requested());
        assert!(!token.is_cancelled());
        assert!(controller.is_armed());
    }

    #[test]
    fn test_abort_fires_token_once() {
        let controller = CancellationController::new();
        let token = controller.arm();
        controller.abort_transfer();
        assert!(token.is_cancelled());
        assert!(!controller.is_armed());

        // 2回目は何もしない
        controller.abort_transfer();
    }

    #[test]
    fn test_rearm_aborts_previous_transfer() {
        let controller = CancellationController::new();
        let first = controller.arm();
        let second = controller.arm();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_disarm_keeps_token_alive() {
        let controller = CancellationController::new();
        let token = controller.arm();
        controller.disarm();
        controller.abort_transfer();
        assert!(!token.is_cancelled());
    }
}
