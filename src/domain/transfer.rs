/// 転送モニター
///
/// ブラウザ（クライアント）からサーバーへの送信バイト数のサンプルを受け取り、
/// 0〜100 のパーセンテージに変換する。
///
/// リモート追跡が必要なセッションでは、送信完了時に 100% を報告せず
/// `ClientPhaseComplete` を返す。コーディネーターはこれを受けて表示を 0% に戻し、
/// サーバー側の進捗に切り替える（意図したフェーズ切り替えとして扱う）。
use crate::api::upload::TransferSample;

/// モニターの出力
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferSignal {
    /// 送信途中の進捗
    Progress(f64),
    /// 送信完了、以降はサーバー側の進捗を表示する
    ClientPhaseComplete,
    /// 送信完了、リモート追跡なし（100%）
    Finished,
    /// 計算できない、または完了済みのため無視
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct TransferMonitor {
    tracks_remote: bool,
    last_percent: f64,
    complete: bool,
}

impl TransferMonitor {
    pub fn new(tracks_remote: bool) -> Self {
        Self {
            tracks_remote,
            last_percent: 0.0,
            complete: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn last_percent(&self) -> f64 {
        self.last_percent
    }

    /// サンプルから完了率（0.0〜1.0 以上）を求める
    fn ratio(sample: &TransferSample) -> Option<f64> {
        match (sample.bytes_total, sample.fraction) {
            (Some(total), _) if total > 0 => Some(sample.bytes_sent as f64 / total as f64),
            (_, Some(fraction)) if fraction.is_finite() => Some(fraction),
            _ => None,
        }
    }

    pub fn observe(&mut self, sample: TransferSample) -> TransferSignal {
        if self.complete {
            return TransferSignal::Ignored;
        }

        let Some(ratio) = Self::ratio(&sample) else {
            return TransferSignal::Ignored;
        };

        if ratio >= 1.0 {
            self.complete = true;
            return if self.tracks_remote {
                TransferSignal::ClientPhaseComplete
            } else {
                self.last_percent = 100.0;
                TransferSignal::Finished
            };
        }

        // 完了前は 100 未満に留め、後退もさせない
        let percent = (ratio * 100.0).clamp(0.0, 99.9);
        self.last_percent = self.last_percent.max(percent);
        TransferSignal::Progress(self.last_percent)
    }
}
