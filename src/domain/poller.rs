/// ジョブポーラー
///
/// サーバー側のアップロードジョブ（外部ホスティングへの転送）の状態を
/// 繰り返し取得し、進捗・速度・残り時間を求める。
///
/// 固定間隔のタイマーは使わず、1回のポーリングが終わるたびに次の実行を
/// 遅延付きでスケジュールし直す。これにより間隔をバックオフで伸ばせる。
///
/// - 404: ジョブがまだ見えていないだけなので `queued` とみなし、間隔は据え置く
/// - 429 / 通信失敗: 間隔を倍にする（上限あり）。利用者には通知しない
/// - 成功: 現在の間隔のまま継続（リセットは新しいジョブのときだけ）
/// - completed / failed / canceled: 以降そのジョブはポーリングしない
use crate::api::PlatformApi;
use crate::api::error::InfraError;
use crate::api::types::{JobSnapshot, RemoteStatus};
use crate::config::APP_CONFIG;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// ポーリング間隔の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub initial_delay: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        let polling = APP_CONFIG.polling;
        Self {
            initial_delay: Duration::from_millis(polling.initial_delay_ms),
            base_delay: Duration::from_millis(polling.base_delay_ms),
            max_delay: Duration::from_millis(polling.max_delay_ms),
        }
    }
}

/// 倍々で伸びる待機時間（上限付き）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            current: base,
            base,
            max,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// 間隔を倍にして新しい値を返す
    pub fn grow(&mut self) -> Duration {
        self.current = self.current.saturating_mul(2).min(self.max);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// 連続するサンプルから転送速度を求める
///
/// 時刻が前後したサンプルやバイト数が減ったサンプルは捨てる。
#[derive(Debug, Clone, Default)]
pub struct SpeedTracker {
    last: Option<(Instant, u64)>,
    speed: Option<f64>,
}

impl SpeedTracker {
    pub fn observe(&mut self, at: Instant, bytes: u64) -> Option<f64> {
        match self.last {
            None => self.last = Some((at, bytes)),
            Some((prev_at, prev_bytes)) => {
                if at <= prev_at || bytes < prev_bytes {
                    debug!(bytes, prev_bytes, "discarding out-of-order speed sample");
                    return self.speed;
                }
                let elapsed = at.duration_since(prev_at).as_secs_f64();
                self.speed = Some((bytes - prev_bytes) as f64 / elapsed);
                self.last = Some((at, bytes));
            }
        }
        self.speed
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn eta_seconds(speed: Option<f64>, uploaded: Option<u64>, total: Option<u64>) -> Option<f64> {
    match (speed, uploaded, total) {
        (Some(speed), Some(uploaded), Some(total)) if speed > 0.0 && total >= uploaded => {
            Some((total - uploaded) as f64 / speed)
        }
        _ => None,
    }
}

/// 1回のポーリング結果（オブザーバーへ渡す）
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub job_id: String,
    pub remote_status: RemoteStatus,
    pub percent: Option<f64>,
    pub bytes_uploaded: Option<u64>,
    pub total_bytes: Option<u64>,
    pub speed_bytes_per_second: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub error: Option<String>,
}

impl PollUpdate {
    fn queued(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            remote_status: RemoteStatus::Queued,
            percent: None,
            bytes_uploaded: None,
            total_bytes: None,
            speed_bytes_per_second: None,
            eta_seconds: None,
            error: None,
        }
    }
}

/// ポーリング結果の受け手
pub trait PollObserver: Send + Sync + 'static {
    fn on_poll(&self, update: PollUpdate);
}

#[derive(Debug)]
struct PollerState {
    job_id: Option<String>,
    /// `start_polling` / `stop_polling` のたびに進む。古い予約はこれで無効になる
    generation: u64,
    backoff: Backoff,
    in_flight: bool,
    halted: bool,
    speed: SpeedTracker,
    remote_status: Option<RemoteStatus>,
    last_error: Option<String>,
    cancel: CancellationToken,
}

pub struct JobPoller<A: PlatformApi> {
    api: Arc<A>,
    timing: PollTiming,
    state: Arc<Mutex<PollerState>>,
}

impl<A: PlatformApi> Clone for JobPoller<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            timing: self.timing,
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: PlatformApi> JobPoller<A> {
    pub fn new(api: Arc<A>, timing: PollTiming) -> Self {
        let state = PollerState {
            job_id: None,
            generation: 0,
            backoff: Backoff::new(timing.base_delay, timing.max_delay),
            in_flight: false,
            halted: true,
            speed: SpeedTracker::default(),
            remote_status: None,
            last_error: None,
            cancel: CancellationToken::new(),
        };
        Self {
            api,
            timing,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, PollerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ジョブの状態を1回取得する
    pub async fn poll(&self, job_id: &str) -> Result<JobSnapshot, InfraError> {
        self.api.fetch_job(job_id).await
    }

    /// 新しいジョブのポーリングを開始する
    ///
    /// 以前のジョブの予約はすべて無効になり、バックオフは基準値に戻る。
    pub fn start_polling(&self, job_id: &str, observer: Arc<dyn PollObserver>) {
        let generation = {
            let mut state = self.state();
            state.cancel.cancel();
            state.cancel = CancellationToken::new();
            state.generation += 1;
            state.job_id = Some(job_id.to_string());
            state.backoff.reset();
            state.speed.reset();
            state.in_flight = false;
            state.halted = false;
            state.remote_status = None;
            state.last_error = None;
            state.generation
        };

        info!(job_id, "Starting job polling");
        self.schedule(generation, self.timing.initial_delay, observer);
    }

    /// ポーリングを止める
    ///
    /// 戻った時点で以降のポーリングは一切行われない。
    pub fn stop_polling(&self) {
        let mut state = self.state();
        if !state.halted {
            debug!(job_id = ?state.job_id, "Stopping job polling");
        }
        state.halted = true;
        state.in_flight = false;
        state.generation += 1;
        state.cancel.cancel();
    }

    pub fn is_polling(&self) -> bool {
        !self.state().halted
    }

    pub fn current_delay(&self) -> Duration {
        self.state().backoff.current()
    }

    pub fn remote_status(&self) -> Option<RemoteStatus> {
        self.state().remote_status
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// 次のポーリングを予約する
    fn schedule(&self, generation: u64, delay: Duration, observer: Arc<dyn PollObserver>) {
        let token = {
            let state = self.state();
            if state.generation != generation || state.halted {
                return;
            }
            state.cancel.clone()
        };

        let poller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => poller.tick(generation, observer).await,
            }
        });
    }

    /// 予約されたポーリングを1回実行する
    pub(crate) async fn tick(&self, generation: u64, observer: Arc<dyn PollObserver>) {
        let (job_id, token) = {
            let mut state = self.state();
            if state.generation != generation || state.halted {
                return;
            }
            if state.in_flight {
                debug!("Previous poll still in flight, skipping tick");
                return;
            }
            let Some(job_id) = state.job_id.clone() else {
                return;
            };
            state.in_flight = true;
            (job_id, state.cancel.clone())
        };

        debug!(job_id = %job_id, "Polling upload job");
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = self.poll(&job_id) => result,
        };

        let (update, next_delay) = {
            let mut state = self.state();
            if state.generation != generation || state.halted {
                debug!(job_id = %job_id, "Discarding poll result for superseded job");
                return;
            }
            state.in_flight = false;

            match result {
                Ok(snapshot) => {
                    state.remote_status = Some(snapshot.status);
                    state.last_error = snapshot.error.clone();
                    let speed = match snapshot.bytes_uploaded {
                        Some(bytes) => state.speed.observe(Instant::now(), bytes),
                        None => state.speed.speed(),
                    };

                    let next = if snapshot.status.is_terminal() {
                        info!(job_id = %job_id, status = %snapshot.status, "Upload job reached terminal status");
                        state.halted = true;
                        None
                    } else {
                        Some(state.backoff.current())
                    };

                    let update = PollUpdate {
                        job_id: job_id.clone(),
                        remote_status: snapshot.status,
                        percent: snapshot.percent,
                        bytes_uploaded: snapshot.bytes_uploaded,
                        total_bytes: snapshot.total_bytes,
                        speed_bytes_per_second: speed,
                        eta_seconds: eta_seconds(speed, snapshot.bytes_uploaded, snapshot.total_bytes),
                        error: snapshot.error,
                    };
                    (Some(update), next)
                }
                Err(e) if e.is_not_found() => {
                    debug!(job_id = %job_id, "Upload job not visible yet");
                    state.remote_status = Some(RemoteStatus::Queued);
                    state.last_error = None;
                    (Some(PollUpdate::queued(&job_id)), Some(state.backoff.current()))
                }
                Err(e) => {
                    let delay = state.backoff.grow();
                    if e.is_rate_limited() {
                        warn!(job_id = %job_id, delay_ms = delay.as_millis() as u64, "Job polling rate limited, backing off");
                    } else {
                        warn!(job_id = %job_id, error = %e, delay_ms = delay.as_millis() as u64, "Job poll failed, backing off");
                    }
                    state.last_error = Some(e.to_string());
                    (None, Some(delay))
                }
            }
        };

        if let Some(update) = update {
            observer.on_poll(update);
        }
        if let Some(delay) = next_delay {
            self.schedule(generation, delay, observer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{FakePlatform, JobReply};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        updates: StdMutex<Vec<PollUpdate>>,
    }

    impl Recorder {
        fn statuses(&self) -> Vec<RemoteStatus> {
            self.updates.lock().unwrap().iter().map(|u| u.remote_status).collect()
        }
    }

    impl PollObserver for Recorder {
        fn on_poll(&self, update: PollUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    fn poller(api: &Arc<FakePlatform>) -> JobPoller<FakePlatform> {
        JobPoller::new(Arc::clone(api), PollTiming::default())
    }

    #[test]
    fn test_backoff_sequence_is_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(2000), Duration::from_millis(30000));
        let mut seen = vec![backoff.current().as_millis()];
        for _ in 0..5 {
            seen.push(backoff.grow().as_millis());
        }
        assert_eq!(seen, vec![2000, 4000, 8000, 16000, 30000, 30000]);

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_discards_regressed_samples() {
        let mut tracker = SpeedTracker::default();
        let t0 = Instant::now();
        assert_eq!(tracker.observe(t0, 1000), None);
        assert_eq!(tracker.observe(t0 + Duration::from_secs(2), 3000), Some(1000.0));
        // バイト数の後退は捨てる
        assert_eq!(tracker.observe(t0 + Duration::from_secs(3), 500), Some(1000.0));
        // 時刻の逆行も捨てる
        assert_eq!(tracker.observe(t0 + Duration::from_secs(1), 9000), Some(1000.0));
        assert_eq!(tracker.observe(t0 + Duration::from_secs(4), 7000), Some(2000.0));
    }

    #[test]
    fn test_eta() {
        assert_eq!(eta_seconds(Some(100.0), Some(200), Some(1200)), Some(10.0));
        assert_eq!(eta_seconds(Some(0.0), Some(200), Some(1200)), None);
        assert_eq!(eta_seconds(Some(100.0), None, Some(1200)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_polls_back_off() {
        let api = Arc::new(FakePlatform::new());
        for _ in 0..6 {
            api.push_job(JobReply::Status(429));
        }
        api.push_job(JobReply::snapshot(RemoteStatus::Completed, Some(100.0)));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        let start = Instant::now();
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_secs(200)).await;

        let offsets: Vec<u128> = api
            .job_poll_times()
            .iter()
            .map(|t| t.duration_since(start).as_millis())
            .collect();
        let gaps: Vec<u128> = offsets.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(offsets[0], 1500);
        assert_eq!(gaps, vec![4000, 8000, 16000, 30000, 30000, 30000]);
        // 429 はオブザーバーに届かない
        assert_eq!(recorder.statuses(), vec![RemoteStatus::Completed]);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_doubles_delay() {
        let api = Arc::new(FakePlatform::new());
        api.push_job(JobReply::Network);
        api.push_job(JobReply::Network);
        api.push_job(JobReply::snapshot(RemoteStatus::Uploading, Some(25.0)));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        let start = Instant::now();
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_millis(1500 + 4000 + 8000 + 1)).await;

        let offsets: Vec<u128> = api
            .job_poll_times()
            .iter()
            .map(|t| t.duration_since(start).as_millis())
            .collect();
        assert_eq!(offsets, vec![1500, 5500, 13500]);
        assert_eq!(poller.current_delay(), Duration::from_millis(8000));
        // 通信失敗はオブザーバーに届かない
        assert_eq!(recorder.statuses(), vec![RemoteStatus::Uploading]);
        poller.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_queued_and_holds_delay() {
        let api = Arc::new(FakePlatform::new());
        api.push_job(JobReply::Status(429));
        api.push_job(JobReply::Status(404));
        api.push_job(JobReply::Status(404));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_millis(1500 + 4000 + 4000 + 1)).await;

        assert_eq!(api.job_poll_times().len(), 3);
        assert_eq!(poller.current_delay(), Duration::from_millis(4000));
        assert_eq!(poller.remote_status(), Some(RemoteStatus::Queued));
        assert!(poller.last_error().is_none());
        assert_eq!(recorder.statuses(), vec![RemoteStatus::Queued, RemoteStatus::Queued]);
        poller.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_keeps_current_delay() {
        let api = Arc::new(FakePlatform::new());
        api.push_job(JobReply::Status(429));
        api.push_job(JobReply::snapshot(RemoteStatus::Uploading, Some(10.0)));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_millis(1500 + 4000 + 1)).await;
        assert_eq!(poller.current_delay(), Duration::from_millis(4000));

        // 新しいジョブでリセット
        poller.start_polling("job-2", recorder.clone());
        assert_eq!(poller.current_delay(), Duration::from_millis(2000));
        poller.stop_polling();
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_halts_polling() {
        let api = Arc::new(FakePlatform::new());
        api.push_job(JobReply::snapshot(RemoteStatus::Failed, None));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.job_poll_times().len(), 1);
        assert!(!poller.is_polling());

        // 既に予約済みの tick が来ても何もしない
        let stale_generation = poller.state().generation;
        poller.tick(stale_generation, recorder.clone()).await;
        assert_eq!(api.job_poll_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_polling_is_immediate() {
        let api = Arc::new(FakePlatform::new());
        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        poller.start_polling("job-1", recorder.clone());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        poller.stop_polling();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(api.job_poll_times().is_empty());
        assert!(recorder.statuses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        let api = Arc::new(FakePlatform::new());
        api.hold_job_polls();
        api.push_job(JobReply::snapshot(RemoteStatus::Uploading, Some(5.0)));

        let poller = poller(&api);
        let recorder = Arc::new(Recorder::default());
        poller.start_polling("job-1", recorder.clone());
        let generation = poller.state().generation;

        // 最初の tick がリクエスト待ちで止まっている間に2回目を発火
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(api.job_poll_times().len(), 1);
        poller.tick(generation, recorder.clone()).await;
        assert_eq!(api.job_poll_times().len(), 1);

        api.release_job_polls();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.statuses(), vec![RemoteStatus::Uploading]);
        poller.stop_polling();
    }
}
