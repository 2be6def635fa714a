/// アプリケーション設定モジュール
///
/// コンパイル時定数として定義される静的設定を管理します。
/// これらの設定は実行時には変更できません（エンドポイントのみ UserConfig で上書き可能）。

/// 1MB のバイト数
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// アプリケーション全体の設定
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub polling: PollingConfig,
    pub processing: ProcessingConfig,
}

/// API関連の設定
#[derive(Debug, Clone, Copy)]
pub struct ApiConfig {
    /// プラットフォーム API のベースURL
    pub endpoint: &'static str,

    /// JSON リクエストのタイムアウト(秒)
    ///
    /// マルチパートのアップロード本体には適用しない。
    pub timeout_seconds: u64,

    /// 接続確立のタイムアウト(秒)
    pub connect_timeout_seconds: u64,
}

/// アップロード関連の設定
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    /// アップロード可能な最大ファイルサイズ (バイト)
    pub max_file_size: u64,

    /// 対応する動画フォーマット
    pub supported_formats: &'static [&'static str],

    /// 課題ファイルとして受け付けるアーカイブ形式
    pub archive_formats: &'static [&'static str],

    /// 動画の最短長さ（秒）
    pub min_video_duration_secs: f64,
}

/// ジョブポーリングの設定（ミリ秒）
#[derive(Debug, Clone, Copy)]
pub struct PollingConfig {
    /// 最初のポーリングまでの待機
    pub initial_delay_ms: u64,

    /// 定常時のポーリング間隔（バックオフの起点）
    pub base_delay_ms: u64,

    /// バックオフの上限
    pub max_delay_ms: u64,
}

/// ローカル処理完了待ちの設定
#[derive(Debug, Clone, Copy)]
pub struct ProcessingConfig {
    /// メタデータ取得の間隔（ミリ秒）
    pub interval_ms: u64,

    /// 最大試行回数
    pub max_attempts: u32,
}

/// グローバル設定定数
pub const APP_CONFIG: AppConfig = AppConfig {
    api: ApiConfig {
        endpoint: "https://api.lessonup.dev",
        timeout_seconds: 30,
        connect_timeout_seconds: 10,
    },
    upload: UploadConfig {
        max_file_size: 5 * 1024 * BYTES_PER_MB,
        supported_formats: &["mp4", "mov", "avi", "mkv", "webm"],
        archive_formats: &["zip"],
        min_video_duration_secs: 5.0,
    },
    polling: PollingConfig {
        initial_delay_ms: 1500,
        base_delay_ms: 2000,
        max_delay_ms: 30_000,
    },
    processing: ProcessingConfig {
        interval_ms: 3000,
        max_attempts: 300,
    },
};
