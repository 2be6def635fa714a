/// 設定管理モジュール
///
/// このモジュールは2層の設定構造を提供します:
/// 1. AppConfig - コンパイル時定数として定義される静的設定（APP_CONFIG）
/// 2. UserConfig - 実行時に読み込まれる動的設定（トークン、エンドポイント、ログレベル）
///
/// # 使用例
///
/// ```ignore
/// use crate::config::{APP_CONFIG, UserConfig};
///
/// let base_delay = APP_CONFIG.polling.base_delay_ms;
///
/// let user_config = UserConfig::load()?;
/// let token = &user_config.get_auth()?.access_token;
/// ```
pub mod app;
pub mod error;
pub mod permissions;
pub mod user;

pub use app::APP_CONFIG;
pub use user::UserConfig;
