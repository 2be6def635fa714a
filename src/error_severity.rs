//! プレゼンテーション層が使用するエラー深刻度
//!
//! このモジュールはアーキテクチャの最外層に属し、終了コードの決定に使用される。
//! 内側層（domain, api, config）はこのモジュールに依存してよいが、
//! このモジュールは他のモジュールに依存しない。

use serde::Serialize;
use std::fmt;

/// エラーの深刻度と対応する終了コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// ユーザーの入力エラー
    ///
    /// 必須ファイルの欠落、拡張子の誤り、短すぎる動画など、
    /// ユーザーが直せるもの。
    ///
    /// **Exit Code: 1**
    UserError,

    /// 設定エラー
    ///
    /// トークン未設定、設定ファイル破損など。
    ///
    /// **Exit Code: 2**
    ConfigError,

    /// システムエラー
    ///
    /// ネットワーク障害、サーバー側の失敗、処理タイムアウトなど。
    ///
    /// **Exit Code: 3**
    SystemError,
}

impl ErrorSeverity {
    /// 対応する Unix 終了コードを返す
    pub fn exit_code(self) -> i32 {
        match self {
            Self::UserError => 1,
            Self::ConfigError => 2,
            Self::SystemError => 3,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserError => write!(f, "user error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::SystemError => write!(f, "system error"),
        }
    }
}
