/// インフラ層のエラー定義
///
/// 外部システム（ファイルシステム、ネットワーク、プラットフォームAPI）との
/// やり取りで発生するエラーを構造化して定義。
use crate::error_severity::ErrorSeverity;
use serde::Deserialize;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfraError {
    /// ネットワークエラー
    #[error("network error: {message}")]
    Network { message: String },

    /// API通信エラー（非2xxレスポンス）
    #[error("API error: {endpoint} - {message}")]
    Api {
        endpoint: String,
        message: String,
        status_code: Option<u16>,
    },

    /// タイムアウトエラー
    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    /// レスポンスのデコード失敗
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// その他のI/Oエラー
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// サーバーが返すエラーボディ（形式は2通り）
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl InfraError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn api(endpoint: impl Into<String>, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
            status_code,
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTPステータスコード（API エラーの場合のみ）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }

    /// サーバーが返したユーザー向けメッセージ
    ///
    /// JSON ボディの `message` または `error` を優先し、
    /// JSON でなければ空でない本文をそのまま返す。
    pub fn server_message(&self) -> Option<String> {
        let Self::Api { message, .. } = self else {
            return None;
        };

        if let Ok(body) = serde_json::from_str::<ErrorBody>(message) {
            return body
                .message
                .or(body.error)
                .filter(|m| !m.trim().is_empty());
        }

        let trimmed = message.trim();
        if trimmed.is_empty() || trimmed.starts_with('<') {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self.status_code() {
            Some(401) | Some(403) => ErrorSeverity::ConfigError,
            _ => ErrorSeverity::SystemError,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self.status_code() {
            Some(401) | Some(403) => {
                Some("Your access token may be invalid or expired. Run 'lessonup login' again.")
            }
            Some(429) => Some("The server is rate limiting requests. Wait a moment and retry."),
            _ => match self {
                Self::Network { .. } | Self::Timeout { .. } => {
                    Some("Check your network connection and the configured api_endpoint.")
                }
                _ => None,
            },
        }
    }
}
