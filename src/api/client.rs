/// HTTPクライアント
///
/// プラットフォーム API との通信を担当するHTTPクライアント。
/// タイムアウト、エラーハンドリング、Bearer 認証を含みます。
use crate::api::auth::AuthManager;
use crate::api::error::InfraError;
use crate::config::APP_CONFIG;
use reqwest::{Client, RequestBuilder, Response, multipart};
use std::time::Duration;

/// APIクライアントの結果型
type ApiResult<T> = Result<T, InfraError>;

/// APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: AuthManager,
    timeout: Duration,
}

impl ApiClient {
    /// 新しいAPIクライアントを作成
    ///
    /// 全体タイムアウトはクライアントに設定せず、JSON リクエストごとに付与する。
    /// 大きな動画のアップロードが途中で打ち切られないようにするため。
    ///
    /// # Arguments
    /// * `base_url` - APIのベースURL（例: "https://api.lessonup.dev"）
    /// * `auth` - 認証マネージャー
    pub fn new(base_url: impl Into<String>, auth: AuthManager) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(APP_CONFIG.api.connect_timeout_seconds))
            .build()
            .map_err(|e| InfraError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            timeout: Duration::from_secs(APP_CONFIG.api.timeout_seconds),
        })
    }

    /// GETリクエストを送信
    pub async fn get(&self, endpoint: &str) -> ApiResult<Response> {
        let request = self.client.get(self.build_url(endpoint)).timeout(self.timeout);
        self.send(request, endpoint, "GET").await
    }

    /// ボディなしのPOSTリクエストを送信
    pub async fn post_empty(&self, endpoint: &str) -> ApiResult<Response> {
        let request = self.client.post(self.build_url(endpoint)).timeout(self.timeout);
        self.send(request, endpoint, "POST").await
    }

    /// JSONボディのPUTリクエストを送信
    pub async fn put_json<T: serde::Serialize>(&self, endpoint: &str, body: &T) -> ApiResult<Response> {
        let request = self
            .client
            .put(self.build_url(endpoint))
            .timeout(self.timeout)
            .json(body);
        self.send(request, endpoint, "PUT").await
    }

    /// マルチパートフォームのPOSTリクエストを送信（タイムアウトなし）
    pub async fn post_multipart(&self, endpoint: &str, form: multipart::Form) -> ApiResult<Response> {
        let request = self.client.post(self.build_url(endpoint)).multipart(form);
        self.send(request, endpoint, "POST").await
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 認証ヘッダーを付与して送信し、送信エラーを分類する
    async fn send(&self, request: RequestBuilder, endpoint: &str, method: &str) -> ApiResult<Response> {
        request
            .header("Authorization", self.auth.get_auth_header())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InfraError::timeout(format!("{} {}", method, endpoint))
                } else if e.is_connect() {
                    InfraError::network(format!("Connection failed for {} {}: {}", method, endpoint, e))
                } else {
                    InfraError::network(format!("Request failed for {} {}: {}", method, endpoint, e))
                }
            })
    }

    /// レスポンスをチェックしてエラーを返す
    ///
    /// # Arguments
    /// * `response` - HTTPレスポンス
    /// * `endpoint` - エンドポイント名（エラーメッセージ用）
    pub async fn check_response(response: Response, endpoint: &str) -> ApiResult<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(InfraError::api(endpoint, error_body, Some(status.as_u16())))
    }

    /// JSONレスポンスをデシリアライズ
    pub async fn parse_json<T: serde::de::DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> ApiResult<T> {
        response
            .json()
            .await
            .map_err(|e| InfraError::decode(endpoint, e.to_string()))
    }
}
