pub mod assign_url;
pub mod cancel_job;
pub mod job;
pub mod login;
pub mod logout;
pub mod result;
pub mod status;
pub mod upload;

use crate::api::HttpPlatform;
use crate::api::auth::AuthManager;
use crate::api::client::ApiClient;
use crate::config::UserConfig;
use anyhow::{Context, Result};

/// 保存済みのトークンでプラットフォーム API クライアントを作る
pub(crate) fn authenticated_platform(config: &UserConfig) -> Result<HttpPlatform> {
    let auth = config
        .get_auth()
        .context("Failed to retrieve authentication credentials")?;
    platform_with_token(config, auth.access_token.clone())
}

/// 指定したトークンでプラットフォーム API クライアントを作る
pub(crate) fn platform_with_token(config: &UserConfig, access_token: String) -> Result<HttpPlatform> {
    let client = ApiClient::new(config.endpoint(), AuthManager::new(access_token))
        .context("Failed to initialize API client")?;
    Ok(HttpPlatform::new(client))
}
