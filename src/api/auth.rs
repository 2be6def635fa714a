/// 認証マネージャー
///
/// プラットフォームの Bearer トークンを保持し、Authorization ヘッダーを生成します。
/// トークン自体の発行・保存は外部（login コマンドと UserConfig）の責務です。

/// 認証マネージャー
#[derive(Clone)]
pub struct AuthManager {
    access_token: String,
}

impl AuthManager {
    /// 新しい認証マネージャーを作成
    ///
    /// # Arguments
    /// * `access_token` - プラットフォームのアクセストークン
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }

    /// Authorization ヘッダーの値を生成
    ///
    /// # Returns
    /// "Bearer <token>" 形式の文字列
    pub fn get_auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// トークンをマスキングして表示
    pub fn get_masked_token(&self) -> String {
        let chars: Vec<char> = self.access_token.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}***{}", head, tail)
        }
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("access_token", &self.get_masked_token())
            .finish()
    }
}
