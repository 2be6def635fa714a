/// プレゼンテーション層: ユーザー入力処理
///
/// CLI引数やstdinからのユーザー入力を取得し、
/// アプリケーション層で使用可能な形式に変換します。
use crate::commands::login::LoginCredentials;
use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};

/// 対話的にアクセストークンを取得
pub fn read_credentials_interactive() -> Result<LoginCredentials> {
    eprintln!("Logging in to the course platform...");
    eprintln!();
    eprintln!("Please paste an access token from your instructor account settings.");
    eprintln!();

    eprint!("Access Token: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read access token from input")?;

    parse_token(&line)
}

/// stdin からパイプでアクセストークンを取得（1行目のみ使用）
pub fn read_credentials_from_stdin() -> Result<LoginCredentials> {
    read_credentials_from(io::stdin().lock())
}

fn read_credentials_from(mut reader: impl BufRead) -> Result<LoginCredentials> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read access token from stdin")?;

    parse_token(&line)
}

fn parse_token(line: &str) -> Result<LoginCredentials> {
    let token = line.trim();
    if token.is_empty() {
        bail!("Access token cannot be empty. Please provide a valid access token.");
    }
    if token.chars().any(char::is_whitespace) {
        bail!("Access token must not contain whitespace.");
    }

    Ok(LoginCredentials {
        access_token: token.to_string(),
    })
}
