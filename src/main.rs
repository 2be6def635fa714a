mod api;
mod cli;
mod commands;
mod config;
mod domain;
mod error_severity;
mod presentation;

use api::error::InfraError;
use clap::Parser;
use cli::Cli;
use config::error::ConfigError;
use config::user::UserConfig;
use domain::error::DomainError;
use error_severity::ErrorSeverity;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let machine_output = cli.machine;
    init_tracing();

    let result = match cli::dispatch(cli).await {
        Ok(result) => presentation::output::output_result(&result, machine_output),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        handle_error(e, machine_output);
    }
}

/// ログ出力を初期化（stderr）
///
/// フィルタは `RUST_LOG` を優先し、無ければ config.toml の `log_level` を使う。
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = UserConfig::load()
            .map(|config| config.log_level)
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// エラーハンドリングとユーザーへの表示
///
/// anyhow::Error から元のエラー型を downcast して、
/// エラーの種類に応じた exit code とメッセージを決定する。
fn handle_error(error: anyhow::Error, machine_output: bool) {
    let severity = determine_severity(&error);
    let exit_code = severity.map(ErrorSeverity::exit_code).unwrap_or(1);
    let hint = get_error_hint(&error);

    if machine_output {
        let message = format!("{:#}", error);
        presentation::output::output_machine_error(&message, severity, exit_code, hint.as_deref());
        std::process::exit(exit_code);
    }

    eprintln!("Error: {}", error);

    // エラーチェーンを辿って詳細を表示
    let chain: Vec<_> = error.chain().skip(1).collect();
    if !chain.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            eprintln!("  {}: {}", i + 1, cause);
        }
    }

    if let Some(hint) = hint {
        eprintln!("\nHint: {}", hint);
    }

    std::process::exit(exit_code);
}

/// エラーチェーンから深刻度を決定
fn determine_severity(error: &anyhow::Error) -> Option<ErrorSeverity> {
    for cause in error.chain() {
        if let Some(domain_err) = cause.downcast_ref::<DomainError>() {
            return Some(domain_err.severity());
        }
        if let Some(infra_err) = cause.downcast_ref::<InfraError>() {
            return Some(infra_err.severity());
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return Some(config_err.severity());
        }
    }

    None
}

/// エラーに対するユーザー向けヒントを取得
fn get_error_hint(error: &anyhow::Error) -> Option<String> {
    for cause in error.chain() {
        if let Some(domain_err) = cause.downcast_ref::<DomainError>()
            && let Some(hint) = domain_err.hint()
        {
            return Some(hint.to_string());
        }
        if let Some(infra_err) = cause.downcast_ref::<InfraError>()
            && let Some(hint) = infra_err.hint()
        {
            return Some(hint.to_string());
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>()
            && let Some(hint) = config_err.hint()
        {
            return Some(hint.to_string());
        }
    }

    None
}
