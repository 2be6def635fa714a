/// プレゼンテーション層: コマンド結果の出力
///
/// コマンド実行結果をユーザー向け（人間可読、stderr）または
/// 機械向け（JSON、stdout）形式で出力する責務を担います。
/// 使用方法の表示は clap が担当します。
use crate::commands::result::{CommandResult, UploadStatus};
use crate::error_severity::ErrorSeverity;
use anyhow::Result;
use serde_json::{Value, json};

/// コマンド結果を適切な形式で出力する
///
/// * `machine_output = false`: 人間向けの詳細メッセージ（stderr）
/// * `machine_output = true`: 機械可読JSON（stdout）
pub fn output_result(result: &CommandResult, machine_output: bool) -> Result<()> {
    if machine_output {
        println!("{}", serde_json::to_string(&machine_readable(result)?)?);
    } else {
        output_human_readable(result);
    }

    Ok(())
}

/// 人間向けの詳細メッセージを出力（stderr）
///
/// stdout はパイプライン用に予約されます。
fn output_human_readable(result: &CommandResult) {
    match result {
        CommandResult::Login(r) => {
            eprintln!();
            eprintln!("{}", result.success_message());
            if r.was_logged_in {
                eprintln!("The new access token has been saved.");
            } else {
                eprintln!("Your access token has been saved.");
            }
        }
        CommandResult::Logout(r) => {
            eprintln!("{}", result.success_message());
            if r.was_logged_in {
                eprintln!("The stored access token has been removed.");
            }
        }
        CommandResult::Status(r) => {
            eprintln!();
            if r.is_authenticated {
                eprintln!("Authenticated");
                if let Some(token) = &r.token {
                    eprintln!("Token:    {}", token);
                }
                eprintln!("Endpoint: {}", r.endpoint);
                if let Some(storage) = &r.storage {
                    eprintln!();
                    eprintln!("Storage:");
                    eprintln!("  Video:  {}", storage.video_provider);
                    eprintln!("  Files:  {}", storage.file_provider);
                    eprintln!(
                        "  Hosted video transfer: {}",
                        if storage.is_hosted_video_enabled { "enabled" } else { "disabled" }
                    );
                }
            } else if let Some(token) = &r.token {
                eprintln!("✗ Authentication failed");
                eprintln!("  Token:    {}", token);
                eprintln!("  Endpoint: {}", r.endpoint);
                eprintln!();
                eprintln!("Your access token may be invalid or expired.");
                eprintln!("Please run 'lessonup login' to update it.");
            } else {
                eprintln!("Not logged in");
                eprintln!("Please run 'lessonup login' to authenticate.");
            }
        }
        CommandResult::Upload(r) => match r.status {
            UploadStatus::Completed => {
                eprintln!();
                eprintln!("{}", result.success_message());
                eprintln!("---");
                if let Some(content_id) = &r.content_id {
                    eprintln!("Content ID: {}", content_id);
                }
                if let Some(session_id) = &r.session_id {
                    eprintln!("Upload session: {}", session_id);
                }
                if let Some(duration) = r.duration_secs {
                    let minutes = (duration / 60.0) as u64;
                    let seconds = (duration % 60.0) as u64;
                    eprintln!("Duration: {}:{:02}", minutes, seconds);
                }
                eprintln!("---");
            }
            UploadStatus::Canceled => eprintln!("{}", result.success_message()),
        },
        CommandResult::Job(r) => {
            eprintln!();
            eprintln!("Job ID: {}", r.job_id);
            eprintln!("Status: {}", r.snapshot.status);
            if r.not_yet_created {
                eprintln!("The server has not created this job yet.");
            }
            if let Some(percent) = r.snapshot.percent {
                eprintln!("Progress: {:.1}%", percent);
            }
            if let (Some(sent), Some(total)) = (r.snapshot.bytes_uploaded, r.snapshot.total_bytes) {
                eprintln!("Transferred: {} / {} bytes", sent, total);
            }
            if let Some(error) = &r.snapshot.error {
                eprintln!("Error: {}", error);
            }
        }
        CommandResult::CancelJob(_) => eprintln!("{}", result.success_message()),
        CommandResult::AssignUrl(r) => {
            eprintln!("{}", result.success_message());
            eprintln!("URL: {}", r.hosted_url);
            if let Some(storage_type) = &r.storage_type {
                eprintln!("Storage: {}", storage_type);
            }
        }
    }
}

/// 機械可読JSONを組み立てる
///
/// 結果の各フィールドに `success: true` を加えたフラットなオブジェクト。
fn machine_readable(result: &CommandResult) -> Result<Value> {
    let mut value = serde_json::to_value(result)?;
    if let Value::Object(map) = &mut value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(value)
}

/// `--machine` モードのエラーオブジェクト（stdout）
pub fn output_machine_error(message: &str, severity: Option<ErrorSeverity>, exit_code: i32, hint: Option<&str>) {
    let json = json!({
        "success": false,
        "error": message,
        "severity": severity,
        "exit_code": exit_code,
        "hint": hint,
    });
    println!("{}", json);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ContentKind;
    use crate::commands::result::{LoginResult, StatusResult, UploadResult};

    #[test]
    fn test_machine_readable_login() {
        let result = CommandResult::Login(LoginResult { was_logged_in: false });

        let json = machine_readable(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["command"], "login");
        assert_eq!(json["was_logged_in"], false);
    }

    #[test]
    fn test_machine_readable_status_without_token() {
        let result = CommandResult::Status(StatusResult {
            is_authenticated: false,
            token: None,
            endpoint: "https://api.example.com".to_string(),
            storage: None,
        });

        let json = machine_readable(&result).unwrap();
        assert_eq!(json["command"], "status");
        assert!(json["token"].is_null());
    }

    #[test]
    fn test_machine_readable_upload() {
        let result = CommandResult::Upload(UploadResult {
            status: UploadStatus::Completed,
            kind: ContentKind::Assignment,
            title: "Homework".to_string(),
            content_id: Some("c42".to_string()),
            session_id: None,
            duration_secs: None,
        });

        let json = machine_readable(&result).unwrap();
        assert_eq!(json["command"], "upload");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["kind"], "assignment");
        assert_eq!(json["content_id"], "c42");
    }

    #[test]
    fn test_output_result_both_modes() {
        let result = CommandResult::Login(LoginResult { was_logged_in: true });
        assert!(output_result(&result, true).is_ok());
        assert!(output_result(&result, false).is_ok());
    }
}
