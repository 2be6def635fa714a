use crate::api::types::ContentKind;
use crate::commands::{self, result::CommandResult, upload::UploadRequest};
use crate::presentation::{input, progress};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lessonup")]
#[command(about = "Upload lectures, assignments and projects to the course platform")]
#[command(version)]
pub struct Cli {
    /// Output machine-readable JSON to stdout (success and error cases)
    #[arg(long, global = true)]
    pub machine: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an access token for the platform API
    Login {
        /// Read the token from the first line of standard input
        #[arg(long)]
        stdin: bool,
    },
    /// Remove the stored access token
    Logout,
    /// Check authentication status and storage configuration
    Status,
    /// Upload section content (lecture, assignment or project)
    Upload {
        /// Content kind: lecture, assignment or project
        kind: ContentKind,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Position within the section
        #[arg(long, default_value_t = 0)]
        order: u32,

        /// Section the content belongs to
        #[arg(long)]
        section: Option<String>,

        /// Video file (lecture, project)
        #[arg(long)]
        video: Option<PathBuf>,

        /// Zip archive (assignment, project)
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Optional solution archive
        #[arg(long)]
        solution: Option<PathBuf>,

        /// Known video duration in seconds
        #[arg(long = "duration")]
        duration_secs: Option<f64>,

        /// Show upload progress (stderr, or JSON lines on stdout with --machine)
        #[arg(long)]
        progress: bool,
    },
    /// Show the status of a server-side upload job
    Job {
        /// Upload job (session) ID
        id: String,
    },
    /// Ask the server to cancel an upload job
    CancelJob {
        id: String,
    },
    /// Attach an already hosted video URL to existing content
    AssignUrl {
        content_id: String,
        url: String,
    },
}

/// 解析済みの引数を適切なコマンドにディスパッチする
pub async fn dispatch(cli: Cli) -> Result<CommandResult> {
    let machine = cli.machine;

    match cli.command {
        Command::Login { stdin } => {
            let credentials = if stdin {
                input::read_credentials_from_stdin()?
            } else {
                input::read_credentials_interactive()?
            };
            commands::login::execute(credentials)
                .await
                .context("Login command failed")
        }
        Command::Logout => commands::logout::execute()
            .await
            .context("Logout command failed"),
        Command::Status => commands::status::execute()
            .await
            .context("Status command failed"),
        Command::Upload {
            kind,
            title,
            description,
            order,
            section,
            video,
            archive,
            solution,
            duration_secs,
            progress: show_progress,
        } => {
            let request = UploadRequest {
                kind,
                title,
                description,
                order,
                section,
                video,
                archive,
                solution,
                duration_secs,
            };
            let mut sink = progress::sink_for(show_progress, machine);
            commands::upload::execute(request, sink.as_mut())
                .await
                .context("Upload command failed")
        }
        Command::Job { id } => commands::job::execute(&id)
            .await
            .context("Job command failed"),
        Command::CancelJob { id } => commands::cancel_job::execute(&id)
            .await
            .context("Cancel-job command failed"),
        Command::AssignUrl { content_id, url } => commands::assign_url::execute(&content_id, &url)
            .await
            .context("Assign-url command failed"),
    }
}
