/// マルチパート送信本体の構築
///
/// ファイルをストリームとして読み出しながら送信済みバイト数を数え、
/// `(bytes_sent, bytes_total)` のサンプルをチャネルへ流します。
/// 受け手（転送モニター）はサンプルの到着順に処理します。
use crate::api::error::InfraError;
use crate::api::types::ContentSubmission;
use futures::TryStreamExt;
use reqwest::{Body, multipart};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

/// 転送の進捗サンプル
///
/// 総量が不明な場合は `fraction`（0.0〜1.0）で代替する。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferSample {
    pub bytes_sent: u64,
    pub bytes_total: Option<u64>,
    pub fraction: Option<f64>,
}

impl TransferSample {
    pub fn bytes(bytes_sent: u64, bytes_total: u64) -> Self {
        Self {
            bytes_sent,
            bytes_total: Some(bytes_total),
            fraction: None,
        }
    }

    pub fn fraction(fraction: f64) -> Self {
        Self {
            bytes_sent: 0,
            bytes_total: None,
            fraction: Some(fraction),
        }
    }
}

pub type ProgressSender = mpsc::UnboundedSender<TransferSample>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<TransferSample>;

/// 全パート共通の送信バイトカウンタ
#[derive(Clone)]
struct ByteCounter {
    sent: Arc<AtomicU64>,
    total: u64,
    progress: ProgressSender,
}

impl ByteCounter {
    fn record(&self, chunk_len: usize) {
        let sent = self.sent.fetch_add(chunk_len as u64, Ordering::SeqCst) + chunk_len as u64;
        // 受け手が既に居ない（キャンセル済み）場合は捨てる
        let _ = self.progress.send(TransferSample::bytes(sent, self.total));
    }
}

/// 送信フォームを構築する
///
/// フィールド: title, description, order, sectionId, uploadSessionId,
/// video / file / solution（いずれも任意）
pub async fn build_form(
    submission: &ContentSubmission,
    progress: ProgressSender,
) -> Result<multipart::Form, InfraError> {
    let files: Vec<(&'static str, &Path)> = [
        ("video", submission.video.as_deref()),
        ("file", submission.archive.as_deref()),
        ("solution", submission.solution.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, path)| path.map(|p| (name, p)))
    .collect();

    let mut total = 0u64;
    for (_, path) in &files {
        total += file_len(path).await?;
    }

    let counter = ByteCounter {
        sent: Arc::new(AtomicU64::new(0)),
        total,
        progress,
    };
    let _ = counter.progress.send(TransferSample::bytes(0, total));

    let mut form = multipart::Form::new()
        .text("title", submission.title.clone())
        .text("description", submission.description.clone())
        .text("order", submission.order.to_string());

    if let Some(section_id) = &submission.section_id {
        form = form.text("sectionId", section_id.clone());
    }
    if let Some(session_id) = &submission.upload_session_id {
        form = form.text("uploadSessionId", session_id.clone());
    }

    for (name, path) in files {
        form = form.part(name, file_part(path, counter.clone()).await?);
    }

    Ok(form)
}

async fn file_len(path: &Path) -> Result<u64, InfraError> {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| InfraError::io(format!("Failed to read metadata: {}", path.display()), e))
}

/// 送信量を数えるストリームでファイルパートを作る
async fn file_part(path: &Path, counter: ByteCounter) -> Result<multipart::Part, InfraError> {
    let len = file_len(path).await?;
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| InfraError::io(format!("Failed to open file: {}", path.display()), e))?;

    let stream = ReaderStream::new(file).inspect_ok(move |chunk| counter.record(chunk.len()));

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    multipart::Part::stream_with_length(Body::wrap_stream(stream), len)
        .file_name(file_name)
        .mime_str(mime.as_ref())
        .map_err(|e| InfraError::network(format!("Invalid content type '{}': {}", mime, e)))
}
