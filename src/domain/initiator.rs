/// セッション開始の判断
///
/// ストレージ設定から、今回の送信でサーバー側ジョブの追跡が必要かを決め、
/// 追跡する場合のみセッションIDを発行する。
use crate::api::types::{ContentKind, StorageConfig};
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use uuid::{Builder, Uuid};

/// リモート進捗を追跡すべきか
///
/// 対象ファイル（lecture/project の動画、assignment/project のアーカイブ）を実際に送信し、
/// かつその種別の保存先が外部ホスティングである場合に限り true。
pub fn should_track_remote_progress(
    kind: ContentKind,
    has_video_file: bool,
    has_archive_file: bool,
    storage: &StorageConfig,
) -> bool {
    let hosted_video = kind.requires_video() && has_video_file && storage.video_is_hosted();
    let hosted_archive = kind.requires_archive() && has_archive_file && storage.file_is_hosted();
    hosted_video || hosted_archive
}

/// 新しいセッションIDを発行する
///
/// OS の乱数源から UUIDv4 を作る。乱数源が使えない環境では
/// 高分解能時刻と擬似乱数を組み合わせた値にフォールバックする。
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(e) => {
            warn!(error = %e, "OS random source unavailable, using time-based session id");
            fallback_session_id()
        }
    }
}

fn fallback_session_id() -> String {
    let now = Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
    let noise = rand::thread_rng().next_u64();

    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&nanos.to_be_bytes());
    bytes[8..].copy_from_slice(&noise.to_be_bytes());
    Uuid::from_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hosted() -> StorageConfig {
        StorageConfig {
            video_provider: "vimeo".to_string(),
            file_provider: "dropbox".to_string(),
            is_hosted_video_enabled: true,
        }
    }

    #[test]
    fn test_lecture_with_hosted_video_is_tracked() {
        assert!(should_track_remote_progress(ContentKind::Lecture, true, false, &hosted()));
    }

    #[test]
    fn test_local_storage_is_never_tracked() {
        let local = StorageConfig::local();
        assert!(!should_track_remote_progress(ContentKind::Lecture, true, false, &local));
        assert!(!should_track_remote_progress(ContentKind::Assignment, false, true, &local));
        assert!(!should_track_remote_progress(ContentKind::Project, true, true, &local));
    }

    #[test]
    fn test_hosted_video_disabled_flag() {
        let config = StorageConfig {
            is_hosted_video_enabled: false,
            ..hosted()
        };
        assert!(!should_track_remote_progress(ContentKind::Lecture, true, false, &config));
        // アーカイブ側は動画フラグに影響されない
        assert!(should_track_remote_progress(ContentKind::Assignment, false, true, &config));
    }

    #[test]
    fn test_file_must_actually_be_uploaded() {
        assert!(!should_track_remote_progress(ContentKind::Lecture, false, false, &hosted()));
        // assignment の動画は対象外
        assert!(!should_track_remote_progress(ContentKind::Assignment, true, false, &hosted()));
    }

    #[test]
    fn test_session_ids_are_unique_uuids() {
        let ids: HashSet<String> = (0..1000).map(|_| new_session_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in ids.iter().take(5) {
            assert!(Uuid::parse_str(id).is_ok());
        }
    }

    #[test]
    fn test_fallback_ids_differ() {
        let a = fallback_session_id();
        let b = fallback_session_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
