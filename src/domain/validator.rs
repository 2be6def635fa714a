/// ドメインサービス: 送信フォームのバリデーション
///
/// ネットワーク呼び出しの前に、コンテンツ種別ごとの必須ファイルと
/// 各ファイルの制約を検証する。設定値は APP_CONFIG から取得します。
use crate::api::types::ContentKind;
use crate::config::APP_CONFIG;
use crate::domain::error::ValidationError;
use std::path::{Path, PathBuf};

/// 送信フォーム（ユーザー入力）
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub kind: ContentKind,
    pub section_id: Option<String>,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub video: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub solution: Option<PathBuf>,
    /// 呼び出し側が把握している動画の長さ（秒）
    pub video_duration_secs: Option<f64>,
}

impl UploadForm {
    pub fn new(kind: ContentKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            section_id: None,
            title: title.into(),
            description: String::new(),
            order: 0,
            video: None,
            archive: None,
            solution: None,
            video_duration_secs: None,
        }
    }

    /// 種別に関係するファイルだけを考慮した「動画あり」
    pub fn has_video(&self) -> bool {
        self.kind.requires_video() && self.video.is_some()
    }

    pub fn has_archive(&self) -> bool {
        self.kind.requires_archive() && self.archive.is_some()
    }
}

/// 検証済みファイルの情報
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    pub path: String,
    pub size: u64,
    pub extension: String,
}

/// 検証結果
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub video: Option<ValidatedFile>,
    pub archive: Option<ValidatedFile>,
    pub solution: Option<ValidatedFile>,
}

impl ValidationResult {
    pub fn total_bytes(&self) -> u64 {
        [&self.video, &self.archive, &self.solution]
            .into_iter()
            .flatten()
            .map(|f| f.size)
            .sum()
    }
}

/// 送信フォームを検証する
///
/// # エラー
/// - タイトルが空
/// - 種別に必要なファイルが無い
/// - ファイルが存在しない / ディレクトリ / 空 / サイズ超過
/// - 動画形式・アーカイブ拡張子の不一致
/// - 動画が最短長さ未満
pub fn validate_form(form: &UploadForm) -> Result<ValidationResult, ValidationError> {
    if form.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let kind = form.kind;

    let video = match (&form.video, kind.requires_video()) {
        (Some(path), true) => Some(validate_video(path)?),
        (None, true) => {
            return Err(ValidationError::MissingVideo {
                kind: kind.to_string(),
            });
        }
        _ => None,
    };

    let archive = match (&form.archive, kind.requires_archive()) {
        (Some(path), true) => Some(validate_archive(path)?),
        (None, true) => {
            return Err(ValidationError::MissingArchive {
                kind: kind.to_string(),
            });
        }
        _ => None,
    };

    let solution = match &form.solution {
        Some(path) => Some(validate_archive(path)?),
        None => None,
    };

    if let (Some(_), Some(duration)) = (&video, form.video_duration_secs) {
        let min = APP_CONFIG.upload.min_video_duration_secs;
        if duration < min {
            return Err(ValidationError::VideoTooShort {
                duration_secs: duration,
                min_secs: min,
            });
        }
    }

    Ok(ValidationResult {
        video,
        archive,
        solution,
    })
}

/// アップロード対象の動画ファイルを検証する
pub fn validate_video(path: &Path) -> Result<ValidatedFile, ValidationError> {
    let file = validate_file(path)?;
    let supported = APP_CONFIG.upload.supported_formats;

    if !supported.contains(&file.extension.as_str()) {
        return Err(ValidationError::InvalidFormat {
            path: file.path,
            expected: format!("one of: {}", supported.join(", ")),
            found: if file.extension.is_empty() {
                "no extension".to_string()
            } else {
                file.extension
            },
        });
    }

    Ok(file)
}

/// アップロード対象のアーカイブを検証する
pub fn validate_archive(path: &Path) -> Result<ValidatedFile, ValidationError> {
    let file = validate_file(path)?;
    let formats = APP_CONFIG.upload.archive_formats;

    if !formats.contains(&file.extension.as_str()) {
        return Err(ValidationError::InvalidArchive {
            path: file.path,
            expected: formats.join(", "),
        });
    }

    Ok(file)
}

/// 存在・種別・サイズの共通検証
fn validate_file(path: &Path) -> Result<ValidatedFile, ValidationError> {
    let display = path.display().to_string();

    let metadata = std::fs::metadata(path).map_err(|_| ValidationError::FileNotFound {
        path: display.clone(),
    })?;

    if metadata.is_dir() {
        return Err(ValidationError::NotAFile { path: display });
    }

    let size = metadata.len();
    if size == 0 {
        return Err(ValidationError::EmptyFile { path: display });
    }

    let max = APP_CONFIG.upload.max_file_size;
    if size > max {
        return Err(ValidationError::FileTooLarge { size, max });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    Ok(ValidatedFile {
        path: display,
        size,
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: usize) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, vec![1u8; bytes]).unwrap();
        path
    }

    #[test]
    fn test_lecture_requires_video() {
        let form = UploadForm::new(ContentKind::Lecture, "Intro");
        assert!(matches!(
            validate_form(&form),
            Err(ValidationError::MissingVideo { .. })
        ));
    }

    #[test]
    fn test_project_requires_both() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Project, "Capstone");
        form.video = Some(write(&dir, "demo.mp4", 16));
        assert!(matches!(
            validate_form(&form),
            Err(ValidationError::MissingArchive { .. })
        ));

        form.archive = Some(write(&dir, "code.zip", 16));
        let result = validate_form(&form).expect("project should validate");
        assert_eq!(result.total_bytes(), 32);
    }

    #[test]
    fn test_assignment_ignores_video() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Assignment, "Homework");
        form.archive = Some(write(&dir, "hw.zip", 8));
        form.video = Some(write(&dir, "extra.mp4", 8));

        let result = validate_form(&form).unwrap();
        assert!(result.video.is_none());
        assert!(!form.has_video());
        assert!(form.has_archive());
    }

    #[test]
    fn test_wrong_archive_extension() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Assignment, "Homework");
        form.archive = Some(write(&dir, "hw.rar", 8));
        assert!(matches!(
            validate_form(&form),
            Err(ValidationError::InvalidArchive { .. })
        ));
    }

    #[test]
    fn test_unsupported_video_format() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Lecture, "Intro");
        form.video = Some(write(&dir, "intro.gif", 8));
        match validate_form(&form) {
            Err(ValidationError::InvalidFormat { found, .. }) => assert_eq!(found, "gif"),
            other => panic!("Expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Lecture, "Intro");
        form.video = Some(write(&dir, "empty.mp4", 0));
        assert!(matches!(validate_form(&form), Err(ValidationError::EmptyFile { .. })));

        form.video = Some(dir.path().join("absent.mp4"));
        assert!(matches!(validate_form(&form), Err(ValidationError::FileNotFound { .. })));

        form.video = Some(dir.path().to_path_buf());
        assert!(matches!(validate_form(&form), Err(ValidationError::NotAFile { .. })));
    }

    #[test]
    fn test_video_too_short() {
        let dir = TempDir::new().unwrap();
        let mut form = UploadForm::new(ContentKind::Lecture, "Intro");
        form.video = Some(write(&dir, "clip.mp4", 8));
        form.video_duration_secs = Some(1.5);
        assert!(matches!(
            validate_form(&form),
            Err(ValidationError::VideoTooShort { .. })
        ));

        form.video_duration_secs = Some(60.0);
        assert!(validate_form(&form).is_ok());
    }

    #[test]
    fn test_empty_title() {
        let form = UploadForm::new(ContentKind::Lecture, "   ");
        assert_eq!(validate_form(&form), Err(ValidationError::EmptyTitle));
    }
}
