use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;
use crate::constants::SUPPORTED_EXTENSIONS;
use crate::error::{GalleryError, Result};
use crate::types::{ModelFile, SortKey};

/// モデルファイル一覧（検索・並び替え後のビューを保持）
#[derive(Debug, Clone, Default)]
pub struct FileManager {
    files: Vec<ModelFile>,
    filtered: Vec<ModelFile>,
}

impl FileManager {
    pub fn from_files(files: Vec<ModelFile>) -> Self {
        Self {
            filtered: files.clone(),
            files,
        }
    }

    /// フォルダ内のGLBファイルを列挙（名前の自然順）
    pub fn scan(folder: &Path, recursive: bool) -> Result<Self> {
        if !folder.is_dir() {
            return Err(GalleryError::InvalidFolder(folder.to_path_buf()));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry_result in WalkDir::new(folder).min_depth(1).max_depth(max_depth) {
            // 読めないエントリはスキップ
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "ディレクトリエントリ読み込みエラー");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_supported(entry.path()) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| GalleryError::Io(e.into()))?;
            files.push(model_file(entry.path(), &metadata));
        }

        files.sort_by(|a, b| natord::compare(&a.name, &b.name));
        debug!(folder = %folder.display(), count = files.len(), "モデルファイルを列挙");

        Ok(Self::from_files(files))
    }

    /// 現在のビュー（検索・並び替え結果）
    pub fn files(&self) -> &[ModelFile] {
        &self.filtered
    }

    pub fn all(&self) -> &[ModelFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 表示名またはファイル名の部分一致（大文字小文字を区別しない）
    pub fn search(&mut self, query: &str) -> &[ModelFile] {
        let query = query.to_lowercase();
        self.filtered = self
            .files
            .iter()
            .filter(|f| {
                f.display_name.to_lowercase().contains(&query)
                    || f.name.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        &self.filtered
    }

    pub fn sort(&mut self, key: SortKey) -> &[ModelFile] {
        match key {
            SortKey::Name => self
                .filtered
                .sort_by(|a, b| natord::compare(&a.display_name, &b.display_name)),
            // サイズ・日付は新しい/大きい順
            SortKey::Size => self.filtered.sort_by(|a, b| b.size.cmp(&a.size)),
            SortKey::Date => self
                .filtered
                .sort_by(|a, b| b.modified_time.cmp(&a.modified_time)),
        }
        &self.filtered
    }

    pub fn get_by_path(&self, path: &str) -> Option<&ModelFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn model_file(path: &Path, metadata: &fs::Metadata) -> ModelFile {
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let modified_time = metadata
        .modified()
        .map(|t| t.duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64)
        .unwrap_or(0);

    ModelFile {
        display_name: display_name(&name),
        path: path.to_string_lossy().to_string(),
        size: metadata.len(),
        file_type: "glb".to_string(),
        modified_time,
        name,
    }
}

/// ファイル名から表示名を作る
/// `Fantasy_Rally_texture.glb` -> `Fantasy Rally Texture`, `model(2).glb` -> `Model (2)`
pub fn display_name(file_name: &str) -> String {
    let stem = strip_glb_extension(file_name);
    let chars: Vec<char> = stem
        .chars()
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(stem.len() + 4);
    let mut in_word = false;

    for (i, &c) in chars.iter().enumerate() {
        // "(n)" の前にスペース
        if c == '(' && is_number_group(&chars[i..]) && !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }

        if c.is_alphanumeric() && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = c.is_alphanumeric();
    }

    out.trim().to_string()
}

fn strip_glb_extension(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match (file_name.get(..split), file_name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".glb") => stem,
        _ => file_name,
    }
}

// "(" 数字+ ")" で始まるか
fn is_number_group(rest: &[char]) -> bool {
    let digits = rest
        .iter()
        .skip(1)
        .take_while(|c| c.is_ascii_digit())
        .count();
    digits > 0 && rest.get(digits + 1) == Some(&')')
}

/// バイト数を表示用に整形（1MB未満はKB）
pub fn format_file_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes < MB {
        format!("{} KB", (bytes / 1024.0).round() as u64)
    } else {
        format!("{:.1} MB", bytes / MB)
    }
}

/// 更新日時を `Jan 5, 2025` 形式に整形（UTC）
pub fn format_date(modified_time: u64) -> String {
    i64::try_from(modified_time)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}
