use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// ライブラリ全体のエラー型
#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] io::Error),

    #[error("JSONエラー ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("無効なフォルダパス: {0:?}")]
    InvalidFolder(PathBuf),

    #[error("無効なGLBファイル {path:?}: {reason}")]
    InvalidGlb { path: PathBuf, reason: String },

    #[error("レンダリングエラー: {0}")]
    Render(String),

    #[error("サムネイル書き出しエラー: {0}")]
    Encode(#[from] image::ImageError),

    #[error("タスク実行エラー: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("サムネイル生成が完了しませんでした: {0}")]
    GenerationAborted(String),

    /// 複数の呼び出し元で共有された生成失敗
    #[error(transparent)]
    Shared(Arc<GalleryError>),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_glb(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidGlb {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
