//! GLBモデルのサムネイル生成とギャラリー表示のためのライブラリ
//!
//! サムネイルはパスをキーにキャッシュされ、同じパスへの同時要求は
//! 1回の生成を共有する（[`cache::ThumbnailCache`]）。

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod files;
pub mod gallery;
pub mod glb;
pub mod render;
pub mod state;
pub mod thumbnail;
pub mod types;

pub use cache::ThumbnailCache;
pub use config::GalleryConfig;
pub use error::{GalleryError, Result};
pub use files::FileManager;
pub use gallery::{Gallery, GridSink, LoadReport};
pub use state::AppState;
pub use thumbnail::{ModelThumbnailer, ThumbnailGenerator};
pub use types::{GalleryItem, ModelFile, SortKey, ThumbnailImage, ThumbnailState};
