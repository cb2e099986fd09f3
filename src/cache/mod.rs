mod disk;
mod memory;
mod thumbnail;

pub use disk::{DiskCache, ExportReport, FailedThumbnail, StoredThumbnail, ThumbnailStatus};
pub use memory::ThumbnailMemoryCache;
pub use thumbnail::ThumbnailCache;
