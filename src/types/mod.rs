mod file;
mod thumbnail;

pub use file::{ModelFile, SortKey};
pub use thumbnail::{GalleryItem, GalleryStats, ThumbnailImage, ThumbnailState};
