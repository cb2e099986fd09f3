mod camera;
mod geometry;
mod session;

pub use camera::{Camera, Projected};
pub use geometry::{Aabb, Vec3};
pub use session::{placeholder_tile, validate_dimensions, RenderSession, RenderTracker};
