//! Request types that cross the `JobQueue`/`RegionProcessor` boundary.

pub mod image_request;
pub mod region_request;

pub use image_request::{ImageRequest, ModelInvokeMode, TileFormat};
pub use region_request::RegionRequest;
