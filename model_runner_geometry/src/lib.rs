//! GeoJSON feature/geometry types and the geometric math (IoU, centroid, bbox) used to refine
//! raw detector output into geolocated, de-duplicated features (spec.md §4.4).

pub mod bbox;
pub mod coordinate;
pub mod feature;

pub use bbox::{ImageBounds, iou};
pub use coordinate::{GeodeticWorldCoordinate, ImageCoordinate};
pub use feature::{Feature, FeatureCollection, Geometry};
