//! Opens an image, extracts pixel tiles, and yields the sensor model used to geolocate
//! detections (spec.md §4.2).

use crate::api::TileFormat;
use crate::errors::UnreadableImageError;
use crate::tiling::Crop;
use model_runner_geometry::{GeodeticWorldCoordinate, ImageCoordinate};
use std::sync::Arc;

/// An invertible mapping between image pixel coordinates and geodetic world coordinates.
/// Immutable after construction and safely shared read-only by every `TileWorker` processing the
/// same image (spec.md §3 Ownership, §5 "SensorModel is immutable ... safely shared").
pub trait SensorModel: Send + Sync {
	fn world_to_image(&self, world: GeodeticWorldCoordinate) -> ImageCoordinate;
	fn image_to_world(&self, image: ImageCoordinate) -> GeodeticWorldCoordinate;
}

/// A per-pixel elevation sample grid, used to look up elevation at a given image coordinate when
/// refining detections (spec.md §4.2, §4.4).
pub trait ElevationGrid: Send + Sync {
	/// Elevation in meters at the given image coordinate, or `None` outside the grid's extent.
	fn elevation_at(&self, image: ImageCoordinate) -> Option<f64>;
}

/// An opened image handle. Implementations own whatever raster driver state is needed to extract
/// tiles and stays alive for as long as any `TileWorker` holds it.
pub trait ImageHandle: Send + Sync {
	fn sensor_model(&self) -> Arc<dyn SensorModel>;
}

/// Opens images and extracts self-contained tile byte buffers suitable for out-of-process
/// inference.
pub trait TileFactory: Send + Sync {
	fn open(&self, url: &str) -> Result<Arc<dyn ImageHandle>, UnreadableImageError>;

	fn extract_tile(
		&self,
		handle: &dyn ImageHandle,
		crop: Crop,
		format: TileFormat,
	) -> Result<Vec<u8>, UnreadableImageError>;

	fn elevation_tile(
		&self,
		handle: &dyn ImageHandle,
		path: &str,
	) -> Result<(Arc<dyn ElevationGrid>, Arc<dyn SensorModel>), UnreadableImageError>;
}

/// An identity sensor model: image coordinates are treated as `(lon_deg, lat_deg)` pairs
/// directly. Used by `MockTileFactory` for tests and the bundled CLI demo.
pub struct IdentitySensorModel;

impl SensorModel for IdentitySensorModel {
	fn world_to_image(&self, world: GeodeticWorldCoordinate) -> ImageCoordinate {
		ImageCoordinate::new(world.lon_deg(), world.lat_deg())
	}

	fn image_to_world(&self, image: ImageCoordinate) -> GeodeticWorldCoordinate {
		GeodeticWorldCoordinate::new(image.x.to_radians(), image.y.to_radians(), 0.0)
	}
}

/// A `TileFactory` that never touches a raster driver: `open` always succeeds, `extract_tile`
/// returns a deterministic placeholder buffer, and the sensor model is the identity mapping.
/// Grounded on the teacher's in-memory `MockTilesReader` used for tests and demos.
pub struct MockTileFactory {
	pub fail_urls: Vec<String>,
}

impl MockTileFactory {
	pub fn new() -> Self {
		Self { fail_urls: Vec::new() }
	}
}

impl Default for MockTileFactory {
	fn default() -> Self {
		Self::new()
	}
}

struct MockImageHandle {
	sensor_model: Arc<dyn SensorModel>,
}

impl ImageHandle for MockImageHandle {
	fn sensor_model(&self) -> Arc<dyn SensorModel> {
		self.sensor_model.clone()
	}
}

impl TileFactory for MockTileFactory {
	fn open(&self, url: &str) -> Result<Arc<dyn ImageHandle>, UnreadableImageError> {
		if self.fail_urls.iter().any(|bad| bad == url) {
			return Err(UnreadableImageError(format!("no such image: {url}")));
		}
		Ok(Arc::new(MockImageHandle { sensor_model: Arc::new(IdentitySensorModel) }))
	}

	fn extract_tile(
		&self,
		_handle: &dyn ImageHandle,
		crop: Crop,
		_format: TileFormat,
	) -> Result<Vec<u8>, UnreadableImageError> {
		Ok(format!("tile:{}:{}:{}:{}", crop.origin.0, crop.origin.1, crop.size.0, crop.size.1).into_bytes())
	}

	fn elevation_tile(
		&self,
		_handle: &dyn ImageHandle,
		path: &str,
	) -> Result<(Arc<dyn ElevationGrid>, Arc<dyn SensorModel>), UnreadableImageError> {
		Err(UnreadableImageError(format!("no elevation data available: {path}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_sensor_model_round_trips() {
		let model = IdentitySensorModel;
		let world = GeodeticWorldCoordinate::new(0.5, 0.25, 10.0);
		let image = model.world_to_image(world);
		let back = model.image_to_world(image);
		assert!((back.lon_rad - world.lon_rad).abs() < 1e-9);
		assert!((back.lat_rad - world.lat_rad).abs() < 1e-9);
	}

	#[test]
	fn mock_factory_opens_and_extracts() {
		let factory = MockTileFactory::new();
		let handle = factory.open("s3://bucket/image.ntf").unwrap();
		let crop = Crop::new((0, 0), (256, 256));
		let bytes = factory.extract_tile(handle.as_ref(), crop, TileFormat::Nitf).unwrap();
		assert_eq!(bytes, b"tile:0:0:256:256");
	}

	#[test]
	fn mock_factory_fails_configured_urls() {
		let factory = MockTileFactory { fail_urls: vec!["bad://url".to_string()] };
		assert!(factory.open("bad://url").is_err());
	}
}
