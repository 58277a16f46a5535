//! Owns one image end to end: determines regions, dispatches `RegionProcessor`s, aggregates
//! outcomes, and emits to sinks (spec.md §4.7).

use crate::api::{ImageRequest, RegionRequest};
use crate::database::{JobItem, JobTable};
use crate::inference::FeatureDetectorFactory;
use crate::region_processor::RegionProcessor;
use crate::sink::{Sink, SinkMode};
use crate::status::{image_status, ImageStatusMonitor, RequestStatus};
use model_runner_core::Timer;
use model_runner_derive::context;
use model_runner_geometry::Feature;
use std::sync::Arc;

/// The final materialized result of a fully-processed image: the terminal status, the committed
/// `JobItem`, and the concatenated feature set emitted to every `AGGREGATE` sink.
#[derive(Debug, Clone)]
pub struct ImageResult {
	pub status: RequestStatus,
	pub job_item: JobItem,
	pub features: Vec<Feature>,
}

pub struct ImageProcessor {
	pub job_table: Arc<dyn JobTable>,
	pub region_processor: Arc<RegionProcessor>,
	pub sinks: Vec<Arc<dyn Sink>>,
}

impl ImageProcessor {
	pub fn new(job_table: Arc<dyn JobTable>, region_processor: Arc<RegionProcessor>, sinks: Vec<Arc<dyn Sink>>) -> Self {
		Self { job_table, region_processor, sinks }
	}

	/// The 5-step sequence from spec.md §4.7. Regions are determined from `region_bounds` if
	/// supplied on the request; otherwise the whole image is treated as a single region (the
	/// region extent defaults to the request's own `tile_size`, i.e. one tile covers it), per
	/// spec.md §4.7 step 2 "if a region grid is not supplied, treat the whole image as a single
	/// region".
	#[context("processing image {}", request.image_id)]
	pub async fn process(
		&self,
		job_id: &str,
		request: ImageRequest,
		region_grid: Option<Vec<crate::tiling::RegionBounds>>,
		image_extent: (u32, u32),
	) -> anyhow::Result<ImageResult> {
		let timer = Timer::start();

		// Step 1: persist JobItem placeholder.
		let mut job_item = JobItem::new(job_id, request.image_id.clone());
		self.job_table.put(job_item.clone());

		// Step 2: determine regions (region grid supplied, or whole image as one region).
		let regions = region_grid.unwrap_or_else(|| vec![((0, 0), image_extent)]);

		// Step 3: update region_count, enqueue a RegionRequest per region.
		job_item.region_count = regions.len() as u32;
		self.job_table.put(job_item.clone());

		let detector: Arc<dyn crate::inference::Detector> = Arc::from(
			FeatureDetectorFactory::new(request.model_name.clone(), request.model_invoke_mode)
				.with_execution_role(request.execution_role.clone())
				.build(),
		);

		let streaming_sinks: Vec<Arc<dyn Sink>> =
			self.sinks.iter().filter(|sink| sink.mode() == SinkMode::Streaming).cloned().collect();

		let mut all_features = Vec::new();
		for region_bounds in regions {
			let region_request = RegionRequest {
				image_id: request.image_id.clone(),
				image_url: request.image_url.clone(),
				tile_size: request.tile_size,
				tile_overlap: request.tile_overlap,
				tile_format: request.tile_format,
				region_bounds: Some(region_bounds),
				model_name: request.model_name.clone(),
				model_invoke_mode: request.model_invoke_mode,
				execution_role: request.execution_role.clone(),
				..Default::default()
			};
			let region_id = region_request.region_id.clone();

			// Step 4: conditionally increment region_success/region_error as each outcome arrives,
			// keyed by region_id idempotency token.
			let outcome = self
				.region_processor
				.process(job_id, region_request, detector.clone(), &request.feature_selection_options, &streaming_sinks)
				.await;

			let succeeded = match &outcome {
				Ok(result) => result.item.failed_tile_count == 0,
				Err(error) => {
					log::warn!("region {region_id} rejected: {error}");
					false
				}
			};
			if let Ok(result) = outcome {
				all_features.extend(result.features);
			}

			job_item = self.job_table.record_region_outcome(&request.image_id, &region_id, succeeded)?;
		}

		// Step 5: final ImageResult materialization once every region has reported.
		job_item.processing_duration = Some(timer.elapsed_millis());
		self.job_table.put(job_item.clone());

		let mut monitor = ImageStatusMonitor::new();
		monitor.subscribe(|_message| Ok(()));
		monitor.publish(&job_item)?;

		for sink in self.sinks.iter().filter(|sink| sink.mode() == SinkMode::Aggregate) {
			sink.write(&request.image_id, &all_features);
		}

		Ok(ImageResult { status: image_status(&job_item), job_item, features: all_features })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::database::{InMemoryJobTable, InMemoryRegionTable};
	use crate::tile_factory::MockTileFactory;
	use pretty_assertions::assert_eq;

	fn sample_request() -> ImageRequest {
		serde_json::from_value(serde_json::json!({
			"image_id": "image-1",
			"image_url": "s3://bucket/image.ntf",
			"model_name": "test-model",
			"model_invoke_mode": "HTTP_ENDPOINT",
		}))
		.unwrap()
	}

	fn processor() -> ImageProcessor {
		let region_processor =
			Arc::new(RegionProcessor::new(Arc::new(InMemoryRegionTable::new()), Arc::new(MockTileFactory::new())));
		ImageProcessor::new(Arc::new(InMemoryJobTable::default()), region_processor, Vec::new())
	}

	#[tokio::test]
	async fn single_region_image_reaches_terminal_status() {
		let processor = processor();
		let request = sample_request();
		let result = processor.process("job-1", request, None, (20, 20)).await.unwrap();
		assert!(matches!(result.status, RequestStatus::Success | RequestStatus::Partial | RequestStatus::Failed));
		assert_eq!(result.job_item.region_count, 1);
		assert!(result.job_item.is_terminal());
	}

	#[tokio::test]
	async fn multi_region_grid_processes_every_region() {
		let processor = processor();
		let request = sample_request();
		let grid = vec![((0, 0), (10, 10)), ((0, 10), (10, 10))];
		let result = processor.process("job-1", request, Some(grid), (10, 20)).await.unwrap();
		assert_eq!(result.job_item.region_count, 2);
		assert!(result.job_item.is_terminal());
	}
}
