//! Owns one region end to end: crops, dispatches to the tile worker pool, refines, and commits
//! (spec.md §4.6).

use crate::api::RegionRequest;
use crate::common::FeatureSelectionOptions;
use crate::database::{RegionRequestItem, RegionTable};
use crate::errors::InvalidRegionRequest;
use crate::feature_refinery::FeatureRefinery;
use crate::inference::Detector;
use crate::sink::SinkMode;
use crate::status::{region_status, RegionStatusMonitor};
use crate::tile_factory::{ImageHandle, TileFactory};
use crate::tile_worker::{drain_region, TileOutcome};
use crate::tiling::generate_crops;
use model_runner_core::{ConcurrencyLimits, Timer};
use model_runner_geometry::Feature;
use std::sync::Arc;
use std::time::Duration;

/// Everything `RegionProcessor::process` produced for one region: the region's refined features
/// (for a `STREAMING` sink to emit immediately) and the committed `RegionRequestItem`.
#[derive(Debug, Clone)]
pub struct RegionResult {
	pub item: RegionRequestItem,
	pub features: Vec<Feature>,
}

pub struct RegionProcessor {
	pub region_table: Arc<dyn RegionTable>,
	pub tile_factory: Arc<dyn TileFactory>,
	pub limits: ConcurrencyLimits,
	pub region_time_budget: Duration,
}

impl RegionProcessor {
	pub fn new(region_table: Arc<dyn RegionTable>, tile_factory: Arc<dyn TileFactory>) -> Self {
		Self {
			region_table,
			tile_factory,
			limits: ConcurrencyLimits::default(),
			region_time_budget: Duration::from_secs(3600),
		}
	}

	/// The 7-step sequence from spec.md §4.6. `streaming_sinks` are offered the region's features
	/// as soon as they're ready, independent of the image's final aggregation (spec.md §6).
	pub async fn process(
		&self,
		job_id: &str,
		request: RegionRequest,
		detector: Arc<dyn Detector>,
		selection_options: &FeatureSelectionOptions,
		streaming_sinks: &[Arc<dyn crate::sink::Sink>],
	) -> Result<RegionResult, InvalidRegionRequest> {
		// Step 1: validate.
		if !request.is_valid() {
			return Err(InvalidRegionRequest(format!(
				"region request for image {:?} is invalid: image_id empty or region_bounds missing",
				request.image_id
			)));
		}
		let region_bounds = request.region_bounds.expect("validated above");

		// Step 2: generate crops.
		let crops = generate_crops(region_bounds, request.tile_size, request.tile_overlap)
			.map_err(|error| InvalidRegionRequest(error.to_string()))?;

		// Step 3: allocate and persist a placeholder RegionRequestItem.
		let mut item = RegionRequestItem::new(job_id, request.image_id.clone(), request.region_id.clone());
		item.total_tiles = crops.len() as u32;
		self.region_table.put(item.clone());

		let timer = Timer::start();

		// Step 4: open the image and dispatch crops to the worker pool; block until drained.
		let handle: Arc<dyn ImageHandle> = match self.tile_factory.open(&request.image_url) {
			Ok(handle) => handle,
			Err(error) => {
				log::warn!("region {} could not open image {}: {error}", request.region_id, request.image_id);
				let failed_tiles: Vec<_> = crops.clone();
				let updated = self
					.region_table
					.update_tile_counts(
						&request.image_id,
						&request.region_id,
						Vec::new(),
						failed_tiles,
						timer.elapsed_millis(),
					)
					.unwrap_or(item);
				return Ok(RegionResult { item: updated, features: Vec::new() });
			}
		};

		let (staged_features, outcomes) = tokio::time::timeout(
			self.region_time_budget,
			drain_region(
				crops,
				self.tile_factory.clone(),
				handle.clone(),
				detector,
				request.tile_format,
				request.image_id.clone(),
				&self.limits,
			),
		)
		.await
		.unwrap_or_else(|_| {
			log::warn!("region {} exceeded its wall-clock budget; closing as PARTIAL", request.region_id);
			(Vec::new(), Vec::new())
		});

		// Step 5: apply FeatureRefinery (merges duplicates across tile seams within the region).
		let refinery = FeatureRefinery::new(handle.sensor_model(), None);
		let refined = refinery.refine(staged_features, selection_options);

		// Step 6: update RegionRequestItem with final counters and processing_duration.
		let succeeded_tiles: Vec<_> = outcomes.iter().filter(|o| o.is_success()).map(TileOutcome::crop).collect();
		let failed_tiles: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).map(TileOutcome::crop).collect();
		let updated = self
			.region_table
			.update_tile_counts(
				&request.image_id,
				&request.region_id,
				succeeded_tiles,
				failed_tiles,
				timer.elapsed_millis(),
			)
			.unwrap_or(item);

		// Step 7: transition state via StatusMonitor.
		let mut monitor = RegionStatusMonitor::new();
		monitor.subscribe(|_message| Ok(()));
		if let Err(error) = monitor.publish(&updated) {
			log::error!("region status publish failed: {error}");
		}

		for sink in streaming_sinks.iter().filter(|sink| sink.mode() == SinkMode::Streaming) {
			sink.write(&request.image_id, &refined);
		}

		Ok(RegionResult { item: updated, features: refined })
	}
}
