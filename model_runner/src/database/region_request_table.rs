//! `RegionTable`: keyed on `(image_id, region_id)`, owned exclusively by the single
//! `RegionProcessor` handling that region, so updates need no cross-owner coordination
//! (spec.md §3, §5).

use crate::errors::ConditionalUpdateConflict;
use crate::tiling::Crop;
use parking_lot::Mutex;
use std::collections::HashMap;

/// A durable row tracking one region's tile-level progress.
#[derive(Debug, Clone)]
pub struct RegionRequestItem {
	pub job_id: Option<String>,
	pub image_id: String,
	pub region_id: String,
	pub processing_duration: Option<u64>,
	pub total_tiles: u32,
	pub succeeded_tile_count: u32,
	pub succeeded_tiles: Vec<Crop>,
	pub failed_tile_count: u32,
	pub failed_tiles: Vec<Crop>,
}

impl RegionRequestItem {
	pub fn new(job_id: impl Into<String>, image_id: impl Into<String>, region_id: impl Into<String>) -> Self {
		Self {
			job_id: Some(job_id.into()),
			image_id: image_id.into(),
			region_id: region_id.into(),
			processing_duration: None,
			total_tiles: 0,
			succeeded_tile_count: 0,
			succeeded_tiles: Vec::new(),
			failed_tile_count: 0,
			failed_tiles: Vec::new(),
		}
	}

	/// `succeeded_tile_count + failed_tile_count <= total_tiles` (spec.md §3 invariant).
	pub fn is_consistent(&self) -> bool {
		self.succeeded_tile_count + self.failed_tile_count <= self.total_tiles
	}
}

/// Durable store keyed by `(image_id, region_id)`.
pub trait RegionTable: Send + Sync {
	fn put(&self, item: RegionRequestItem);
	fn get(&self, image_id: &str, region_id: &str) -> Option<RegionRequestItem>;

	/// Replaces the stored item's tile outcome fields wholesale; called once after a region's
	/// worker pool drains (spec.md §4.6 step 6). Fails if it would violate the item's invariant.
	fn update_tile_counts(
		&self,
		image_id: &str,
		region_id: &str,
		succeeded_tiles: Vec<Crop>,
		failed_tiles: Vec<Crop>,
		processing_duration: u64,
	) -> Result<RegionRequestItem, ConditionalUpdateConflict>;
}

/// An in-memory reference implementation, used by the bundled CLI demo and by tests.
#[derive(Default)]
pub struct InMemoryRegionTable {
	rows: Mutex<HashMap<(String, String), RegionRequestItem>>,
}

impl InMemoryRegionTable {
	pub fn new() -> Self {
		Self::default()
	}
}

fn key(image_id: &str, region_id: &str) -> (String, String) {
	(image_id.to_string(), region_id.to_string())
}

impl RegionTable for InMemoryRegionTable {
	fn put(&self, item: RegionRequestItem) {
		let k = key(&item.image_id, &item.region_id);
		self.rows.lock().insert(k, item);
	}

	fn get(&self, image_id: &str, region_id: &str) -> Option<RegionRequestItem> {
		self.rows.lock().get(&key(image_id, region_id)).cloned()
	}

	fn update_tile_counts(
		&self,
		image_id: &str,
		region_id: &str,
		succeeded_tiles: Vec<Crop>,
		failed_tiles: Vec<Crop>,
		processing_duration: u64,
	) -> Result<RegionRequestItem, ConditionalUpdateConflict> {
		let mut rows = self.rows.lock();
		let k = key(image_id, region_id);
		let item = rows.get_mut(&k).ok_or_else(|| ConditionalUpdateConflict {
			table: "RegionTable",
			key: format!("{image_id}/{region_id}"),
			attempts: 0,
		})?;

		let succeeded_tile_count = succeeded_tiles.len() as u32;
		let failed_tile_count = failed_tiles.len() as u32;
		if succeeded_tile_count + failed_tile_count > item.total_tiles {
			return Err(ConditionalUpdateConflict {
				table: "RegionTable",
				key: format!("{image_id}/{region_id}"),
				attempts: 1,
			});
		}

		item.succeeded_tiles = succeeded_tiles;
		item.succeeded_tile_count = succeeded_tile_count;
		item.failed_tiles = failed_tiles;
		item.failed_tile_count = failed_tile_count;
		item.processing_duration = Some(processing_duration);
		Ok(item.clone())
	}
}
