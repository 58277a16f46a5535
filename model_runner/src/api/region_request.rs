//! A single-region processing request, created by the `ImageProcessor` and dispatched to a
//! `RegionProcessor` (spec.md §3, §4.7).

use crate::api::image_request::{ModelInvokeMode, TileFormat};
use crate::tiling::RegionBounds;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_tile_size() -> (u32, u32) {
	(1024, 1024)
}

fn default_tile_overlap() -> (u32, u32) {
	(50, 50)
}

fn new_region_id() -> String {
	Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRequest {
	#[serde(default = "new_region_id")]
	pub region_id: String,

	#[serde(default)]
	pub image_id: String,

	#[serde(default)]
	pub image_url: String,

	#[serde(default = "default_tile_size")]
	pub tile_size: (u32, u32),

	#[serde(default = "default_tile_overlap")]
	pub tile_overlap: (u32, u32),

	#[serde(default)]
	pub tile_format: TileFormat,

	pub region_bounds: Option<RegionBounds>,

	#[serde(default)]
	pub model_name: String,

	#[serde(default)]
	pub model_invoke_mode: ModelInvokeMode,

	#[serde(default)]
	pub execution_role: Option<String>,
}

impl Default for RegionRequest {
	fn default() -> Self {
		Self {
			region_id: new_region_id(),
			image_id: String::new(),
			image_url: String::new(),
			tile_size: default_tile_size(),
			tile_overlap: default_tile_overlap(),
			tile_format: TileFormat::default(),
			region_bounds: None,
			model_name: String::new(),
			model_invoke_mode: ModelInvokeMode::default(),
			execution_role: None,
		}
	}
}

impl RegionRequest {
	/// `image_id` non-empty AND `region_bounds` present (spec.md §3 invariant).
	pub fn is_valid(&self) -> bool {
		!self.image_id.is_empty() && self.region_bounds.is_some()
	}
}
