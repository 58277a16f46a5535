//! The inbound `JobQueue` message: a whole-image processing request (spec.md §3, §6).

use crate::common::{Classification, FeatureSelectionOptions};
use crate::sink::SinkDescriptor;
use serde::{Deserialize, Serialize};

/// How a detector should be invoked for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelInvokeMode {
	#[serde(rename = "NONE")]
	None,
	#[serde(rename = "SM_ENDPOINT")]
	SmEndpoint,
	#[serde(rename = "HTTP_ENDPOINT")]
	HttpEndpoint,
}

impl Default for ModelInvokeMode {
	fn default() -> Self {
		ModelInvokeMode::None
	}
}

/// The on-the-wire tile image format. Default `NITF` when unspecified (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileFormat {
	#[serde(rename = "NITF")]
	Nitf,
	#[serde(rename = "JPEG")]
	Jpeg,
	#[serde(rename = "PNG")]
	Png,
	#[serde(rename = "GTIFF")]
	GTiff,
}

impl Default for TileFormat {
	fn default() -> Self {
		TileFormat::Nitf
	}
}

fn default_tile_size() -> (u32, u32) {
	(1024, 1024)
}

fn default_tile_overlap() -> (u32, u32) {
	(50, 50)
}

/// A whole-image processing job, as received from the `JobQueue`. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
	pub image_id: String,
	pub image_url: String,

	#[serde(default = "default_tile_size")]
	pub tile_size: (u32, u32),

	#[serde(default = "default_tile_overlap")]
	pub tile_overlap: (u32, u32),

	#[serde(default)]
	pub tile_format: TileFormat,

	pub model_name: String,
	pub model_invoke_mode: ModelInvokeMode,

	#[serde(default)]
	pub execution_role: Option<String>,

	#[serde(default)]
	pub feature_selection_options: FeatureSelectionOptions,

	#[serde(default)]
	pub outputs: Vec<SinkDescriptor>,

	#[serde(default)]
	pub classification: Option<Classification>,
}

impl ImageRequest {
	/// `image_id` non-empty, `model_invoke_mode != NONE`, and `tile_size` strictly larger than
	/// `tile_overlap` on both axes.
	pub fn is_valid(&self) -> bool {
		!self.image_id.is_empty()
			&& self.model_invoke_mode != ModelInvokeMode::None
			&& self.tile_size.0 > self.tile_overlap.0
			&& self.tile_size.1 > self.tile_overlap.1
	}
}
