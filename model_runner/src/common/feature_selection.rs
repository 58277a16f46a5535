//! Configuration for the FeatureRefinery's de-duplication step (spec.md §4.4).

use serde::{Deserialize, Serialize};

/// De-duplication algorithm applied to overlapping raw detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSelectionAlgorithm {
	#[serde(rename = "NONE")]
	None,
	#[serde(rename = "NMS")]
	Nms,
	#[serde(rename = "SOFT_NMS")]
	SoftNms,
}

impl Default for FeatureSelectionAlgorithm {
	fn default() -> Self {
		FeatureSelectionAlgorithm::None
	}
}

/// Per-job feature selection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSelectionOptions {
	pub algorithm: FeatureSelectionAlgorithm,
	pub iou_threshold: f64,
	pub skip_box_threshold: f64,
	pub sigma: f64,
}

impl Default for FeatureSelectionOptions {
	fn default() -> Self {
		Self {
			algorithm: FeatureSelectionAlgorithm::None,
			iou_threshold: 0.75,
			skip_box_threshold: 0.0001,
			sigma: 0.1,
		}
	}
}
