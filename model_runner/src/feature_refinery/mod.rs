//! Attaches geodetic coordinates, polygon geometry, bbox, and center lat/lon to raw detections,
//! then de-duplicates overlapping detections via NMS/Soft-NMS (spec.md §4.4).

use crate::common::{FeatureSelectionAlgorithm, FeatureSelectionOptions};
use crate::tile_factory::{ElevationGrid, SensorModel};
use model_runner_geometry::{iou, Feature, ImageBounds, ImageCoordinate};
use std::sync::Arc;

/// Refines raw detections into geolocated features and de-duplicates overlapping ones.
pub struct FeatureRefinery {
	sensor_model: Arc<dyn SensorModel>,
	elevation: Option<Arc<dyn ElevationGrid>>,
}

impl FeatureRefinery {
	pub fn new(sensor_model: Arc<dyn SensorModel>, elevation: Option<Arc<dyn ElevationGrid>>) -> Self {
		Self { sensor_model, elevation }
	}

	fn elevation_at(&self, image: ImageCoordinate) -> f64 {
		self.elevation.as_ref().and_then(|grid| grid.elevation_at(image)).unwrap_or(0.0)
	}

	/// Runs the full pipeline: geolocate every feature, then apply the configured de-duplication
	/// algorithm. Features without a parseable `bounds_imcoords` are passed through unmodified.
	pub fn refine(&self, features: Vec<Feature>, options: &FeatureSelectionOptions) -> Vec<Feature> {
		let geolocated: Vec<Feature> = features.into_iter().map(|feature| self.geolocate(feature)).collect();
		self.select(geolocated, options)
	}

	/// Steps 1-4: corner-to-geodetic conversion, polygon/bbox construction, centroid labeling.
	fn geolocate(&self, feature: Feature) -> Feature {
		let Some(bounds) = feature.bounds_imcoords() else {
			return feature;
		};
		let image_corners = ImageBounds::from_slice(&bounds).corners();
		let world_corners: Vec<(f64, f64)> = image_corners
			.iter()
			.map(|&(x, y)| {
				let image = ImageCoordinate::new(x, y);
				let elevation = self.elevation_at(image);
				let mut world = self.sensor_model.image_to_world(image);
				world.elev_m = elevation;
				(world.lon_deg(), world.lat_deg())
			})
			.collect();
		let corners: [(f64, f64); 4] = world_corners.try_into().expect("exactly four corners");

		let center_lon = corners.iter().map(|(lon, _)| lon).sum::<f64>() / 4.0;
		let center_lat = corners.iter().map(|(_, lat)| lat).sum::<f64>() / 4.0;

		feature.with_geolocation(corners, center_lon, center_lat)
	}

	/// Step 5: NONE/NMS/SOFT_NMS dispatch. Features are sorted `(score desc, id asc)` first so
	/// output is deterministic regardless of the arbitrary order staged features arrive in
	/// (spec.md §5 "Ordering guarantees").
	fn select(&self, mut features: Vec<Feature>, options: &FeatureSelectionOptions) -> Vec<Feature> {
		if matches!(options.algorithm, FeatureSelectionAlgorithm::None) {
			return features;
		}

		sort_by_score_desc_id_asc(&mut features);

		match options.algorithm {
			FeatureSelectionAlgorithm::None => unreachable!(),
			FeatureSelectionAlgorithm::Nms => non_max_suppression(features, options),
			FeatureSelectionAlgorithm::SoftNms => soft_non_max_suppression(features, options),
		}
	}
}

fn sort_by_score_desc_id_asc(features: &mut [Feature]) {
	features.sort_by(|a, b| {
		let score_a = a.detection_score().unwrap_or(0.0);
		let score_b = b.detection_score().unwrap_or(0.0);
		score_b
			.partial_cmp(&score_a)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.id.cmp(&b.id))
	});
}

fn bounds_of(feature: &Feature) -> Option<ImageBounds> {
	feature.bounds_imcoords().map(|b| ImageBounds::from_slice(&b))
}

/// Sorted by score descending; drop low-score boxes first, then iteratively keep the top-scoring
/// remaining box and drop anything whose IoU with it exceeds `iou_threshold`.
fn non_max_suppression(features: Vec<Feature>, options: &FeatureSelectionOptions) -> Vec<Feature> {
	let mut candidates: Vec<Feature> =
		features.into_iter().filter(|f| f.detection_score().unwrap_or(0.0) >= options.skip_box_threshold).collect();

	let mut kept = Vec::new();
	while !candidates.is_empty() {
		let top = candidates.remove(0);
		let top_bounds = bounds_of(&top);
		candidates.retain(|candidate| match (top_bounds, bounds_of(candidate)) {
			(Some(a), Some(b)) => iou(&a, &b) <= options.iou_threshold,
			_ => true,
		});
		kept.push(top);
	}
	kept
}

/// Gaussian Soft-NMS: instead of hard-dropping overlapping boxes, rescore them by
/// `score' = score * exp(-IoU^2 / sigma)`, dropping any that fall below `skip_box_threshold`
/// after rescoring.
fn soft_non_max_suppression(mut features: Vec<Feature>, options: &FeatureSelectionOptions) -> Vec<Feature> {
	let mut kept = Vec::new();
	while !features.is_empty() {
		let top = features.remove(0);
		let top_bounds = bounds_of(&top);
		let top_score = top.detection_score().unwrap_or(0.0);

		let mut next_round = Vec::with_capacity(features.len());
		for mut candidate in features {
			if let (Some(a), Some(b)) = (top_bounds, bounds_of(&candidate)) {
				let overlap = iou(&a, &b);
				let score = candidate.detection_score().unwrap_or(0.0);
				let rescored = score * (-(overlap * overlap) / options.sigma).exp();
				if rescored >= options.skip_box_threshold {
					candidate.properties.insert("detection_score".to_string(), serde_json::Value::from(rescored));
					next_round.push(candidate);
				}
			} else {
				next_round.push(candidate);
			}
		}
		sort_by_score_desc_id_asc(&mut next_round);
		features = next_round;

		if top_score >= options.skip_box_threshold {
			kept.push(top);
		}
	}
	kept
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tile_factory::IdentitySensorModel;
	use pretty_assertions::assert_eq;

	fn feature_at(id: &str, bounds: [f64; 4], score: f64) -> Feature {
		Feature::raw(bounds, Some(score)).with_id(id)
	}

	#[test]
	fn none_algorithm_is_identity_modulo_geolocation_fields() {
		let refinery = FeatureRefinery::new(Arc::new(IdentitySensorModel), None);
		let features = vec![feature_at("a", [0.0, 0.0, 10.0, 10.0], 0.9)];
		let options = FeatureSelectionOptions { algorithm: FeatureSelectionAlgorithm::None, ..Default::default() };
		let refined = refinery.refine(features, &options);
		assert_eq!(refined.len(), 1);
		assert!(refined[0].geometry.is_some());
		assert!(refined[0].bbox.is_some());
		assert_eq!(refined[0].detection_score(), Some(0.9));
	}

	#[test]
	fn nms_drops_heavily_overlapping_lower_score_box() {
		let refinery = FeatureRefinery::new(Arc::new(IdentitySensorModel), None);
		let features = vec![
			feature_at("a", [0.0, 0.0, 10.0, 10.0], 0.9),
			feature_at("b", [1.0, 1.0, 11.0, 11.0], 0.5),
		];
		let options = FeatureSelectionOptions {
			algorithm: FeatureSelectionAlgorithm::Nms,
			iou_threshold: 0.5,
			skip_box_threshold: 0.0,
			sigma: 0.1,
		};
		let refined = refinery.refine(features, &options);
		assert_eq!(refined.len(), 1);
		assert_eq!(refined[0].id.as_deref(), Some("a"));
	}

	#[test]
	fn nms_keeps_disjoint_boxes() {
		let refinery = FeatureRefinery::new(Arc::new(IdentitySensorModel), None);
		let features = vec![
			feature_at("a", [0.0, 0.0, 10.0, 10.0], 0.9),
			feature_at("b", [100.0, 100.0, 110.0, 110.0], 0.5),
		];
		let options = FeatureSelectionOptions { algorithm: FeatureSelectionAlgorithm::Nms, ..Default::default() };
		let refined = refinery.refine(features, &options);
		assert_eq!(refined.len(), 2);
	}

	#[test]
	fn nms_is_idempotent() {
		let refinery = FeatureRefinery::new(Arc::new(IdentitySensorModel), None);
		let features = vec![
			feature_at("a", [0.0, 0.0, 10.0, 10.0], 0.9),
			feature_at("b", [1.0, 1.0, 11.0, 11.0], 0.5),
			feature_at("c", [200.0, 200.0, 210.0, 210.0], 0.7),
		];
		let options = FeatureSelectionOptions {
			algorithm: FeatureSelectionAlgorithm::Nms,
			iou_threshold: 0.5,
			skip_box_threshold: 0.0,
			sigma: 0.1,
		};
		let once = refinery.refine(features, &options);
		let ids_once: Vec<_> = once.iter().map(|f| f.id.clone()).collect();
		let twice = refinery.refine(once, &options);
		let ids_twice: Vec<_> = twice.iter().map(|f| f.id.clone()).collect();
		assert_eq!(ids_once, ids_twice);
	}

	#[test]
	fn soft_nms_rescores_instead_of_dropping_overlaps() {
		let refinery = FeatureRefinery::new(Arc::new(IdentitySensorModel), None);
		let features = vec![
			feature_at("a", [0.0, 0.0, 10.0, 10.0], 0.9),
			feature_at("b", [1.0, 1.0, 11.0, 11.0], 0.8),
		];
		let options = FeatureSelectionOptions {
			algorithm: FeatureSelectionAlgorithm::SoftNms,
			iou_threshold: 0.75,
			skip_box_threshold: 0.01,
			sigma: 0.5,
		};
		let refined = refinery.refine(features, &options);
		assert_eq!(refined.len(), 2);
		let rescored = refined.iter().find(|f| f.id.as_deref() == Some("b")).unwrap();
		assert!(rescored.detection_score().unwrap() < 0.8);
	}
}
