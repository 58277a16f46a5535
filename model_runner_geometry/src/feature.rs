//! The GeoJSON `Feature`/`FeatureCollection` shapes exchanged with detector endpoints and written
//! to output sinks (spec.md §3 Feature entity, §4.3/§4.4).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A geometry value. Only `Polygon` is produced by the refinery; `Point`/`LineString` round-trip
/// through `Value` so arbitrary detector output still deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
	Point {
		coordinates: [f64; 2],
	},
	#[serde(rename = "LineString")]
	LineString {
		coordinates: Vec<[f64; 2]>,
	},
	Polygon {
		coordinates: Vec<Vec<[f64; 2]>>,
	},
}

impl Geometry {
	/// Builds a single-ring rectangular polygon from four `(lon, lat)` corners, closing the ring
	/// by repeating the first point as required by the GeoJSON spec.
	pub fn rectangle(corners: [(f64, f64); 4]) -> Self {
		let mut ring: Vec<[f64; 2]> = corners.iter().map(|(lon, lat)| [*lon, *lat]).collect();
		ring.push(ring[0]);
		Geometry::Polygon { coordinates: vec![ring] }
	}
}

/// A single detection, before or after geodetic refinement.
///
/// Raw detector output carries `properties.bounds_imcoords` and `properties.detection_score`
/// (spec.md §3); after refinement a feature additionally carries a `Polygon` geometry, a `bbox`,
/// and `properties.center_latitude`/`center_longitude`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
	#[serde(rename = "type")]
	pub feature_type: FeatureType,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	pub geometry: Option<Geometry>,

	#[serde(rename = "bbox", skip_serializing_if = "Option::is_none")]
	pub bbox: Option<[f64; 4]>,

	pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
	Feature,
}

impl Feature {
	/// Builds a raw, un-refined feature from a tile-local detection: no geometry yet, just the
	/// image-coordinate bounds and score a detector reports.
	pub fn raw(bounds_imcoords: [f64; 4], detection_score: Option<f64>) -> Self {
		let mut properties = Map::new();
		properties.insert(
			"bounds_imcoords".to_string(),
			Value::Array(bounds_imcoords.iter().map(|v| Value::from(*v)).collect()),
		);
		if let Some(score) = detection_score {
			properties.insert("detection_score".to_string(), Value::from(score));
		}
		Self { feature_type: FeatureType::Feature, id: None, geometry: None, bbox: None, properties }
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// The raw image-coordinate bounds this feature was detected at, if present.
	pub fn bounds_imcoords(&self) -> Option<[f64; 4]> {
		let arr = self.properties.get("bounds_imcoords")?.as_array()?;
		if arr.len() != 4 {
			return None;
		}
		let mut out = [0.0; 4];
		for (slot, value) in out.iter_mut().zip(arr.iter()) {
			*slot = value.as_f64()?;
		}
		Some(out)
	}

	/// The detector-reported confidence score, if present.
	pub fn detection_score(&self) -> Option<f64> {
		self.properties.get("detection_score").and_then(Value::as_f64)
	}

	/// Tags this feature with the image it was detected in and the tile (crop) it came from, so
	/// duplicates on tile seams can be identified during region-level de-duplication.
	pub fn with_tile_origin(mut self, image_id: &str, tile_origin: (u32, u32)) -> Self {
		self.properties.insert("image_id".to_string(), Value::from(image_id));
		self.properties.insert(
			"tile_origin".to_string(),
			Value::Array(vec![Value::from(tile_origin.0), Value::from(tile_origin.1)]),
		);
		self
	}

	/// Attaches the refined geolocation: a closed polygon ring, its bbox, and a labeled centroid.
	pub fn with_geolocation(mut self, corners: [(f64, f64); 4], center_lon: f64, center_lat: f64) -> Self {
		self.geometry = Some(Geometry::rectangle(corners));
		let lons: Vec<f64> = corners.iter().map(|(lon, _)| *lon).collect();
		let lats: Vec<f64> = corners.iter().map(|(_, lat)| *lat).collect();
		let min_lon = lons.iter().cloned().fold(f64::INFINITY, f64::min);
		let max_lon = lons.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
		let min_lat = lats.iter().cloned().fold(f64::INFINITY, f64::min);
		let max_lat = lats.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
		self.bbox = Some([min_lon, min_lat, max_lon, max_lat]);
		self.properties.insert("center_longitude".to_string(), Value::from(center_lon));
		self.properties.insert("center_latitude".to_string(), Value::from(center_lat));
		self
	}
}

/// A collection of features, the top-level shape detector responses and sink payloads use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
	#[serde(rename = "type")]
	pub collection_type: FeatureCollectionType,
	pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionType {
	FeatureCollection,
}

impl FeatureCollection {
	pub fn new(features: Vec<Feature>) -> Self {
		Self { collection_type: FeatureCollectionType::FeatureCollection, features }
	}
}
