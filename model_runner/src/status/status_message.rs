//! The payload published to a status notification topic (spec.md §4.8, §6).

use super::request_status::RequestStatus;
use crate::errors::StatusMonitorException;
use crate::tiling::Crop;
use std::collections::BTreeMap;

/// A status transition notification. `status`, `job_id`, and `processing_duration` are required;
/// construction fails with `StatusMonitorException` rather than fabricate a missing value
/// (spec.md §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
	pub status: RequestStatus,
	pub job_id: String,
	pub image_id: Option<String>,
	pub region_id: Option<String>,
	pub processing_duration: u64,
	pub failed_tiles: Option<Vec<Crop>>,
}

impl StatusMessage {
	pub fn new(
		status: RequestStatus,
		job_id: Option<String>,
		image_id: Option<String>,
		region_id: Option<String>,
		processing_duration: Option<u64>,
		failed_tiles: Option<Vec<Crop>>,
	) -> Result<Self, StatusMonitorException> {
		let job_id = job_id.ok_or_else(|| StatusMonitorException("missing required field: job_id".to_string()))?;
		let processing_duration = processing_duration
			.ok_or_else(|| StatusMonitorException("missing required field: processing_duration".to_string()))?;
		Ok(Self { status, job_id, image_id, region_id, processing_duration, failed_tiles })
	}

	/// Structured form: present fields only, `failed_tiles` as a plain nested list of
	/// `[[row, col], [width, height]]` pairs.
	pub fn asdict(&self) -> BTreeMap<&'static str, serde_json::Value> {
		let mut map = BTreeMap::new();
		map.insert("status", serde_json::Value::from(self.status.to_string()));
		map.insert("job_id", serde_json::Value::from(self.job_id.clone()));
		if let Some(image_id) = &self.image_id {
			map.insert("image_id", serde_json::Value::from(image_id.clone()));
		}
		if let Some(region_id) = &self.region_id {
			map.insert("region_id", serde_json::Value::from(region_id.clone()));
		}
		map.insert("processing_duration", serde_json::Value::from(self.processing_duration));
		if let Some(failed_tiles) = &self.failed_tiles {
			map.insert("failed_tiles", crops_to_value(failed_tiles));
		}
		map
	}

	/// Every present value stringified. `failed_tiles` keeps the source system's ordinal-object
	/// encoding: `[{"1": [[r,c],[h,w]]}, {"2": ...}]`, 1-based (spec.md §4.8, §9).
	pub fn asdict_str_values(&self) -> BTreeMap<&'static str, String> {
		let mut map = BTreeMap::new();
		map.insert("status", self.status.to_string());
		map.insert("job_id", self.job_id.clone());
		if let Some(image_id) = &self.image_id {
			map.insert("image_id", image_id.clone());
		}
		if let Some(region_id) = &self.region_id {
			map.insert("region_id", region_id.clone());
		}
		map.insert("processing_duration", self.processing_duration.to_string());
		if let Some(failed_tiles) = &self.failed_tiles {
			map.insert("failed_tiles", failed_tiles_ordinal_repr(failed_tiles));
		}
		map
	}
}

fn crops_to_value(crops: &[Crop]) -> serde_json::Value {
	serde_json::Value::Array(
		crops
			.iter()
			.map(|crop| {
				serde_json::json!([[crop.origin.0, crop.origin.1], [crop.size.0, crop.size.1]])
			})
			.collect(),
	)
}

/// Reproduces the source system's `str([{'1': [[r,c],[h,w]]}, ...])` Python repr exactly,
/// including single quotes around the ordinal key.
fn failed_tiles_ordinal_repr(crops: &[Crop]) -> String {
	let entries: Vec<String> = crops
		.iter()
		.enumerate()
		.map(|(i, crop)| {
			format!(
				"{{'{}': [[{}, {}], [{}, {}]]}}",
				i + 1,
				crop.origin.0,
				crop.origin.1,
				crop.size.0,
				crop.size.1
			)
		})
		.collect();
	format!("[{}]", entries.join(", "))
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn sample() -> StatusMessage {
		StatusMessage::new(
			RequestStatus::Success,
			Some("1234".to_string()),
			Some("image-5678".to_string()),
			Some("region-9999".to_string()),
			Some(1234),
			Some(vec![Crop::new((1, 2), (3, 4)), Crop::new((5, 6), (7, 8))]),
		)
		.unwrap()
	}

	#[test]
	fn asdict_keeps_structured_failed_tiles() {
		let message = sample();
		let dict = message.asdict();
		assert_eq!(dict["status"], serde_json::Value::from("SUCCESS"));
		assert_eq!(dict["job_id"], serde_json::Value::from("1234"));
		assert_eq!(dict["processing_duration"], serde_json::Value::from(1234));
		assert_eq!(dict["failed_tiles"], serde_json::json!([[[1, 2], [3, 4]], [[5, 6], [7, 8]]]));
	}

	#[test]
	fn asdict_str_values_stringifies_everything() {
		let message = sample();
		let dict = message.asdict_str_values();
		assert_eq!(dict["status"], "SUCCESS");
		assert_eq!(dict["job_id"], "1234");
		assert_eq!(dict["processing_duration"], "1234");
		assert_eq!(dict["failed_tiles"], "[{'1': [[1, 2], [3, 4]]}, {'2': [[5, 6], [7, 8]]}]");
	}

	#[test]
	fn missing_optional_fields_are_omitted() {
		let message =
			StatusMessage::new(RequestStatus::Failed, Some("5678".to_string()), None, None, Some(0), None).unwrap();
		let dict = message.asdict();
		assert_eq!(dict.len(), 3);
		assert!(!dict.contains_key("image_id"));
		assert!(!dict.contains_key("failed_tiles"));

		let dict_str = message.asdict_str_values();
		assert_eq!(dict_str.len(), 3);
	}

	#[test]
	fn single_failed_tile_formats_correctly() {
		let message = StatusMessage::new(
			RequestStatus::Failed,
			Some("5678".to_string()),
			None,
			None,
			Some(0),
			Some(vec![Crop::new((1, 2), (3, 4))]),
		)
		.unwrap();
		assert_eq!(message.asdict_str_values()["failed_tiles"], "[{'1': [[1, 2], [3, 4]]}]");
	}

	#[test]
	fn missing_job_id_is_rejected() {
		let result = StatusMessage::new(RequestStatus::Failed, None, None, None, Some(0), None);
		assert!(result.is_err());
	}

	#[test]
	fn missing_processing_duration_is_rejected() {
		let result = StatusMessage::new(RequestStatus::Failed, Some("5678".to_string()), None, None, None, None);
		assert!(result.is_err());
	}
}
