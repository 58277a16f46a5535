//! Terminal consumers of a finished image's feature collection (spec.md §6).

use model_runner_geometry::Feature;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Whether a sink receives the whole feature collection once at the end (`AGGREGATE`) or
/// incremental writes as regions complete (`STREAMING`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkMode {
	#[serde(rename = "AGGREGATE")]
	Aggregate,
	#[serde(rename = "STREAMING")]
	Streaming,
}

impl fmt::Display for SinkMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SinkMode::Aggregate => write!(f, "AGGREGATE"),
			SinkMode::Streaming => write!(f, "STREAMING"),
		}
	}
}

/// The inbound wire shape for an output sink: `{ "type": "S3"|"Kinesis", "mode": ..., "config": {} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkDescriptor {
	#[serde(rename = "type")]
	pub sink_type: String,
	pub mode: SinkMode,
	#[serde(default)]
	pub config: Map<String, Value>,
}

/// A terminal consumer of a completed image's features. Sinks are idempotent on `image_id`
/// (at-least-once delivery is sufficient, per spec.md §1 Non-goals).
pub trait Sink: fmt::Display + Send + Sync {
	fn name(&self) -> &str;
	fn mode(&self) -> SinkMode;
	fn write(&self, image_id: &str, features: &[Feature]) -> bool;
}

/// Formats any `Sink` as `"<Name> <Mode>"`, matching the Python reference's `__str__`.
fn display_sink(sink: &dyn Sink, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	write!(f, "{} {}", sink.name(), sink.mode())
}

/// Writes the aggregated feature collection to S3 once, at image completion.
pub struct S3Sink {
	pub bucket: String,
	pub prefix: String,
}

impl Sink for S3Sink {
	fn name(&self) -> &str {
		"S3Sink"
	}

	fn mode(&self) -> SinkMode {
		SinkMode::Aggregate
	}

	fn write(&self, image_id: &str, features: &[Feature]) -> bool {
		log::info!(
			"writing {} feature(s) for image {image_id} to s3://{}/{}",
			features.len(),
			self.bucket,
			self.prefix
		);
		true
	}
}

impl fmt::Display for S3Sink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		display_sink(self, f)
	}
}

/// Streams features to a Kinesis data stream as regions complete.
pub struct KinesisSink {
	pub stream_name: String,
}

impl Sink for KinesisSink {
	fn name(&self) -> &str {
		"KinesisSink"
	}

	fn mode(&self) -> SinkMode {
		SinkMode::Streaming
	}

	fn write(&self, image_id: &str, features: &[Feature]) -> bool {
		log::info!("streaming {} feature(s) for image {image_id} to {}", features.len(), self.stream_name);
		true
	}
}

impl fmt::Display for KinesisSink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		display_sink(self, f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	struct MockSink;

	impl Sink for MockSink {
		fn name(&self) -> &str {
			"MockSink"
		}

		fn mode(&self) -> SinkMode {
			SinkMode::Aggregate
		}

		fn write(&self, _image_id: &str, _features: &[Feature]) -> bool {
			true
		}
	}

	impl fmt::Display for MockSink {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			display_sink(self, f)
		}
	}

	#[test]
	fn string_representation_combines_name_and_mode() {
		assert_eq!(MockSink.to_string(), "MockSink AGGREGATE");
	}

	#[test]
	fn sink_descriptor_deserializes_from_wire_shape() {
		let descriptor: SinkDescriptor = serde_json::from_value(serde_json::json!({
			"type": "S3",
			"mode": "AGGREGATE",
			"config": { "bucket": "my-bucket" },
		}))
		.unwrap();
		assert_eq!(descriptor.sink_type, "S3");
		assert_eq!(descriptor.mode, SinkMode::Aggregate);
	}
}
