//! Submits tiles to inference endpoints and accounts for failures (spec.md §4.3).

pub mod credentials;
pub mod http_detector;
pub mod sm_detector;

pub use credentials::{AssumedCredentials, CredentialProvider};
pub use http_detector::HttpDetector;
pub use sm_detector::SmDetector;

use crate::api::ModelInvokeMode;
use model_runner_geometry::FeatureCollection;
use std::sync::atomic::{AtomicU64, Ordering};

/// Submits a tile's bytes to an inference endpoint and returns its raw detections.
///
/// A Detector never raises to its caller: on any failure it returns an empty
/// `FeatureCollection` and increments its own `error_count`, because a single tile failure must
/// not abort the region (spec.md §4.3, §7).
pub trait Detector: Send + Sync {
	fn name(&self) -> &str;
	fn mode(&self) -> ModelInvokeMode;
	fn find_features(&self, tile_bytes: &[u8]) -> FeatureCollection;
	fn error_count(&self) -> u64;
}

/// Shared monotonic error counter, embedded in both `SmDetector` and `HttpDetector`.
#[derive(Debug, Default)]
pub struct ErrorCounter(AtomicU64);

impl ErrorCounter {
	pub fn new() -> Self {
		Self(AtomicU64::new(0))
	}

	pub fn increment(&self) {
		self.0.fetch_add(1, Ordering::SeqCst);
	}

	pub fn get(&self) -> u64 {
		self.0.load(Ordering::SeqCst)
	}
}

/// Builds the right `Detector` implementation for an `ImageRequest`'s `model_invoke_mode`
/// (spec.md §9 "dynamic dispatch on model mode").
pub struct FeatureDetectorFactory {
	pub endpoint: String,
	pub endpoint_mode: ModelInvokeMode,
	pub execution_role: Option<String>,
}

impl FeatureDetectorFactory {
	pub fn new(endpoint: impl Into<String>, endpoint_mode: ModelInvokeMode) -> Self {
		Self { endpoint: endpoint.into(), endpoint_mode, execution_role: None }
	}

	pub fn with_execution_role(mut self, role: Option<String>) -> Self {
		self.execution_role = role;
		self
	}

	pub fn build(self) -> Box<dyn Detector> {
		match self.endpoint_mode {
			ModelInvokeMode::SmEndpoint | ModelInvokeMode::None => {
				Box::new(SmDetector::new(self.endpoint, self.execution_role))
			}
			ModelInvokeMode::HttpEndpoint => Box::new(HttpDetector::new(self.endpoint, "http-detector")),
		}
	}
}
