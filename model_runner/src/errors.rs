//! Error types for the model runner pipeline.
//!
//! Per the error handling design: tile failures never kill a region, region failures never kill
//! a job, job failures never kill the worker process. Leaf errors here are the values that
//! components convert into an outcome (a `TileOutcome::Failure`, a `FAILED` region) rather than
//! propagate, except where the table explicitly marks them fatal.

use thiserror::Error;

/// `TilingStrategy::generate_crops` rejects configurations where overlap would produce a
/// non-advancing or negative stride.
#[derive(Debug, Error)]
#[error("invalid crop configuration: overlap {overlap:?} must be smaller than crop size {crop_size:?}")]
pub struct InvalidConfigError {
	pub crop_size: (u32, u32),
	pub overlap: (u32, u32),
}

/// `TileFactory::open`/`extract_tile`/`elevation_tile` raster driver failure.
#[derive(Debug, Error)]
#[error("unable to read image: {0}")]
pub struct UnreadableImageError(pub String);

/// `RegionProcessor::process` entry validation failure.
#[derive(Debug, Error)]
#[error("invalid region request: {0}")]
pub struct InvalidRegionRequest(pub String);

/// SMDetector could not assume the image request's execution role. Fatal to the whole job.
#[derive(Debug, Error)]
#[error("unable to assume execution role {role}: {reason}")]
pub struct InvalidAssumedRoleException {
	pub role: String,
	pub reason: String,
}

/// `Classification::new` rejects a level/caveat/releasability combination that violates the
/// classification rules.
#[derive(Debug, Error)]
#[error("invalid classification: {0}")]
pub struct InvalidClassificationException(pub String);

/// `StatusMonitor::process_event` is missing a required field and refuses to fabricate one.
#[derive(Debug, Error)]
#[error("status monitor cannot publish: {0}")]
pub struct StatusMonitorException(pub String);

/// A conditional (compare-and-set) update to `JobTable`/`RegionTable` did not find the expected
/// prior value after exhausting its retry budget.
#[derive(Debug, Error)]
#[error("conditional update conflict on {table} key {key} after {attempts} attempts")]
pub struct ConditionalUpdateConflict {
	pub table: &'static str,
	pub key: String,
	pub attempts: u32,
}

/// Detector-side failures. The detector never raises these to its caller — it catches them and
/// returns an empty `FeatureCollection` while incrementing its own `error_count` — but they are
/// still named types so call sites can log the reason.
#[derive(Debug, Error)]
pub enum DetectorError {
	#[error("retries exhausted calling detector endpoint: {0}")]
	RetryError(String),

	#[error("all detector endpoints unreachable: {0}")]
	MaxRetryError(String),

	#[error("could not decode detector response body: {0}")]
	DecodeError(String),

	#[error("detector endpoint returned an error status: {0}")]
	EndpointError(String),

	#[error("detector call timed out")]
	Timeout,
}
