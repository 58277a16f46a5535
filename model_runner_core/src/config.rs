//! Runtime configuration, read once at process start from the environment.
//!
//! Mirrors the `ServiceConfig`/`app_config` pattern of the source project: every knob has a
//! sensible default so the runner works unconfigured, and every knob can be overridden through
//! an environment variable for deployment-specific tuning.

use crate::concurrency::ConcurrencyLimits;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
	std::env::var(key)
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(default)
}

/// Process-wide configuration for the model runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
	/// Number of `TileWorker` tasks run concurrently per region (spec.md §4.5).
	pub worker_count: usize,
	/// Depth of the bounded per-region tile queue (spec.md §5).
	pub tile_queue_depth: usize,
	/// Per-tile detector call timeout (spec.md §5, default 60s).
	pub detector_timeout: Duration,
	/// Wall-clock budget for a single region before it is closed as `PARTIAL` (spec.md §5).
	pub region_time_budget: Duration,
	/// Safety margin before assumed-role credential expiry at which a refresh is triggered
	/// (spec.md §4.3, default 5 minutes).
	pub credential_refresh_margin: Duration,
	/// Maximum number of read-modify-write retries for a conditional table update before it is
	/// treated as a fatal `ConditionalUpdateConflict` (spec.md §7).
	pub conditional_update_retries: u32,
	/// SNS/notification topic name for image-level status messages.
	pub image_status_topic: String,
	/// SNS/notification topic name for region-level status messages.
	pub region_status_topic: String,
	/// Optional CodeGuru profiling group name. Logged if present; profiling itself is out of
	/// scope for this crate.
	pub profiling_group: Option<String>,
}

impl RunnerConfig {
	/// Loads configuration from the process environment, falling back to defaults for any
	/// variable that is unset or fails to parse.
	pub fn from_env() -> Self {
		let limits = ConcurrencyLimits::new(env_or("MODEL_RUNNER_WORKER_COUNT", ConcurrencyLimits::default().worker_count));
		Self {
			worker_count: limits.worker_count,
			tile_queue_depth: env_or("MODEL_RUNNER_TILE_QUEUE_DEPTH", limits.tile_queue_depth),
			detector_timeout: Duration::from_secs(env_or("MODEL_RUNNER_DETECTOR_TIMEOUT_SECS", 60)),
			region_time_budget: Duration::from_secs(env_or("MODEL_RUNNER_REGION_BUDGET_SECS", 3600)),
			credential_refresh_margin: Duration::from_secs(env_or("MODEL_RUNNER_CREDENTIAL_REFRESH_MARGIN_SECS", 300)),
			conditional_update_retries: env_or("MODEL_RUNNER_CONDITIONAL_UPDATE_RETRIES", 5),
			image_status_topic: std::env::var("IMAGE_STATUS_TOPIC").unwrap_or_else(|_| "ImageStatusTopic".to_string()),
			region_status_topic: std::env::var("REGION_STATUS_TOPIC").unwrap_or_else(|_| "RegionStatusTopic".to_string()),
			profiling_group: std::env::var("CODEGURU_PROFILING_GROUP").ok(),
		}
	}
}

impl Default for RunnerConfig {
	fn default() -> Self {
		let limits = ConcurrencyLimits::default();
		Self {
			worker_count: limits.worker_count,
			tile_queue_depth: limits.tile_queue_depth,
			detector_timeout: Duration::from_secs(60),
			region_time_budget: Duration::from_secs(3600),
			credential_refresh_margin: Duration::from_secs(300),
			conditional_update_retries: 5,
			image_status_topic: "ImageStatusTopic".to_string(),
			region_status_topic: "RegionStatusTopic".to_string(),
			profiling_group: None,
		}
	}
}
