//! Concurrency sizing for the tile worker pool.
//!
//! The model runner is a mixed I/O/CPU workload: extracting a tile is mostly disk/driver I/O,
//! invoking the detector is network I/O, and the feature refinery is CPU-bound. `WorkerLimits`
//! picks a default pool size per spec.md §4.5 ("Concurrency `W` is configured (default: number
//! of cores, clamped)") while leaving room to size the per-region tile queue's backpressure
//! depth (§5, default `4 × W`) from the same number.

use num_cpus;

/// Concurrency sizing derived from the host's CPU count.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
	/// Number of `TileWorker` tasks to run concurrently per region.
	pub worker_count: usize,
	/// Depth of the bounded per-region tile queue feeding the worker pool.
	pub tile_queue_depth: usize,
}

impl ConcurrencyLimits {
	/// Builds limits from an explicit worker count, clamping it to at least 1 and deriving the
	/// tile queue depth as `4 × worker_count` per spec.md §5.
	pub fn new(worker_count: usize) -> Self {
		let worker_count = worker_count.max(1);
		Self {
			worker_count,
			tile_queue_depth: worker_count * 4,
		}
	}

	/// Number of logical CPUs available on this host.
	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	/// Defaults the worker count to the host's CPU count, per spec.md §4.5.
	fn default() -> Self {
		Self::new(num_cpus::get())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_matches_cpu_count() {
		let limits = ConcurrencyLimits::default();
		assert_eq!(limits.worker_count, num_cpus::get());
		assert_eq!(limits.tile_queue_depth, limits.worker_count * 4);
	}

	#[test]
	fn custom_worker_count() {
		let limits = ConcurrencyLimits::new(6);
		assert_eq!(limits.worker_count, 6);
		assert_eq!(limits.tile_queue_depth, 24);
	}

	#[test]
	fn zero_clamps_to_one() {
		let limits = ConcurrencyLimits::new(0);
		assert_eq!(limits.worker_count, 1);
		assert_eq!(limits.tile_queue_depth, 4);
	}
}
