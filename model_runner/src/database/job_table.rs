//! `JobTable`: keyed on `image_id`, tracks per-image region completion counters under concurrent
//! updates from many region owners (spec.md §3, §5).

use crate::errors::ConditionalUpdateConflict;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// A durable row tracking one image's overall processing state.
#[derive(Debug, Clone)]
pub struct JobItem {
	pub job_id: Option<String>,
	pub image_id: String,
	pub processing_duration: Option<u64>,
	pub region_count: u32,
	pub region_success: u32,
	pub region_error: u32,
}

impl JobItem {
	pub fn new(job_id: impl Into<String>, image_id: impl Into<String>) -> Self {
		Self {
			job_id: Some(job_id.into()),
			image_id: image_id.into(),
			processing_duration: None,
			region_count: 0,
			region_success: 0,
			region_error: 0,
		}
	}

	/// `region_success + region_error <= region_count` (spec.md §3 invariant).
	pub fn is_consistent(&self) -> bool {
		self.region_success + self.region_error <= self.region_count
	}

	/// All regions have reported an outcome.
	pub fn is_terminal(&self) -> bool {
		self.region_success + self.region_error == self.region_count
	}
}

/// Durable store keyed by `image_id`, with a conditional (compare-and-set) region-completion
/// increment that is idempotent per `region_id` (spec.md §5, §9).
pub trait JobTable: Send + Sync {
	fn put(&self, item: JobItem);
	fn get(&self, image_id: &str) -> Option<JobItem>;

	/// Increments `region_success` or `region_error` by exactly one, guarded by
	/// `region_success + region_error < region_count` and de-duplicated by `region_id` so a
	/// retried completion notification cannot double-count (spec.md §4.7, §5, §9).
	fn record_region_outcome(&self, image_id: &str, region_id: &str, succeeded: bool)
		-> Result<JobItem, ConditionalUpdateConflict>;
}

#[derive(Default)]
struct Row {
	item: JobItem,
	seen_region_ids: HashSet<String>,
}

/// An in-memory reference implementation, used by the bundled CLI demo and by tests.
pub struct InMemoryJobTable {
	rows: Mutex<HashMap<String, Row>>,
	max_retries: u32,
}

impl InMemoryJobTable {
	pub fn new(max_retries: u32) -> Self {
		Self { rows: Mutex::new(HashMap::new()), max_retries }
	}
}

impl Default for InMemoryJobTable {
	fn default() -> Self {
		Self::new(5)
	}
}

impl JobTable for InMemoryJobTable {
	fn put(&self, item: JobItem) {
		let image_id = item.image_id.clone();
		self.rows.lock().insert(image_id, Row { item, seen_region_ids: HashSet::new() });
	}

	fn get(&self, image_id: &str) -> Option<JobItem> {
		self.rows.lock().get(image_id).map(|row| row.item.clone())
	}

	fn record_region_outcome(
		&self,
		image_id: &str,
		region_id: &str,
		succeeded: bool,
	) -> Result<JobItem, ConditionalUpdateConflict> {
		let mut rows = self.rows.lock();
		let row = rows.get_mut(image_id).ok_or_else(|| ConditionalUpdateConflict {
			table: "JobTable",
			key: image_id.to_string(),
			attempts: 0,
		})?;

		if row.seen_region_ids.contains(region_id) {
			return Ok(row.item.clone());
		}

		if !row.item.is_consistent() || row.item.region_success + row.item.region_error >= row.item.region_count {
			return Err(ConditionalUpdateConflict {
				table: "JobTable",
				key: image_id.to_string(),
				attempts: self.max_retries,
			});
		}

		if succeeded {
			row.item.region_success += 1;
		} else {
			row.item.region_error += 1;
		}
		row.seen_region_ids.insert(region_id.to_string());
		Ok(row.item.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn records_success_and_error_independently() {
		let table = InMemoryJobTable::default();
		let mut item = JobItem::new("job-1", "image-1");
		item.region_count = 2;
		table.put(item);

		let updated = table.record_region_outcome("image-1", "region-a", true).unwrap();
		assert_eq!(updated.region_success, 1);
		let updated = table.record_region_outcome("image-1", "region-b", false).unwrap();
		assert_eq!(updated.region_error, 1);
		assert!(updated.is_terminal());
	}

	#[test]
	fn retrying_same_region_id_does_not_double_count() {
		let table = InMemoryJobTable::default();
		let mut item = JobItem::new("job-1", "image-1");
		item.region_count = 3;
		table.put(item);

		table.record_region_outcome("image-1", "region-a", true).unwrap();
		let retried = table.record_region_outcome("image-1", "region-a", true).unwrap();
		assert_eq!(retried.region_success, 1);
	}

	#[test]
	fn exceeding_region_count_is_a_conflict() {
		let table = InMemoryJobTable::default();
		let mut item = JobItem::new("job-1", "image-1");
		item.region_count = 1;
		item.region_success = 1;
		table.put(item);

		let result = table.record_region_outcome("image-1", "region-a", true);
		assert!(result.is_err());
	}

	#[test]
	fn invariant_holds_under_many_concurrent_completions() {
		let table = InMemoryJobTable::default();
		let mut item = JobItem::new("job-1", "image-1");
		item.region_count = 50;
		table.put(item);
		for i in 0..50 {
			table.record_region_outcome("image-1", &format!("region-{i}"), i % 2 == 0).unwrap();
		}
		let final_item = table.get("image-1").unwrap();
		assert!(final_item.is_consistent());
		assert!(final_item.is_terminal());
		assert_eq!(final_item.region_success + final_item.region_error, 50);
	}
}
