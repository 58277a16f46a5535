//! Derives and publishes a region's status once its tile worker pool drains (spec.md §4.6, §4.8).

use super::request_status::RequestStatus;
use super::status_message::StatusMessage;
use crate::common::ObservableEvent;
use crate::database::RegionRequestItem;
use crate::errors::StatusMonitorException;

/// A region is terminal as soon as its worker pool drains, so unlike `image_status` there is no
/// outstanding-work case: `failed_tile_count` alone against `total_tiles` decides the outcome.
pub fn region_status(item: &RegionRequestItem) -> RequestStatus {
	if item.failed_tile_count == 0 {
		RequestStatus::Success
	} else if item.failed_tile_count == item.total_tiles {
		RequestStatus::Failed
	} else {
		RequestStatus::Partial
	}
}

#[derive(Default)]
pub struct RegionStatusMonitor {
	event: ObservableEvent<StatusMessage>,
}

impl RegionStatusMonitor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&mut self, handler: impl Fn(&StatusMessage) -> anyhow::Result<()> + Send + Sync + 'static) -> crate::common::SubscriptionId {
		self.event.subscribe(handler)
	}

	pub fn publish(&self, item: &RegionRequestItem) -> Result<(), StatusMonitorException> {
		let status = region_status(item);
		let failed_tiles = if item.failed_tiles.is_empty() { None } else { Some(item.failed_tiles.clone()) };
		let message = StatusMessage::new(
			status,
			item.job_id.clone(),
			Some(item.image_id.clone()),
			Some(item.region_id.clone()),
			item.processing_duration,
			failed_tiles,
		)?;
		self.event.publish(&message);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tiling::Crop;
	use pretty_assertions::assert_eq;

	fn item(total_tiles: u32, succeeded_tile_count: u32, failed_tile_count: u32) -> RegionRequestItem {
		let mut item = RegionRequestItem::new("job-1", "image-1", "region-1");
		item.total_tiles = total_tiles;
		item.succeeded_tile_count = succeeded_tile_count;
		item.failed_tile_count = failed_tile_count;
		item.processing_duration = Some(100);
		item
	}

	#[test]
	fn no_failures_is_success() {
		assert_eq!(region_status(&item(10, 10, 0)), RequestStatus::Success);
	}

	#[test]
	fn some_failures_not_all_is_partial_even_if_succeeded_count_is_stale() {
		assert_eq!(region_status(&item(10, 3, 4)), RequestStatus::Partial);
	}

	#[test]
	fn every_tile_failed_is_failed() {
		assert_eq!(region_status(&item(10, 0, 10)), RequestStatus::Failed);
	}

	#[test]
	fn publish_carries_failed_tiles() {
		let mut monitor = RegionStatusMonitor::new();
		let received = std::sync::Arc::new(parking_lot::Mutex::new(None));
		let sink = received.clone();
		monitor.subscribe(move |message| {
			*sink.lock() = Some(message.clone());
			Ok(())
		});
		let mut failing = item(2, 1, 1);
		failing.failed_tiles = vec![Crop::new((0, 0), (4, 4))];
		monitor.publish(&failing).unwrap();
		let message = received.lock().clone().unwrap();
		assert_eq!(message.status, RequestStatus::Partial);
		assert_eq!(message.failed_tiles.unwrap().len(), 1);
	}
}
