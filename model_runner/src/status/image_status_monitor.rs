//! Derives and publishes an image's overall status as regions complete (spec.md §4.7).

use super::request_status::RequestStatus;
use super::status_message::StatusMessage;
use crate::common::ObservableEvent;
use crate::database::JobItem;
use crate::errors::StatusMonitorException;

/// SUCCESS/FAILED/PARTIAL only apply once every region has reported; an image with regions
/// still outstanding is always IN_PROGRESS regardless of how its finished regions split
/// between success and error.
pub fn image_status(item: &JobItem) -> RequestStatus {
	if item.region_success + item.region_error < item.region_count {
		return RequestStatus::InProgress;
	}
	if item.region_error == 0 {
		RequestStatus::Success
	} else if item.region_success == 0 {
		RequestStatus::Failed
	} else {
		RequestStatus::Partial
	}
}

/// Wraps an [`ObservableEvent`] so callers subscribe once and get every status transition for
/// every image, rather than polling `JobTable` (spec.md §6).
#[derive(Default)]
pub struct ImageStatusMonitor {
	event: ObservableEvent<StatusMessage>,
}

impl ImageStatusMonitor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&mut self, handler: impl Fn(&StatusMessage) -> anyhow::Result<()> + Send + Sync + 'static) -> crate::common::SubscriptionId {
		self.event.subscribe(handler)
	}

	/// Computes the current status from `item` and publishes it. Fails if `item` carries no
	/// `job_id`/`processing_duration` yet (spec.md §4.8).
	pub fn publish(&self, item: &JobItem) -> Result<(), StatusMonitorException> {
		let status = image_status(item);
		let message = StatusMessage::new(
			status,
			item.job_id.clone(),
			Some(item.image_id.clone()),
			None,
			item.processing_duration,
			None,
		)?;
		self.event.publish(&message);
		Ok(())
	}
}
