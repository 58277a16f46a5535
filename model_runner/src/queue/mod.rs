//! Durable inbound message queue (spec.md §3, §6).
//!
//! `JobQueue` is abstracted behind a trait — the managed queue service itself is out of scope —
//! with a simple in-memory `VecDeque` implementation used by tests and the bundled CLI demo.

use crate::api::ImageRequest;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Durable FIFO queue of inbound `ImageRequest` messages.
pub trait JobQueue: Send + Sync {
	fn enqueue(&self, request: ImageRequest);
	/// Pops the next message, or `None` if the queue is currently empty.
	fn poll(&self) -> Option<ImageRequest>;
}

/// An in-memory FIFO queue. Not durable across process restarts; for tests and the CLI demo.
#[derive(Default)]
pub struct InMemoryJobQueue {
	messages: Mutex<VecDeque<ImageRequest>>,
}

impl InMemoryJobQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.messages.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.lock().is_empty()
	}
}

impl JobQueue for InMemoryJobQueue {
	fn enqueue(&self, request: ImageRequest) {
		self.messages.lock().push_back(request);
	}

	fn poll(&self) -> Option<ImageRequest> {
		self.messages.lock().pop_front()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn request(image_id: &str) -> ImageRequest {
		serde_json::from_value(serde_json::json!({
			"image_id": image_id,
			"image_url": "s3://bucket/image.ntf",
			"model_name": "test-model",
			"model_invoke_mode": "SM_ENDPOINT",
		}))
		.unwrap()
	}

	#[test]
	fn fifo_ordering_is_preserved() {
		let queue = InMemoryJobQueue::new();
		queue.enqueue(request("a"));
		queue.enqueue(request("b"));
		assert_eq!(queue.poll().unwrap().image_id, "a");
		assert_eq!(queue.poll().unwrap().image_id, "b");
		assert!(queue.poll().is_none());
	}

	#[test]
	fn poll_on_empty_queue_returns_none() {
		let queue = InMemoryJobQueue::new();
		assert!(queue.poll().is_none());
		assert!(queue.is_empty());
	}
}
