//! A typed publisher with a list of handlers, used by the status monitors to notify subscribers
//! of status transitions.
//!
//! Handlers should not fail; if one does, the error is logged and swallowed so a subscriber can
//! never break the publisher's control flow. Handlers run in subscription order; subscribing the
//! same handler twice invokes it twice.

use std::sync::Arc;

type Handler<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// An opaque token returned by `subscribe`, usable with `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

pub struct ObservableEvent<T> {
	handlers: Vec<(SubscriptionId, Handler<T>)>,
	next_id: usize,
}

impl<T> ObservableEvent<T> {
	pub fn new() -> Self {
		Self { handlers: Vec::new(), next_id: 0 }
	}

	pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
	where
		F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
	{
		let id = SubscriptionId(self.next_id);
		self.next_id += 1;
		self.handlers.push((id, Arc::new(handler)));
		id
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) {
		self.handlers.retain(|(handler_id, _)| *handler_id != id);
	}

	/// Invokes every subscribed handler in subscription order. A handler error is logged and
	/// does not prevent later handlers from running or propagate to the caller.
	pub fn publish(&self, event: &T) {
		for (_, handler) in &self.handlers {
			if let Err(error) = handler(event) {
				log::error!("event handler failed, ignoring: {error:#}");
			}
		}
	}
}

impl<T> Default for ObservableEvent<T> {
	fn default() -> Self {
		Self::new()
	}
}
