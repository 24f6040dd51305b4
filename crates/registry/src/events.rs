//! Cancelable pre-mutation notifications.
//!
//! Every mutating operation publishes one notification *before* committing.
//! Delivery is synchronous on the calling thread: publish returns after all
//! subscribers have run, and the pipeline then reads the cancel flag. A slow
//! subscriber blocks the caller; that is the accepted cost of the synchronous
//! model, not something this module tries to mitigate.

use std::sync::Arc;

use hearth_primitives::{Home, OwnerId};
use parking_lot::RwLock;

/// A pending mutation, described to subscribers before it commits.
///
/// All variants borrow the home they describe: for [`HomeEvent::Set`] that is
/// the candidate about to be stored, for the others the currently stored
/// value.
#[derive(Debug)]
pub enum HomeEvent<'a> {
	/// A home is about to be created or replaced.
	Set {
		owner: OwnerId,
		/// Display name as supplied by the caller.
		name: &'a str,
		/// The candidate value, including its fresh timestamp.
		home: &'a Home,
		/// Whether a home with the same folded name already exists.
		is_update: bool,
	},
	/// A home is about to be removed.
	Delete {
		owner: OwnerId,
		name: &'a str,
		home: &'a Home,
	},
	/// An owner is about to be teleported to a home.
	Teleport {
		owner: OwnerId,
		name: &'a str,
		home: &'a Home,
	},
}

impl<'a> HomeEvent<'a> {
	/// The owner the pending mutation belongs to.
	pub fn owner(&self) -> OwnerId {
		match self {
			HomeEvent::Set { owner, .. }
			| HomeEvent::Delete { owner, .. }
			| HomeEvent::Teleport { owner, .. } => *owner,
		}
	}

	/// The home name as the caller supplied it.
	pub fn name(&self) -> &'a str {
		match self {
			HomeEvent::Set { name, .. }
			| HomeEvent::Delete { name, .. }
			| HomeEvent::Teleport { name, .. } => *name,
		}
	}

	/// The home the event describes.
	pub fn home(&self) -> &'a Home {
		match self {
			HomeEvent::Set { home, .. }
			| HomeEvent::Delete { home, .. }
			| HomeEvent::Teleport { home, .. } => *home,
		}
	}
}

/// A [`HomeEvent`] in flight, carrying the cancel flag.
///
/// Subscribers veto by calling [`cancel`](Self::cancel). The flag only ever
/// goes from clear to set; publishing continues through the remaining
/// subscribers either way, and the registry inspects the flag once publish
/// has returned.
#[derive(Debug)]
pub struct HomeNotification<'a> {
	event: HomeEvent<'a>,
	cancelled: bool,
}

impl<'a> HomeNotification<'a> {
	/// Wraps an event, not yet cancelled.
	pub fn new(event: HomeEvent<'a>) -> Self {
		Self {
			event,
			cancelled: false,
		}
	}

	/// The pending mutation being announced.
	pub fn event(&self) -> &HomeEvent<'a> {
		&self.event
	}

	/// Vetoes the pending mutation.
	pub fn cancel(&mut self) {
		self.cancelled = true;
	}

	/// Whether any subscriber has vetoed so far.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled
	}
}

/// Synchronous publish seam consumed by the registry.
pub trait EventBus: Send + Sync {
	/// Delivers `notification` to every subscriber, then returns.
	fn publish(&self, notification: &mut HomeNotification<'_>);
}

type SubscriberFn = Box<dyn Fn(&mut HomeNotification<'_>) + Send + Sync>;

struct Subscriber {
	priority: i32,
	handler: SubscriberFn,
}

/// In-process [`EventBus`]: a priority-ordered list of subscriber closures.
///
/// Lower priority runs first; equal priorities keep registration order.
/// Publishing runs against a snapshot, so a subscriber may register further
/// subscribers without deadlocking (they join from the next publish on).
#[derive(Default)]
pub struct SubscriberBus {
	subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl SubscriberBus {
	/// An empty bus. Publishing through it never cancels anything.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` at priority 0.
	pub fn subscribe(
		&self,
		name: &'static str,
		handler: impl Fn(&mut HomeNotification<'_>) + Send + Sync + 'static,
	) {
		self.subscribe_with_priority(name, 0, handler);
	}

	/// Registers `handler` at an explicit priority (lower runs first).
	pub fn subscribe_with_priority(
		&self,
		name: &'static str,
		priority: i32,
		handler: impl Fn(&mut HomeNotification<'_>) + Send + Sync + 'static,
	) {
		let subscriber = Arc::new(Subscriber {
			priority,
			handler: Box::new(handler),
		});
		let mut subscribers = self.subscribers.write();
		let pos = subscribers.partition_point(|s| s.priority <= priority);
		subscribers.insert(pos, subscriber);
		tracing::debug!(name, priority, "events.subscribe");
	}

	/// Number of registered subscribers.
	pub fn len(&self) -> usize {
		self.subscribers.read().len()
	}

	/// Whether no subscriber is registered.
	pub fn is_empty(&self) -> bool {
		self.subscribers.read().is_empty()
	}
}

impl EventBus for SubscriberBus {
	fn publish(&self, notification: &mut HomeNotification<'_>) {
		let snapshot: Vec<Arc<Subscriber>> = self.subscribers.read().iter().cloned().collect();
		for subscriber in &snapshot {
			(subscriber.handler)(notification);
		}
		if notification.is_cancelled() {
			tracing::trace!(name = notification.event().name(), "events.cancelled");
		}
	}
}
