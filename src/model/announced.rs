use std::collections::HashSet;

use tokio::sync::mpsc;
use web_async::Lock;

use crate::signals::{Getter, Signal};
use crate::Path;

/// A single announcement event: a path became active or went away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
	pub path: Path,
	pub active: bool,
}

struct ConsumerState {
	prefix: Path,
	updates: mpsc::UnboundedSender<Announcement>,
}

#[derive(Default)]
struct State {
	active: HashSet<Path>,
	consumers: Vec<ConsumerState>,
}

/// The announcement registry: a duplicate-free set of active paths with
/// prefix-filtered consumers.
///
/// Consumers receive a replay of the current set followed by live updates;
/// an `active=false` is never delivered before its matching `active=true`.
#[derive(Clone, Default)]
pub struct AnnouncedProducer {
	state: Lock<State>,
}

impl AnnouncedProducer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mark a path as active, fanning out to matching consumers.
	///
	/// A duplicate announcement is dropped, returning false.
	pub fn announce(&self, path: Path) -> bool {
		let mut state = self.state.lock();
		if !state.active.insert(path.clone()) {
			return false;
		}

		Self::fanout(
			&mut state.consumers,
			&Announcement {
				path,
				active: true,
			},
		);
		true
	}

	/// Mark a path as inactive, fanning out to matching consumers.
	///
	/// An unknown path is dropped, returning false.
	pub fn unannounce(&self, path: &Path) -> bool {
		let mut state = self.state.lock();
		if !state.active.remove(path) {
			return false;
		}

		Self::fanout(
			&mut state.consumers,
			&Announcement {
				path: path.clone(),
				active: false,
			},
		);
		true
	}

	pub fn is_active(&self, path: &Path) -> bool {
		self.state.lock().active.contains(path)
	}

	/// End every consumer stream registered with exactly this prefix.
	pub fn revoke(&self, prefix: &Path) {
		self.state.lock().consumers.retain(|consumer| &consumer.prefix != prefix);
	}

	/// End every consumer stream.
	pub fn close(&self) {
		self.state.lock().consumers.clear();
	}

	/// Subscribe to announcements under a prefix, replaying the active set.
	pub fn consume(&self, prefix: Path) -> AnnouncedConsumer {
		let (tx, rx) = mpsc::unbounded_channel();

		let mut state = self.state.lock();
		for path in state.active.iter() {
			if path.has_prefix(&prefix) {
				tx.send(Announcement {
					path: path.clone(),
					active: true,
				})
				.ok();
			}
		}

		state.consumers.push(ConsumerState {
			prefix: prefix.clone(),
			updates: tx,
		});

		AnnouncedConsumer {
			prefix,
			updates: rx,
			closed: Signal::new(false),
		}
	}

	fn fanout(consumers: &mut Vec<ConsumerState>, event: &Announcement) {
		// Prune consumers that have gone away while we're here.
		consumers.retain(|consumer| {
			if !event.path.has_prefix(&consumer.prefix) {
				return !consumer.updates.is_closed();
			}

			consumer.updates.send(event.clone()).is_ok()
		});
	}
}

/// A prefix-scoped stream of announcement events.
pub struct AnnouncedConsumer {
	prefix: Path,
	updates: mpsc::UnboundedReceiver<Announcement>,
	closed: Signal<bool>,
}

impl AnnouncedConsumer {
	/// The next announcement, None once the producer is gone.
	pub async fn next(&mut self) -> Option<Announcement> {
		self.updates.recv().await
	}

	/// The next announcement, without waiting for one to arrive.
	pub fn try_next(&mut self) -> Option<Announcement> {
		self.updates.try_recv().ok()
	}

	pub fn prefix(&self) -> &Path {
		&self.prefix
	}

	// Resolves once this consumer is dropped; the session uses it to send
	// the unsubscribe without polling.
	pub(crate) fn closed(&self) -> Getter<bool> {
		self.closed.getter()
	}
}

impl Drop for AnnouncedConsumer {
	fn drop(&mut self) {
		self.closed.set(true);
	}
}
