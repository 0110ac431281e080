use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

use web_async::Lock;

use crate::signals::{Getter, Signal};
use crate::{Error, Track, TrackConsumer, TrackProducer};

struct State {
	// When explicitly publishing, we hold a reference to the consumer.
	// This prevents the track from being marked as "unused".
	published: HashMap<String, TrackConsumer>,

	// When requesting, we hold a reference to the producer for dynamic tracks.
	// The track will be marked as "unused" when the last consumer is dropped.
	requested: HashMap<String, TrackProducer>,
}

/// The producer half of a broadcast: a set of tracks, served on demand.
///
/// Tracks can be published upfront with [Self::create]/[Self::insert], or
/// lazily by answering [Self::request].
pub struct BroadcastProducer {
	state: Lock<State>,
	closed: Signal<bool>,
	requested: (
		async_channel::Sender<TrackProducer>,
		async_channel::Receiver<TrackProducer>,
	),
	cloned: Arc<AtomicUsize>,
}

impl Default for BroadcastProducer {
	fn default() -> Self {
		Self::new()
	}
}

impl BroadcastProducer {
	pub fn new() -> Self {
		Self {
			state: Lock::new(State {
				published: HashMap::new(),
				requested: HashMap::new(),
			}),
			closed: Signal::new(false),
			requested: async_channel::unbounded(),
			cloned: Default::default(),
		}
	}

	/// Return the next track a consumer asked for but we haven't published.
	pub async fn request(&mut self) -> Option<TrackProducer> {
		self.requested.1.recv().await.ok()
	}

	/// Produce a new track and insert it into the broadcast.
	pub fn create(&mut self, track: Track) -> TrackProducer {
		let producer = track.produce();
		self.insert(producer.consume());
		producer
	}

	/// Insert a track into the lookup, returning true if it was unique.
	pub fn insert(&mut self, track: TrackConsumer) -> bool {
		let mut state = self.state.lock();
		let unique = state.published.insert(track.info.name.clone(), track.clone()).is_none();
		let removed = state.requested.remove(&track.info.name).is_some();

		unique && !removed
	}

	/// Remove a track from the lookup.
	pub fn remove(&mut self, name: &str) -> bool {
		let mut state = self.state.lock();
		state.published.remove(name).is_some() || state.requested.remove(name).is_some()
	}

	pub fn consume(&self) -> BroadcastConsumer {
		BroadcastConsumer {
			state: self.state.clone(),
			closed: self.closed.getter(),
			requested: self.requested.0.clone(),
		}
	}

	/// Close the broadcast, cascading to consumers awaiting [BroadcastConsumer::closed].
	pub fn close(&mut self) {
		self.closed.set(true);
	}

	/// Block until there are no more consumers.
	///
	/// A new consumer can be created by calling [Self::consume] and this will block again.
	pub fn unused(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
		self.closed.unused()
	}
}

impl Clone for BroadcastProducer {
	fn clone(&self) -> Self {
		self.cloned.fetch_add(1, Ordering::Relaxed);
		Self {
			state: self.state.clone(),
			closed: self.closed.clone(),
			requested: self.requested.clone(),
			cloned: self.cloned.clone(),
		}
	}
}

impl Drop for BroadcastProducer {
	fn drop(&mut self) {
		if self.cloned.fetch_sub(1, Ordering::Relaxed) > 0 {
			return;
		}

		// Cleanup any lingering state when the last producer is dropped.

		// Close the sender so consumers can't send any more requests.
		self.requested.0.close();

		// Drain any remaining requests.
		while let Ok(mut producer) = self.requested.1.try_recv() {
			producer.abort(Error::Cancel);
		}

		let mut state = self.state.lock();
		state.published.clear();
		state.requested.clear();
	}
}

/// The consumer half of a broadcast: subscribe to tracks by name.
#[derive(Clone)]
pub struct BroadcastConsumer {
	state: Lock<State>,
	closed: Getter<bool>,
	requested: async_channel::Sender<TrackProducer>,
}

impl BroadcastConsumer {
	/// Subscribe to a track, requesting it from the producer if needed.
	///
	/// Concurrent subscriptions to the same track share a producer.
	pub fn subscribe(&self, track: &Track) -> TrackConsumer {
		let mut state = self.state.lock();

		// Return any explicitly published track.
		if let Some(consumer) = state.published.get(&track.name).cloned() {
			return consumer;
		}

		// Return any track another consumer already requested.
		if let Some(producer) = state.requested.get(&track.name) {
			return producer.consume();
		}

		// Otherwise we have never seen this track before and need to create a new producer.
		let mut producer = track.clone().produce();
		let consumer = producer.consume();

		match self.requested.try_send(producer.clone()) {
			Ok(()) => {}
			Err(_) => {
				// The producer is gone; close the track instead of returning None.
				producer.abort(Error::Cancel);
				return consumer;
			}
		}

		// Insert the producer into the lookup so we deduplicate requests.
		state.requested.insert(producer.info.name.clone(), producer.clone());

		// Remove the track from the lookup when it's unused.
		let state = self.state.clone();
		web_async::spawn(async move {
			producer.unused().await;
			state.lock().requested.remove(&producer.info.name);
		});

		consumer
	}

	/// Wait until the producer closes (or drops) the broadcast.
	pub async fn closed(&self) {
		let mut closed = self.closed.clone();
		closed.wait_for(|closed| *closed).await;
	}
}
