use crate::signals::{Getter, Signal};
use crate::{Error, Group, GroupConsumer, GroupProducer};

/// Static information about a track: its name and delivery priority.
///
/// The priority is a hint transmitted to the peer; scheduling based on it is
/// best-effort on both sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
	pub name: String,
	pub priority: u8,
}

impl Track {
	pub fn new<T: Into<String>>(name: T) -> Self {
		Self {
			name: name.into(),
			priority: 0,
		}
	}

	pub fn produce(self) -> TrackProducer {
		TrackProducer::new(self)
	}
}


#[derive(Clone, Default)]
struct TrackState {
	// The newest group; older undelivered groups are skipped, matching the
	// protocol's descending group order.
	latest: Option<GroupConsumer>,
	epoch: u64,
	closed: Option<Result<(), Error>>,
}

/// Write groups into a track.
///
/// Dropping every producer clone without closing aborts the track, failing
/// consumers with [Error::Cancel].
#[derive(Clone)]
pub struct TrackProducer {
	pub info: Track,
	state: Signal<TrackState>,
}

impl TrackProducer {
	pub fn new(info: Track) -> Self {
		Self {
			info,
			state: Signal::default(),
		}
	}

	/// Create the next group in sequence.
	pub fn append_group(&mut self) -> GroupProducer {
		let sequence = self
			.state
			.peek()
			.latest
			.as_ref()
			.map(|group| group.info.sequence + 1)
			.unwrap_or_default();

		let info = Group::new(sequence);

		// A detached producer on a closed track; writes just go nowhere.
		self.create_group(info.clone()).unwrap_or_else(|| info.produce())
	}

	/// Create a group at an explicit sequence, returning None if it arrived
	/// too late to be served.
	pub fn create_group(&mut self, info: Group) -> Option<GroupProducer> {
		let sequence = info.sequence;
		let producer = info.produce();
		let consumer = producer.consume();

		let inserted = self.state.modify(|state| {
			if state.closed.is_some() {
				return false;
			}

			if let Some(latest) = &state.latest {
				if sequence < latest.info.sequence {
					return false;
				}
			}

			state.latest = Some(consumer);
			state.epoch += 1;
			true
		});

		inserted.then_some(producer)
	}

	/// End the track cleanly.
	pub fn close(&mut self) {
		self.state.modify(|state| {
			state.closed.get_or_insert(Ok(()));
		});
	}

	/// End the track with an error, cascading to unread groups.
	pub fn abort(&mut self, err: Error) {
		self.state.modify(|state| {
			state.closed.get_or_insert(Err(err));
		});
	}

	pub fn consume(&self) -> TrackConsumer {
		TrackConsumer {
			info: self.info.clone(),
			state: self.state.getter(),
			seen: 0,
		}
	}

	/// Wait until there are no more consumers.
	pub fn unused(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
		self.state.unused()
	}
}

/// Read groups out of a track, newest first.
#[derive(Clone)]
pub struct TrackConsumer {
	pub info: Track,
	state: Getter<TrackState>,
	seen: u64,
}

impl TrackConsumer {
	/// The next (newest) unseen group, None at a clean end of track.
	pub async fn next_group(&mut self) -> Result<Option<GroupConsumer>, Error> {
		let seen = self.seen;
		let state = self
			.state
			.wait_for(|state| state.epoch > seen || state.closed.is_some())
			.await
			.ok_or(Error::Cancel)?;

		if state.epoch > self.seen {
			self.seen = state.epoch;
			return Ok(Some(state.latest.clone().expect("epoch advanced without a group")));
		}

		match state.closed {
			Some(Ok(())) => Ok(None),
			Some(Err(err)) => Err(err),
			None => unreachable!(),
		}
	}

	/// Wait until the track is closed, ignoring any groups.
	pub async fn closed(&mut self) -> Result<(), Error> {
		let state = self.state.wait_for(|state| state.closed.is_some()).await;

		match state.and_then(|state| state.closed) {
			Some(Ok(())) | None => Ok(()),
			Some(Err(err)) => Err(err),
		}
	}
}
