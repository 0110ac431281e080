use bytes::Bytes;

use crate::signals::{Getter, Signal};
use crate::Error;

/// Static information about a group: its position within the track.
///
/// Groups are delivered newest-first at the protocol level; the sequence
/// number is how consumers tell where a group belongs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
	pub sequence: u64,
}

impl Group {
	pub fn new(sequence: u64) -> Self {
		Self { sequence }
	}

	pub fn produce(self) -> GroupProducer {
		GroupProducer::new(self)
	}
}

#[derive(Clone, Default)]
struct GroupState {
	// Frames are whole payloads; an empty payload is a valid frame.
	frames: Vec<Bytes>,
	closed: Option<Result<(), Error>>,
}

/// Write frames into a group.
///
/// Dropping every producer clone without closing aborts the group, failing
/// consumers with [Error::Cancel].
#[derive(Clone)]
pub struct GroupProducer {
	pub info: Group,
	state: Signal<GroupState>,
}

impl GroupProducer {
	pub fn new(info: Group) -> Self {
		Self {
			info,
			state: Signal::default(),
		}
	}

	/// Append a frame to the group.
	pub fn write_frame<B: Into<Bytes>>(&mut self, payload: B) {
		let payload = payload.into();
		self.state.modify(|state| {
			if state.closed.is_none() {
				state.frames.push(payload);
			}
		});
	}

	/// End the group cleanly; consumers see the remaining frames then None.
	pub fn close(&mut self) {
		self.state.modify(|state| {
			state.closed.get_or_insert(Ok(()));
		});
	}

	/// End the group with an error.
	pub fn abort(&mut self, err: Error) {
		self.state.modify(|state| {
			state.closed.get_or_insert(Err(err));
		});
	}

	pub fn consume(&self) -> GroupConsumer {
		GroupConsumer {
			info: self.info.clone(),
			state: self.state.getter(),
			index: 0,
		}
	}

	/// Wait until there are no more consumers.
	pub fn unused(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
		self.state.unused()
	}
}

/// Read frames out of a group, in order.
///
/// Each clone keeps its own cursor.
#[derive(Clone)]
pub struct GroupConsumer {
	pub info: Group,
	state: Getter<GroupState>,
	index: usize,
}

impl GroupConsumer {
	/// The next frame, None at a clean end of group.
	pub async fn read_frame(&mut self) -> Result<Option<Bytes>, Error> {
		let index = self.index;
		let state = self
			.state
			.wait_for(|state| state.frames.len() > index || state.closed.is_some())
			.await
			.ok_or(Error::Cancel)?;

		if let Some(frame) = state.frames.get(self.index) {
			self.index += 1;
			return Ok(Some(frame.clone()));
		}

		match state.closed {
			Some(Ok(())) => Ok(None),
			Some(Err(err)) => Err(err),
			None => unreachable!(),
		}
	}
}
