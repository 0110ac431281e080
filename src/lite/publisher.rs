use std::{collections::HashMap, sync::Arc};

use web_async::Lock;

use crate::{
	coding::{Stream, Writer},
	lite,
	signals::Effect,
	AnnouncedProducer, BroadcastConsumer, Error, GroupConsumer, Path, Track, TrackConsumer,
};

/// The publisher half of a lite session: answers announce and subscribe
/// streams from locally published broadcasts.
#[derive(Clone)]
pub(super) struct Publisher<S: web_transport_trait::Session> {
	session: S,
	effect: Arc<Effect>,
	broadcasts: Lock<HashMap<Path, BroadcastConsumer>>,
	announced: AnnouncedProducer,
}

impl<S: web_transport_trait::Session> Publisher<S> {
	pub fn new(session: S, effect: Arc<Effect>) -> Self {
		Self {
			session,
			effect,
			broadcasts: Default::default(),
			announced: AnnouncedProducer::new(),
		}
	}

	/// Make a broadcast available under the given path until it closes.
	pub fn publish(&self, path: Path, broadcast: BroadcastConsumer) -> Result<(), Error> {
		{
			let mut broadcasts = self.broadcasts.lock();
			if broadcasts.contains_key(&path) {
				return Err(Error::Duplicate);
			}

			broadcasts.insert(path.clone(), broadcast.clone());
		}

		tracing::debug!(broadcast = %path, "announce");
		self.announced.announce(path.clone());

		let this = self.clone();
		self.effect.spawn(async move {
			broadcast.closed().await;

			tracing::debug!(broadcast = %path, "unannounce");
			this.broadcasts.lock().remove(&path);
			this.announced.unannounce(&path);
		});

		Ok(())
	}

	/// Accept incoming control streams for the life of the session.
	pub async fn run(self) -> Result<(), Error> {
		loop {
			let mut stream = Stream::accept(&self.session).await?;

			// The first varint selects the stream's purpose.
			let kind = stream.reader.decode().await?;

			match kind {
				lite::ControlType::Announce => self.recv_announce(stream),
				lite::ControlType::Subscribe => self.recv_subscribe(stream),
				lite::ControlType::Session | lite::ControlType::ClientCompat | lite::ControlType::ServerCompat => {
					return Err(Error::UnexpectedStream)
				}
			}
		}
	}

	fn recv_announce(&self, mut stream: Stream<S>) {
		let announced = self.announced.clone();

		self.effect.spawn(async move {
			if let Err(err) = Self::run_announce(&mut stream, announced).await {
				tracing::debug!(%err, "announce stream error");
				stream.writer.abort(&err);
			}
		});
	}

	async fn run_announce(stream: &mut Stream<S>, announced: AnnouncedProducer) -> Result<(), Error> {
		let interest = stream.reader.decode::<lite::AnnouncePlease>().await?;
		let prefix = interest.prefix;

		tracing::debug!(%prefix, "announce requested");

		let mut consumer = announced.consume(prefix.clone());

		// Collect everything already active into the init message.
		let mut init = Vec::new();
		while let Some(event) = consumer.try_next() {
			let suffix = event.path.strip_prefix(&prefix).expect("consumer returned invalid path");

			if event.active {
				init.push(suffix);
			} else {
				init.retain(|path| path != &suffix);
			}
		}

		stream.writer.encode(&lite::AnnounceInit { suffixes: init }).await?;

		// Then stream updates until one side goes away.
		loop {
			tokio::select! {
				biased;
				res = stream.reader.closed() => return res,
				event = consumer.next() => {
					let event = match event {
						Some(event) => event,
						None => return stream.writer.finish().await,
					};

					let suffix = event.path.strip_prefix(&prefix).expect("consumer returned invalid path");
					let msg = match event.active {
						true => lite::Announce::Active { suffix },
						false => lite::Announce::Ended { suffix },
					};

					stream.writer.encode(&msg).await?;
				}
			}
		}
	}

	fn recv_subscribe(&self, mut stream: Stream<S>) {
		let this = self.clone();

		self.effect.spawn(async move {
			if let Err(err) = this.run_subscribe(&mut stream).await {
				tracing::debug!(%err, "subscribe stream error");
				stream.writer.abort(&err);
			}
		});
	}

	async fn run_subscribe(&self, stream: &mut Stream<S>) -> Result<(), Error> {
		let subscribe = stream.reader.decode::<lite::Subscribe>().await?;

		tracing::info!(id = %subscribe.id, broadcast = %subscribe.broadcast, track = %subscribe.track, "subscribe started");

		let broadcast = self
			.broadcasts
			.lock()
			.get(&subscribe.broadcast)
			.cloned()
			.ok_or(Error::NotFound)?;

		let track = Track {
			name: subscribe.track.clone(),
			priority: subscribe.priority,
		};
		let track = broadcast.subscribe(&track);

		stream
			.writer
			.encode(&lite::SubscribeOk {
				priority: track.info.priority,
			})
			.await?;

		let res = tokio::select! {
			res = self.run_track(subscribe.id, track) => res,
			// The peer closing the stream is the unsubscribe.
			res = stream.reader.closed() => res,
		};

		res?;
		stream.writer.finish().await
	}

	async fn run_track(&self, subscribe: u64, mut track: TrackConsumer) -> Result<(), Error> {
		loop {
			let group = match track.next_group().await? {
				Some(group) => group,
				None => return Ok(()),
			};

			tracing::debug!(%subscribe, track = %track.info.name, sequence = %group.info.sequence, "serving group");

			let header = lite::Group {
				subscribe,
				sequence: group.info.sequence,
			};

			let session = self.session.clone();
			let priority = stream_priority(track.info.priority, group.info.sequence);

			self.effect.spawn(async move {
				let sequence = header.sequence;
				if let Err(err) = Self::serve_group(session, header, priority, group).await {
					tracing::debug!(%subscribe, %sequence, %err, "group error");
				}
			});
		}
	}

	async fn serve_group(session: S, header: lite::Group, priority: i32, mut group: GroupConsumer) -> Result<(), Error> {
		let stream = session
			.open_uni()
			.await
			.map_err(|err| Error::Transport(Arc::new(err)))?;

		let mut stream = Writer::new(stream);
		stream.set_priority(priority);

		stream.encode(&lite::DataType::Group).await?;
		stream.encode(&header).await?;

		loop {
			let frame = tokio::select! {
				biased;
				_ = stream.closed() => return Err(Error::Cancel),
				frame = group.read_frame() => frame,
			};

			let frame = match frame {
				Ok(Some(frame)) => frame,
				Ok(None) => break,
				Err(err) => {
					stream.abort(&err);
					return Err(err);
				}
			};

			tracing::trace!(size = %frame.len(), "writing frame");

			stream.encode(&(frame.len() as u64)).await?;
			stream.write_all(&mut std::io::Cursor::new(frame)).await?;
		}

		stream.finish().await?;

		tracing::debug!(sequence = %header.sequence, "finished group");

		Ok(())
	}
}

// Same scheme as the ietf publisher: track priority in the top bits, inverted
// group sequence below.
fn stream_priority(track_priority: u8, group_sequence: u64) -> i32 {
	let sequence = 0xFFFFFF - (group_sequence as u32 & 0xFFFFFF);
	((track_priority as i32) << 24) | sequence as i32
}
