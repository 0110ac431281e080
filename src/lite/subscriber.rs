use std::{
	collections::HashMap,
	sync::{atomic, Arc},
};

use web_async::Lock;

use crate::{
	coding::{Reader, Stream},
	lite,
	signals::Effect,
	AnnouncedConsumer, AnnouncedProducer, BroadcastConsumer, BroadcastProducer, Error, Group, GroupProducer, Path,
	TrackProducer,
};

/// The subscriber half of a lite session: opens subscribe streams and ingests
/// groups.
#[derive(Clone)]
pub(super) struct Subscriber<S: web_transport_trait::Session> {
	session: S,
	effect: Arc<Effect>,
	subscribes: Lock<HashMap<u64, TrackProducer>>,
	next_id: Arc<atomic::AtomicU64>,
}

impl<S: web_transport_trait::Session> Subscriber<S> {
	pub fn new(session: S, effect: Arc<Effect>) -> Self {
		Self {
			session,
			effect,
			subscribes: Default::default(),
			next_id: Default::default(),
		}
	}

	/// Consume a broadcast; tracks are subscribed lazily as they're requested.
	pub fn consume(&self, path: Path) -> BroadcastConsumer {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		self.effect.spawn(self.clone().run_broadcast(path, producer));

		consumer
	}

	/// Subscribe to announcements under a prefix via a dedicated stream.
	pub fn announced(&self, prefix: Path) -> AnnouncedConsumer {
		let producer = AnnouncedProducer::new();
		let consumer = producer.consume(prefix.clone());
		let mut closed = consumer.closed();

		let session = self.session.clone();
		self.effect.spawn(async move {
			let run = Self::run_announced(session, prefix, producer);

			// Closing the stream when the endpoint is dropped is the
			// unsubscribe; there's no message for it.
			tokio::select! {
				res = run => if let Err(err) = res {
					tracing::debug!(%err, "announce stream error");
				},
				_ = closed.wait_for(|closed| *closed) => {}
			}
		});

		consumer
	}

	async fn run_announced(session: S, prefix: Path, producer: AnnouncedProducer) -> Result<(), Error> {
		let mut stream = Stream::open(&session).await?;

		stream.writer.encode(&lite::ControlType::Announce).await?;
		stream.writer.encode(&lite::AnnouncePlease { prefix: prefix.clone() }).await?;

		// The first message replays everything currently active.
		let init = stream.reader.decode::<lite::AnnounceInit>().await?;
		for suffix in init.suffixes {
			producer.announce(prefix.join(suffix.as_str()));
		}

		while let Some(announce) = stream.reader.decode_maybe::<lite::Announce>().await? {
			let path = prefix.join(announce.suffix().as_str());

			match announce {
				lite::Announce::Active { .. } => {
					if !producer.announce(path) {
						tracing::warn!(suffix = %announce.suffix(), "duplicate announce");
					}
				}
				lite::Announce::Ended { .. } => {
					if !producer.unannounce(&path) {
						tracing::warn!(suffix = %announce.suffix(), "unannounce for unknown path");
					}
				}
			}
		}

		Ok(())
	}

	/// Fail everything in flight; runs when the session tears down.
	pub fn abort_all(&self) {
		for (_, mut track) in self.subscribes.lock().drain() {
			track.abort(Error::Cancel);
		}
	}

	async fn run_broadcast(self, path: Path, mut broadcast: BroadcastProducer) {
		loop {
			let track = tokio::select! {
				_ = broadcast.unused() => break,
				track = broadcast.request() => match track {
					Some(track) => track,
					None => break,
				},
			};

			let id = self.next_id.fetch_add(1, atomic::Ordering::Relaxed);
			self.subscribes.lock().insert(id, track.clone());

			let this = self.clone();
			let path = path.clone();

			self.effect.spawn(async move {
				this.run_subscribe(id, path, track).await;
				this.subscribes.lock().remove(&id);
			});
		}
	}

	async fn run_subscribe(&self, id: u64, broadcast: Path, mut track: TrackProducer) {
		let msg = lite::Subscribe {
			id,
			broadcast: broadcast.clone(),
			track: track.info.name.clone(),
			priority: track.info.priority,
		};

		tracing::info!(%id, %broadcast, track = %track.info.name, "subscribe started");

		let res = tokio::select! {
			// The consumer lost interest; dropping the stream unsubscribes.
			_ = track.unused() => Err(Error::Cancel),
			res = Self::run_track(&self.session, msg) => res,
		};

		match res {
			Err(Error::Cancel) | Err(Error::Transport(_)) => {
				tracing::info!(%id, %broadcast, track = %track.info.name, "subscribe cancelled");
				track.abort(Error::Cancel);
			}
			Err(err) => {
				tracing::warn!(%id, %broadcast, track = %track.info.name, %err, "subscribe error");
				track.abort(err);
			}
			Ok(()) => {
				tracing::info!(%id, %broadcast, track = %track.info.name, "subscribe complete");
				track.close();
			}
		}
	}

	async fn run_track(session: &S, msg: lite::Subscribe) -> Result<(), Error> {
		let mut stream = Stream::open(session).await?;

		stream.writer.encode(&lite::ControlType::Subscribe).await?;
		stream.writer.encode(&msg).await?;

		// TODO surface the effective priority to the consumer.
		let _info: lite::SubscribeOk = stream.reader.decode().await?;

		// The subscription lives exactly as long as the stream.
		stream.reader.closed().await
	}

	/// Accept incoming group streams for the life of the session.
	pub async fn run(self) -> Result<(), Error> {
		loop {
			let stream = self
				.session
				.accept_uni()
				.await
				.map_err(|err| Error::Transport(Arc::new(err)))?;

			let stream = Reader::new(stream);
			let this = self.clone();

			self.effect.spawn(async move {
				if let Err(err) = this.run_uni_stream(stream).await {
					tracing::debug!(%err, "error running uni stream");
				}
			});
		}
	}

	async fn run_uni_stream(self, mut stream: Reader<S::RecvStream>) -> Result<(), Error> {
		let kind: lite::DataType = stream.decode().await?;

		let res = match kind {
			lite::DataType::Group => self.recv_group(&mut stream).await,
		};

		if let Err(err) = res {
			stream.abort(&err);
			return Err(err);
		}

		Ok(())
	}

	async fn recv_group(&self, stream: &mut Reader<S::RecvStream>) -> Result<(), Error> {
		let header: lite::Group = stream.decode().await?;

		let (mut producer, mut track) = {
			let mut subscribes = self.subscribes.lock();
			let track = subscribes.get_mut(&header.subscribe).ok_or(Error::NotFound)?;

			let group = Group::new(header.sequence);
			let producer = track.create_group(group).ok_or(Error::Old)?;
			(producer, track.consume())
		};

		let res = tokio::select! {
			_ = producer.unused() => Err(Error::Cancel),
			_ = track.closed() => Err(Error::Cancel),
			res = Self::run_group(stream, producer.clone()) => res,
		};

		match res {
			Err(Error::Cancel) | Err(Error::Transport(_)) => {
				tracing::trace!(group = %header.sequence, "group cancelled");
				producer.abort(Error::Cancel);
			}
			Err(err) => {
				tracing::debug!(%err, group = %header.sequence, "group error");
				producer.abort(err.clone());
				return Err(err);
			}
			Ok(()) => {
				tracing::trace!(group = %header.sequence, "group complete");
				producer.close();
			}
		}

		Ok(())
	}

	async fn run_group(stream: &mut Reader<S::RecvStream>, mut producer: GroupProducer) -> Result<(), Error> {
		// Frames until the FIN; a size prefix then the payload.
		while let Some(size) = stream.decode_maybe::<u64>().await? {
			let payload = stream.read_exact(size as usize).await?;

			tracing::trace!(size = %payload.len(), "read frame");
			producer.write_frame(payload);
		}

		producer.close();

		Ok(())
	}
}
