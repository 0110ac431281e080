use std::{collections::HashMap, sync::Arc};

use tokio::sync::oneshot;
use web_async::Lock;

use crate::{
	coding::Reader,
	ietf::{self, Control, FetchHeader, GroupHeader},
	signals::Effect,
	AnnouncedConsumer, AnnouncedProducer, BroadcastConsumer, BroadcastProducer, Error, Group, GroupProducer, Path,
	TrackProducer,
};

#[derive(Default)]
struct State {
	// Active incoming tracks, keyed by the request id carried in group headers.
	subscribes: HashMap<u64, TrackProducer>,

	// Pending Subscribe responses.
	subscribe_callbacks: HashMap<u64, oneshot::Sender<Result<(), Error>>>,

	// Pending TrackStatusRequest responses.
	status_callbacks: HashMap<u64, oneshot::Sender<ietf::TrackStatusCode>>,

	// Outstanding namespace subscriptions, for correlating responses.
	announce_prefixes: HashMap<u64, Path>,
}

/// The subscriber half of an ietf session: issues Subscribes and ingests groups.
#[derive(Clone)]
pub(super) struct Subscriber<S: web_transport_trait::Session> {
	session: S,
	control: Control,
	effect: Arc<Effect>,
	announced: AnnouncedProducer,
	state: Lock<State>,
}

impl<S: web_transport_trait::Session> Subscriber<S> {
	pub fn new(session: S, control: Control, effect: Arc<Effect>) -> Self {
		Self {
			session,
			control,
			effect,
			announced: AnnouncedProducer::new(),
			state: Default::default(),
		}
	}

	/// Subscribe to namespace announcements under a prefix.
	///
	/// The endpoint replays currently active paths, then delivers updates.
	/// Dropping it sends UnsubscribeNamespace without waiting for the peer.
	pub fn announced(&self, prefix: Path) -> Result<AnnouncedConsumer, Error> {
		let consumer = self.announced.consume(prefix.clone());
		let request_id = self.control.request_id();

		self.state.lock().announce_prefixes.insert(request_id, prefix.clone());
		self.control.send(ietf::SubscribeNamespace {
			namespace: prefix,
			request_id,
		})?;

		let control = self.control.clone();
		let state = self.state.clone();
		let mut closed = consumer.closed();

		self.effect.spawn(async move {
			closed.wait_for(|closed| *closed).await;

			if state.lock().announce_prefixes.remove(&request_id).is_some() {
				control.send(ietf::UnsubscribeNamespace { request_id }).ok();
			}
		});

		Ok(consumer)
	}

	/// Consume a broadcast; tracks are subscribed lazily as they're requested.
	pub fn consume(&self, path: Path) -> BroadcastConsumer {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		self.effect.spawn(self.clone().run_broadcast(path, producer));

		consumer
	}

	/// Query the status of a track on the peer.
	pub async fn track_status(&self, broadcast: Path, track: String) -> Result<ietf::TrackStatusCode, Error> {
		let request_id = self.control.request_id();
		let (tx, rx) = oneshot::channel();
		self.state.lock().status_callbacks.insert(request_id, tx);

		self.control.send(ietf::TrackStatusRequest {
			request_id,
			track_namespace: broadcast,
			track_name: track.into(),
		})?;

		rx.await.map_err(|_| Error::Cancel)
	}

	async fn run_broadcast(self, path: Path, mut broadcast: BroadcastProducer) {
		loop {
			// Keep serving requests until there are no more consumers.
			let track = tokio::select! {
				_ = broadcast.unused() => break,
				track = broadcast.request() => match track {
					Some(track) => track,
					None => break,
				},
			};

			let request_id = self.control.request_id();
			self.state.lock().subscribes.insert(request_id, track.clone());

			let this = self.clone();
			let path = path.clone();

			self.effect.spawn(async move {
				this.run_subscribe(request_id, path, track).await;
			});
		}
	}

	async fn run_subscribe(&self, request_id: u64, broadcast: Path, mut track: TrackProducer) {
		let (tx, rx) = oneshot::channel();
		self.state.lock().subscribe_callbacks.insert(request_id, tx);

		tracing::info!(id = %request_id, %broadcast, track = %track.info.name, "subscribe started");

		let res = self.control.send(ietf::Subscribe {
			request_id,
			track_namespace: broadcast.clone(),
			track_name: (&track.info.name).into(),
			subscriber_priority: track.info.priority,
		});

		if res.is_err() {
			self.remove_subscribe(request_id);
			track.abort(Error::Cancel);
			return;
		}

		match rx.await {
			Ok(Ok(())) => {
				// Subscribed; stay alive until the consumer loses interest.
				track.unused().await;

				tracing::info!(id = %request_id, %broadcast, track = %track.info.name, "subscribe cancelled");

				// Don't unsubscribe if the peer already ended the subscription.
				if self.remove_subscribe(request_id) {
					self.control.send(ietf::Unsubscribe { request_id }).ok();
				}

				track.abort(Error::Cancel);
			}
			Ok(Err(err)) => {
				tracing::warn!(id = %request_id, %broadcast, track = %track.info.name, %err, "subscribe error");
				self.remove_subscribe(request_id);
				track.abort(err);
			}
			Err(_) => {
				// The session is going away.
				self.remove_subscribe(request_id);
				track.abort(Error::Cancel);
			}
		}
	}

	fn remove_subscribe(&self, request_id: u64) -> bool {
		let mut state = self.state.lock();
		state.subscribe_callbacks.remove(&request_id);
		state.subscribes.remove(&request_id).is_some()
	}

	/// Fail everything in flight; runs when the session tears down.
	pub fn abort_all(&self) {
		let mut state = self.state.lock();

		for (_, mut track) in state.subscribes.drain() {
			track.abort(Error::Cancel);
		}

		state.subscribe_callbacks.clear();
		state.status_callbacks.clear();
		state.announce_prefixes.clear();
		drop(state);

		self.announced.close();
	}

	pub fn recv_subscribe_ok(&mut self, msg: ietf::SubscribeOk) -> Result<(), Error> {
		match self.state.lock().subscribe_callbacks.remove(&msg.request_id) {
			Some(tx) => {
				tx.send(Ok(())).ok();
			}
			None => tracing::warn!(id = %msg.request_id, "subscribe ok for unknown request"),
		}

		Ok(())
	}

	pub fn recv_subscribe_error(&mut self, msg: ietf::SubscribeError<'_>) -> Result<(), Error> {
		let err = Error::Peer {
			code: msg.error_code,
			reason: msg.reason_phrase.to_string(),
		};

		let (callback, track) = {
			let mut state = self.state.lock();
			(
				state.subscribe_callbacks.remove(&msg.request_id),
				state.subscribes.remove(&msg.request_id),
			)
		};

		match (callback, track) {
			(Some(tx), _) => {
				// run_subscribe owns the track and will fail it.
				tx.send(Err(err)).ok();
			}
			(None, Some(mut track)) => track.abort(err),
			(None, None) => tracing::warn!(id = %msg.request_id, "subscribe error for unknown request"),
		}

		Ok(())
	}

	pub fn recv_publish_done(&mut self, msg: ietf::PublishDone<'_>) -> Result<(), Error> {
		let (callback, track) = {
			let mut state = self.state.lock();
			(
				state.subscribe_callbacks.remove(&msg.request_id),
				state.subscribes.remove(&msg.request_id),
			)
		};

		let err = match msg.status_code {
			200 => None,
			code => Some(Error::Peer {
				code,
				reason: msg.reason_phrase.to_string(),
			}),
		};

		match (callback, track) {
			(Some(tx), _) => {
				// Done before Ok means the subscription never got going.
				tx.send(Err(err.unwrap_or(Error::Cancel))).ok();
			}
			(None, Some(mut track)) => match err {
				Some(err) => track.abort(err),
				None => track.close(),
			},
			(None, None) => tracing::warn!(id = %msg.request_id, "publish done for unknown request"),
		}

		Ok(())
	}

	pub fn recv_publish_namespace(&mut self, msg: ietf::PublishNamespace) -> Result<(), Error> {
		tracing::debug!(broadcast = %msg.track_namespace, "announced");

		if !self.announced.announce(msg.track_namespace.clone()) {
			tracing::warn!(broadcast = %msg.track_namespace, "duplicate announce");
			return Ok(());
		}

		self.control.send(ietf::PublishNamespaceOk {
			request_id: msg.request_id,
		})
	}

	pub fn recv_publish_namespace_done(&mut self, msg: ietf::PublishNamespaceDone) -> Result<(), Error> {
		tracing::debug!(broadcast = %msg.track_namespace, "unannounced");

		if !self.announced.unannounce(&msg.track_namespace) {
			tracing::warn!(broadcast = %msg.track_namespace, "unannounce for unknown path");
		}

		Ok(())
	}

	pub fn recv_subscribe_namespace_ok(&mut self, msg: ietf::SubscribeNamespaceOk) -> Result<(), Error> {
		tracing::debug!(id = %msg.request_id, "namespace subscription accepted");
		Ok(())
	}

	pub fn recv_subscribe_namespace_error(&mut self, msg: ietf::SubscribeNamespaceError<'_>) -> Result<(), Error> {
		tracing::warn!(id = %msg.request_id, code = %msg.error_code, reason = %msg.reason_phrase, "namespace subscription rejected");

		// End the matching endpoint so the application notices.
		if let Some(prefix) = self.state.lock().announce_prefixes.remove(&msg.request_id) {
			self.announced.revoke(&prefix);
		}

		Ok(())
	}

	pub fn recv_track_status(&mut self, msg: ietf::TrackStatus) -> Result<(), Error> {
		match self.state.lock().status_callbacks.remove(&msg.request_id) {
			Some(tx) => {
				tx.send(msg.status).ok();
			}
			None => tracing::warn!(id = %msg.request_id, "track status for unknown request"),
		}

		Ok(())
	}

	/// Accept incoming unidirectional streams for the life of the session.
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

	async fn run_uni_stream(mut self, mut stream: Reader<S::RecvStream>) -> Result<(), Error> {
		let kind: u64 = stream.decode_peek().await?;

		let res = match kind {
			FetchHeader::TYPE => Err(Error::Unsupported),
			0x10..=0x1f => self.recv_group(&mut stream).await,
			_ => Err(Error::UnexpectedStream),
		};

		if let Err(err) = res {
			stream.abort(&err);
			return Err(err);
		}

		Ok(())
	}

	async fn recv_group(&mut self, stream: &mut Reader<S::RecvStream>) -> Result<(), Error> {
		let header: GroupHeader = stream.decode().await?;

		let (mut producer, mut track) = {
			let mut state = self.state.lock();
			let track = state.subscribes.get_mut(&header.request_id).ok_or(Error::NotFound)?;

			let group = Group::new(header.group_id);
			let producer = track.create_group(group).ok_or(Error::Old)?;
			(producer, track.consume())
		};

		let res = tokio::select! {
			// The consumer lost interest in the group or the whole track.
			_ = producer.unused() => Err(Error::Cancel),
			_ = track.closed() => Err(Error::Cancel),
			res = Self::run_group(&header, stream, producer.clone()) => res,
		};

		match res {
			Err(Error::Cancel) | Err(Error::Transport(_)) => {
				tracing::trace!(group = %header.group_id, "group cancelled");
				producer.abort(Error::Cancel);
			}
			Err(err) => {
				tracing::debug!(%err, group = %header.group_id, "group error");
				producer.abort(err.clone());
				return Err(err);
			}
			Ok(()) => {
				tracing::trace!(group = %header.group_id, "group complete");
				producer.close();
			}
		}

		Ok(())
	}

	async fn run_group(
		header: &GroupHeader,
		stream: &mut Reader<S::RecvStream>,
		mut producer: GroupProducer,
	) -> Result<(), Error> {
		while let Some(id_delta) = stream.decode_maybe::<u64>().await? {
			if id_delta != 0 {
				return Err(Error::Unsupported);
			}

			if header.has_extensions {
				let size: u64 = stream.decode().await?;
				if size != 0 {
					return Err(Error::Unsupported);
				}
			}

			let size: u64 = stream.decode().await?;
			if size > 0 {
				let payload = stream.read_exact(size as usize).await?;
				producer.write_frame(payload);
				continue;
			}

			// Zero length means a status follows.
			let status: u64 = stream.decode().await?;
			match (status, header.has_end) {
				(ietf::OBJECT_STATUS_NORMAL, true) => producer.write_frame(bytes::Bytes::new()),

				// The explicit end marker; some servers send status 0 instead
				// of GROUP_END, so accept both.
				(ietf::OBJECT_STATUS_NORMAL, false) | (ietf::OBJECT_STATUS_GROUP_END, false) => break,

				_ => return Err(Error::Unsupported),
			}
		}

		producer.close();

		Ok(())
	}
}
