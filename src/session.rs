use std::sync::Arc;

use crate::{
	coding::{self, DecodeError, Stream},
	ietf, lite,
	signals::Effect,
	AnnouncedConsumer, BroadcastConsumer, Error, Path,
};

/// The versions of MoQ that are supported by this implementation.
pub const SUPPORTED: [coding::Version; 2] = [coding::Version::DRAFT_14, coding::Version::LITE_V1];

/// A MoQ session riding a WebTransport/QUIC connection.
///
/// Created with [Session::connect], which negotiates the wire variant. The
/// same surface serves both variants: publish broadcasts, consume them, and
/// watch namespace announcements.
pub struct Session<S: web_transport_trait::Session> {
	session: S,
	effect: Arc<Effect>,
	engine: Engine<S>,
}

enum Engine<S: web_transport_trait::Session> {
	Ietf(ietf::Session<S>),
	Lite(lite::Session<S>),
}

impl<S: web_transport_trait::Session> Session<S> {
	/// Perform the MoQ handshake as a client.
	///
	/// The connection remains active until [Session::close] or the transport
	/// goes away.
	pub async fn connect(session: S) -> Result<Self, Error> {
		let mut stream = Stream::open(&session).await?;

		let client = ietf::ClientSetup {
			versions: SUPPORTED.into(),
			parameters: Default::default(),
		};

		// CLIENT_SETUP doubles as the lite compat marker, so this one
		// handshake can land on either variant.
		let mut buf = std::io::Cursor::new(ietf::frame(&client)?);
		stream.writer.write_all(&mut buf).await?;

		let server = Self::read_server_setup(&mut stream).await?;
		if !SUPPORTED.contains(&server.version) {
			return Err(Error::Version(client.versions, [server.version].into()));
		}

		tracing::debug!(version = ?server.version, "connected");

		// The root scope: every engine task lives under it, and closing it
		// shuts the transport down.
		let effect = Arc::new(Effect::new());
		{
			let session = session.clone();
			effect.cleanup(move || session.close(0, ""));
		}

		let engine = match server.version {
			coding::Version::DRAFT_14 => Engine::Ietf(ietf::Session::start(session.clone(), stream, effect.clone())?),
			coding::Version::LITE_V1 => Engine::Lite(lite::Session::start(session.clone(), stream, effect.clone())),
			_ => unreachable!(),
		};

		Ok(Self {
			session,
			effect,
			engine,
		})
	}

	async fn read_server_setup(stream: &mut Stream<S>) -> Result<ietf::ServerSetup, Error> {
		use ietf::Message;

		let id: u64 = stream.reader.decode().await?;
		if id != ietf::ServerSetup::ID {
			return Err(Error::UnexpectedMessage);
		}

		let size: u16 = stream.reader.decode().await?;
		let mut data = stream.reader.read_exact(size as usize).await?;

		let server = ietf::ServerSetup::decode(&mut data)?;
		if !data.is_empty() {
			return Err(Error::Decode(DecodeError::TooManyBytes));
		}

		Ok(server)
	}

	/// Advertise a broadcast under the given path and serve it to the peer.
	///
	/// The announcement is withdrawn when the broadcast closes.
	pub fn publish(&self, path: Path, broadcast: BroadcastConsumer) -> Result<(), Error> {
		match &self.engine {
			Engine::Ietf(session) => session.publish(path, broadcast),
			Engine::Lite(session) => session.publish(path, broadcast),
		}
	}

	/// Consume a broadcast published by the peer.
	///
	/// Tracks are subscribed lazily when requested from the returned consumer,
	/// so this works even before the peer announces the path.
	pub fn consume(&self, path: Path) -> BroadcastConsumer {
		match &self.engine {
			Engine::Ietf(session) => session.consume(path),
			Engine::Lite(session) => session.consume(path),
		}
	}

	/// Watch broadcast announcements under a prefix.
	///
	/// Currently active paths are replayed, then updates stream in. Dropping
	/// the consumer cancels the interest.
	pub fn announced(&self, prefix: Path) -> Result<AnnouncedConsumer, Error> {
		match &self.engine {
			Engine::Ietf(session) => session.announced(prefix),
			Engine::Lite(session) => Ok(session.announced(prefix)),
		}
	}

	/// Query the status of a track on the peer (ietf only).
	pub async fn track_status(&self, broadcast: Path, track: String) -> Result<ietf::TrackStatusCode, Error> {
		match &self.engine {
			Engine::Ietf(session) => session.track_status(broadcast, track).await,
			Engine::Lite(_) => Err(Error::Unsupported),
		}
	}

	/// Shut down the session; every stream fails.
	pub fn close(&self) {
		self.effect.close();
	}

	/// Block until the transport session is closed.
	pub async fn closed(&self) -> Error {
		Error::Transport(Arc::new(self.session.closed().await))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::coding::{Reader, Version, Writer};
	use crate::ietf::Message;
	use crate::mock::{self, MockRecv, MockSend, MockSession};
	use crate::{BroadcastProducer, Track};

	use bytes::Bytes;
	use web_transport_trait::Session as _;

	// The raw-wire side of the conversation: reads and writes framed control
	// messages without any engine behind them.
	struct Peer {
		session: MockSession,
		writer: Writer<MockSend>,
		reader: Reader<MockRecv>,
	}

	impl Peer {
		// Accept the control stream and answer the setup handshake.
		async fn accept(session: MockSession, version: Version) -> Self {
			let (send, recv) = session.accept_bi().await.unwrap();
			let mut peer = Self {
				session,
				writer: Writer::new(send),
				reader: Reader::new(recv),
			};

			let client: ietf::ClientSetup = peer.recv().await;
			assert!(client.versions.contains(&version));

			peer.send(ietf::ServerSetup {
				version,
				parameters: Default::default(),
			})
			.await;

			peer
		}

		async fn recv<M: Message>(&mut self) -> M {
			let id: u64 = self.reader.decode().await.unwrap();
			assert_eq!(id, M::ID, "unexpected message type");

			let size: u16 = self.reader.decode().await.unwrap();
			let mut data = self.reader.read_exact(size as usize).await.unwrap();

			let msg = M::decode(&mut data).unwrap();
			assert!(data.is_empty(), "trailing bytes in control message");
			msg
		}

		async fn send<M: Message>(&mut self, msg: M) {
			let buf = ietf::frame(&msg).unwrap();
			self.writer.write_all(&mut std::io::Cursor::new(buf)).await.unwrap();
		}
	}

	async fn connect() -> (Session<MockSession>, Peer) {
		let (client, server) = mock::pair();

		let (session, mut peer) = tokio::join!(
			async { Session::connect(client).await.unwrap() },
			Peer::accept(server, Version::DRAFT_14),
		);

		// The engine advertises its request-id window first.
		let max: ietf::MaxRequestId = peer.recv().await;
		assert_eq!(max.request_id, (1 << 31) - 1);

		(session, peer)
	}

	#[tokio::test]
	async fn announce_and_tear_down() {
		let (session, mut peer) = connect().await;

		let mut broadcast = BroadcastProducer::new();
		session.publish(Path::new("room/a"), broadcast.consume()).unwrap();

		let announce: ietf::PublishNamespace = peer.recv().await;
		assert_eq!(announce.request_id, 0);
		assert_eq!(announce.track_namespace, Path::new("room/a"));

		peer.send(ietf::PublishNamespaceOk { request_id: 0 }).await;

		broadcast.close();

		let done: ietf::PublishNamespaceDone = peer.recv().await;
		assert_eq!(done.track_namespace, Path::new("room/a"));
	}

	#[tokio::test]
	async fn subscribe_unknown() {
		let (_session, mut peer) = connect().await;

		peer.send(ietf::Subscribe {
			request_id: 42,
			track_namespace: Path::new("room/missing"),
			track_name: "video".into(),
			subscriber_priority: 128,
		})
		.await;

		let err: ietf::SubscribeError = peer.recv().await;
		assert_eq!(err.request_id, 42);
		assert_eq!(err.error_code, 404);
		assert_eq!(err.reason_phrase, "Broadcast not found");
	}

	#[tokio::test]
	async fn subscribe_known() {
		let (session, mut peer) = connect().await;

		let mut broadcast = BroadcastProducer::new();
		let mut video = broadcast.create(Track::new("video"));
		session.publish(Path::new("room/a"), broadcast.consume()).unwrap();

		let _announce: ietf::PublishNamespace = peer.recv().await;

		peer.send(ietf::Subscribe {
			request_id: 7,
			track_namespace: Path::new("room/a"),
			track_name: "video".into(),
			subscriber_priority: 200,
		})
		.await;

		let ok: ietf::SubscribeOk = peer.recv().await;
		assert_eq!(ok.request_id, 7);

		// Serve one group with a single frame.
		let mut group = video.append_group();
		group.write_frame(Bytes::from_static(&[0x01, 0x02, 0x03]));
		group.close();

		let stream = peer.session.accept_uni().await.unwrap();
		let mut stream = Reader::new(stream);

		let header: ietf::GroupHeader = stream.decode().await.unwrap();
		assert_eq!(header.request_id, 7);
		assert_eq!(header.group_id, 0);
		assert!(header.has_end);
		assert!(!header.has_subgroup);

		// One frame object, then the FIN doubles as end of group.
		let id_delta: u64 = stream.decode().await.unwrap();
		assert_eq!(id_delta, 0);
		let size: u64 = stream.decode().await.unwrap();
		assert_eq!(size, 3);
		let payload = stream.read_exact(3).await.unwrap();
		assert_eq!(payload.as_ref(), &[0x01, 0x02, 0x03]);

		assert!(stream.decode_maybe::<u64>().await.unwrap().is_none());

		// Ending the track ends the subscription.
		video.close();

		let done: ietf::PublishDone = peer.recv().await;
		assert_eq!(done.request_id, 7);
		assert_eq!(done.status_code, 200);
		assert_eq!(done.reason_phrase, "OK");
	}

	#[tokio::test]
	async fn consumer_subscribe() {
		let (session, mut peer) = connect().await;

		let broadcast = session.consume(Path::new("room/b"));
		let mut track = broadcast.subscribe(&Track {
			name: "audio".to_string(),
			priority: 64,
		});

		let subscribe: ietf::Subscribe = peer.recv().await;
		assert_eq!(subscribe.track_namespace, Path::new("room/b"));
		assert_eq!(subscribe.track_name, "audio");
		assert_eq!(subscribe.subscriber_priority, 64);

		peer.send(ietf::SubscribeOk {
			request_id: subscribe.request_id,
		})
		.await;

		// Deliver group 5 with two frames on a fresh unidirectional stream.
		let stream = peer.session.open_uni().await.unwrap();
		let mut stream = Writer::new(stream);

		stream
			.encode(&ietf::GroupHeader {
				request_id: subscribe.request_id,
				group_id: 5,
				has_extensions: false,
				has_subgroup: false,
				has_subgroup_object: false,
				has_end: true,
			})
			.await
			.unwrap();

		for payload in [&b"first"[..], &b"second"[..]] {
			stream.encode(&0u8).await.unwrap();
			stream.encode(&(payload.len() as u64)).await.unwrap();
			stream.write_all(&mut std::io::Cursor::new(payload)).await.unwrap();
		}

		stream.finish().await.unwrap();

		let mut group = track.next_group().await.unwrap().unwrap();
		assert_eq!(group.info.sequence, 5);

		assert_eq!(group.read_frame().await.unwrap().unwrap().as_ref(), b"first");
		assert_eq!(group.read_frame().await.unwrap().unwrap().as_ref(), b"second");
		assert!(group.read_frame().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn namespace_subscription() {
		let (session, mut peer) = connect().await;

		let mut announced = session.announced(Path::new("room")).unwrap();

		let interest: ietf::SubscribeNamespace = peer.recv().await;
		assert_eq!(interest.namespace, Path::new("room"));
		let request_id = interest.request_id;

		// Server-initiated ids are odd.
		peer.send(ietf::PublishNamespace {
			request_id: 1,
			track_namespace: Path::new("room/x"),
		})
		.await;

		let event = announced.next().await.unwrap();
		assert_eq!(event.path, Path::new("room/x"));
		assert!(event.active);

		// The announce is acknowledged.
		let ok: ietf::PublishNamespaceOk = peer.recv().await;
		assert_eq!(ok.request_id, 1);

		peer.send(ietf::PublishNamespaceDone {
			track_namespace: Path::new("room/x"),
		})
		.await;

		let event = announced.next().await.unwrap();
		assert_eq!(event.path, Path::new("room/x"));
		assert!(!event.active);

		// Dropping the endpoint cancels the interest.
		drop(announced);

		let unsubscribe: ietf::UnsubscribeNamespace = peer.recv().await;
		assert_eq!(unsubscribe.request_id, request_id);
	}

	#[tokio::test]
	async fn goaway_is_fatal() {
		let (session, mut peer) = connect().await;

		peer.send(ietf::GoAway {
			new_session_uri: "https://elsewhere".into(),
		})
		.await;

		// The session tears down without following the redirect.
		session.closed().await;
	}

	#[tokio::test]
	async fn track_status() {
		let (session, mut peer) = connect().await;

		// Outgoing query, answered by the raw peer.
		let (status, _) = tokio::join!(
			session.track_status(Path::new("room/a"), "video".to_string()),
			async {
				let request: ietf::TrackStatusRequest = peer.recv().await;
				assert_eq!(request.track_namespace, Path::new("room/a"));
				assert_eq!(request.track_name, "video");

				peer.send(ietf::TrackStatus {
					request_id: request.request_id,
					status: ietf::TrackStatusCode::InProgress,
				})
				.await;
			},
		);

		assert_eq!(status.unwrap(), ietf::TrackStatusCode::InProgress);

		// Incoming query for an unknown broadcast.
		peer.send(ietf::TrackStatusRequest {
			request_id: 9,
			track_namespace: Path::new("room/missing"),
			track_name: "video".into(),
		})
		.await;

		let status: ietf::TrackStatus = peer.recv().await;
		assert_eq!(status.request_id, 9);
		assert_eq!(status.status, ietf::TrackStatusCode::NotFound);
	}

	#[tokio::test]
	async fn subscribe_error_fails_track() {
		let (session, mut peer) = connect().await;

		let broadcast = session.consume(Path::new("room/b"));
		let mut track = broadcast.subscribe(&Track::new("audio"));

		let subscribe: ietf::Subscribe = peer.recv().await;

		peer.send(ietf::SubscribeError {
			request_id: subscribe.request_id,
			error_code: 403,
			reason_phrase: "nope".into(),
		})
		.await;

		assert!(matches!(track.next_group().await, Err(Error::Peer { code: 403, .. })));
	}

	#[tokio::test]
	async fn unsubscribe_on_drop() {
		let (session, mut peer) = connect().await;

		let broadcast = session.consume(Path::new("room/b"));
		let track = broadcast.subscribe(&Track::new("audio"));

		let subscribe: ietf::Subscribe = peer.recv().await;
		peer.send(ietf::SubscribeOk {
			request_id: subscribe.request_id,
		})
		.await;

		// The consumer loses interest; the engine unsubscribes.
		drop(track);

		let unsubscribe: ietf::Unsubscribe = peer.recv().await;
		assert_eq!(unsubscribe.request_id, subscribe.request_id);
	}

	// The lite variant negotiates on the same handshake but runs
	// stream-per-request control.
	mod lite_wire {
		use super::*;
		use crate::lite;
		use web_transport_trait::Session as _;

		async fn connect() -> (Session<MockSession>, MockSession) {
			let (client, server) = mock::pair();

			let (session, peer) = tokio::join!(
				async { Session::connect(client).await.unwrap() },
				Peer::accept(server, Version::LITE_V1),
			);

			(session, peer.session)
		}

		#[tokio::test]
		async fn announce() {
			let (session, peer) = connect().await;

			let mut broadcast = BroadcastProducer::new();
			session.publish(Path::new("room/a"), broadcast.consume()).unwrap();

			// The peer asks for announcements under a prefix.
			let (send, recv) = peer.open_bi().await.unwrap();
			let mut writer = Writer::new(send);
			let mut reader = Reader::new(recv);

			writer.encode(&lite::ControlType::Announce).await.unwrap();
			writer
				.encode(&lite::AnnouncePlease {
					prefix: Path::new("room"),
				})
				.await
				.unwrap();

			let init: lite::AnnounceInit = reader.decode().await.unwrap();
			assert_eq!(init.suffixes, vec![Path::new("a")]);

			// Ending the broadcast unannounces it.
			broadcast.close();

			let update: lite::Announce = reader.decode().await.unwrap();
			assert_eq!(update, lite::Announce::Ended { suffix: Path::new("a") });
		}

		#[tokio::test]
		async fn publish_subscribe() {
			let (session, peer) = connect().await;

			let mut broadcast = BroadcastProducer::new();
			let mut video = broadcast.create(Track {
				name: "video".to_string(),
				priority: 128,
			});
			session.publish(Path::new("room/a"), broadcast.consume()).unwrap();

			let (send, recv) = peer.open_bi().await.unwrap();
			let mut writer = Writer::new(send);
			let mut reader = Reader::new(recv);

			writer.encode(&lite::ControlType::Subscribe).await.unwrap();
			writer
				.encode(&lite::Subscribe {
					id: 1,
					broadcast: Path::new("room/a"),
					track: "video".to_string(),
					priority: 128,
				})
				.await
				.unwrap();

			let ok: lite::SubscribeOk = reader.decode().await.unwrap();
			assert_eq!(ok.priority, 128);

			let mut group = video.append_group();
			group.write_frame(Bytes::from_static(b"frame"));
			group.close();

			let stream = peer.accept_uni().await.unwrap();
			let mut stream = Reader::new(stream);

			let kind: lite::DataType = stream.decode().await.unwrap();
			assert_eq!(kind, lite::DataType::Group);

			let header: lite::Group = stream.decode().await.unwrap();
			assert_eq!(header.subscribe, 1);
			assert_eq!(header.sequence, 0);

			let size: u64 = stream.decode().await.unwrap();
			let payload = stream.read_exact(size as usize).await.unwrap();
			assert_eq!(payload.as_ref(), b"frame");

			assert!(stream.decode_maybe::<u64>().await.unwrap().is_none());
		}

		#[tokio::test]
		async fn consume() {
			let (session, peer) = connect().await;

			let broadcast = session.consume(Path::new("room/b"));
			let mut track = broadcast.subscribe(&Track {
				name: "audio".to_string(),
				priority: 64,
			});

			// The engine opens a subscribe stream.
			let (send, recv) = peer.accept_bi().await.unwrap();
			let mut writer = Writer::new(send);
			let mut reader = Reader::new(recv);

			let kind: lite::ControlType = reader.decode().await.unwrap();
			assert_eq!(kind, lite::ControlType::Subscribe);

			let subscribe: lite::Subscribe = reader.decode().await.unwrap();
			assert_eq!(subscribe.broadcast, Path::new("room/b"));
			assert_eq!(subscribe.track, "audio");
			assert_eq!(subscribe.priority, 64);

			writer.encode(&lite::SubscribeOk { priority: 64 }).await.unwrap();

			// Deliver a group.
			let stream = peer.open_uni().await.unwrap();
			let mut stream = Writer::new(stream);

			stream.encode(&lite::DataType::Group).await.unwrap();
			stream
				.encode(&lite::Group {
					subscribe: subscribe.id,
					sequence: 5,
				})
				.await
				.unwrap();
			stream.encode(&(5u64)).await.unwrap();
			stream.write_all(&mut std::io::Cursor::new(&b"hello"[..])).await.unwrap();
			stream.finish().await.unwrap();

			let mut group = track.next_group().await.unwrap().unwrap();
			assert_eq!(group.info.sequence, 5);
			assert_eq!(group.read_frame().await.unwrap().unwrap().as_ref(), b"hello");
			assert!(group.read_frame().await.unwrap().is_none());
		}
	}

	#[tokio::test]
	async fn rejects_unsupported_version() {
		let (client, server) = mock::pair();

		let (res, _peer) = tokio::join!(Session::connect(client), async move {
			let (send, recv) = server.accept_bi().await.unwrap();
			let mut peer = Peer {
				session: server,
				writer: Writer::new(send),
				reader: Reader::new(recv),
			};

			let _client: ietf::ClientSetup = peer.recv().await;
			peer.send(ietf::ServerSetup {
				version: Version::DRAFT_07,
				parameters: Default::default(),
			})
			.await;

			peer
		});

		assert!(matches!(res, Err(Error::Version(..))));
	}

	#[tokio::test]
	async fn close_cascades() {
		let (session, mut peer) = connect().await;

		let broadcast = session.consume(Path::new("room/b"));
		let mut track = broadcast.subscribe(&Track::new("audio"));

		let _subscribe: ietf::Subscribe = peer.recv().await;

		session.close();
		session.closed().await;

		// Every in-flight subscription fails once the session is gone.
		assert!(matches!(track.next_group().await, Err(Error::Cancel)));
	}
}

