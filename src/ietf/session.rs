use std::sync::Arc;

use crate::{
	coding::{DecodeError, Reader, Stream, Writer},
	ietf::{self, Control, Message},
	signals::Effect,
	AnnouncedConsumer, BroadcastConsumer, Error, Path,
};

use super::{Publisher, Subscriber};

/// The request-id window we advertise at startup.
const MAX_REQUEST_ID: u64 = (1 << 31) - 1;

/// The engine for a negotiated draft-14 session.
///
/// The control stream fans out to the publisher or subscriber per message;
/// each incoming unidirectional stream carries a single group.
#[derive(Clone)]
pub(crate) struct Session<S: web_transport_trait::Session> {
	publisher: Publisher<S>,
	subscriber: Subscriber<S>,
}

impl<S: web_transport_trait::Session> Session<S> {
	/// Run the engine over a session whose setup handshake already finished.
	pub fn start(session: S, setup: Stream<S>, effect: Arc<Effect>) -> Result<Self, Error> {
		let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
		let control = Control::new(tx);

		// Allow the peer a huge number of requests; we never enforce our own
		// window either.
		control.send(ietf::MaxRequestId {
			request_id: MAX_REQUEST_ID,
		})?;

		let publisher = Publisher::new(session.clone(), control.clone(), effect.clone());
		let subscriber = Subscriber::new(session.clone(), control, effect.clone());

		let this = Self {
			publisher: publisher.clone(),
			subscriber: subscriber.clone(),
		};

		// Fail every in-flight subscription when the session tears down.
		{
			let subscriber = subscriber.clone();
			effect.cleanup(move || subscriber.abort_all());
		}

		let scope = effect.clone();
		effect.spawn(async move {
			let res = tokio::select! {
				res = run_control_read(setup.reader, publisher, subscriber.clone()) => res,
				res = run_control_write(setup.writer, rx) => res,
				res = subscriber.run() => res,
			};

			match res {
				Err(Error::Transport(_)) => {
					tracing::info!("session terminated");
					session.close(1, "");
				}
				Err(err) => {
					tracing::warn!(%err, "session error");
					session.close(err.to_code(), err.to_string().as_ref());
				}
				Ok(()) => {
					tracing::info!("session closed");
					session.close(0, "");
				}
			}

			scope.close();
		});

		Ok(this)
	}

	pub fn publish(&self, path: Path, broadcast: BroadcastConsumer) -> Result<(), Error> {
		self.publisher.publish(path, broadcast)
	}

	pub fn consume(&self, path: Path) -> BroadcastConsumer {
		self.subscriber.consume(path)
	}

	pub fn announced(&self, prefix: Path) -> Result<AnnouncedConsumer, Error> {
		self.subscriber.announced(prefix)
	}

	pub async fn track_status(&self, broadcast: Path, track: String) -> Result<ietf::TrackStatusCode, Error> {
		self.subscriber.track_status(broadcast, track).await
	}
}

async fn run_control_read<S: web_transport_trait::Session>(
	mut control: Reader<S::RecvStream>,
	mut publisher: Publisher<S>,
	mut subscriber: Subscriber<S>,
) -> Result<(), Error> {
	loop {
		let id: u64 = control.decode().await?;
		let size: u16 = control.decode().await?;
		let mut data = control.read_exact(size as usize).await?;

		match id {
			ietf::Subscribe::ID => {
				let msg = ietf::Subscribe::decode(&mut data)?;
				publisher.recv_subscribe(msg)?;
			}
			ietf::SubscribeOk::ID => {
				let msg = ietf::SubscribeOk::decode(&mut data)?;
				subscriber.recv_subscribe_ok(msg)?;
			}
			ietf::SubscribeError::ID => {
				let msg = ietf::SubscribeError::decode(&mut data)?;
				subscriber.recv_subscribe_error(msg)?;
			}
			ietf::Unsubscribe::ID => {
				let msg = ietf::Unsubscribe::decode(&mut data)?;
				publisher.recv_unsubscribe(msg)?;
			}
			ietf::PublishDone::ID => {
				let msg = ietf::PublishDone::decode(&mut data)?;
				subscriber.recv_publish_done(msg)?;
			}
			ietf::PublishNamespace::ID => {
				let msg = ietf::PublishNamespace::decode(&mut data)?;
				subscriber.recv_publish_namespace(msg)?;
			}
			ietf::PublishNamespaceOk::ID => {
				let msg = ietf::PublishNamespaceOk::decode(&mut data)?;
				publisher.recv_publish_namespace_ok(msg)?;
			}
			ietf::PublishNamespaceError::ID => {
				let msg = ietf::PublishNamespaceError::decode(&mut data)?;
				publisher.recv_publish_namespace_error(msg)?;
			}
			ietf::PublishNamespaceDone::ID => {
				let msg = ietf::PublishNamespaceDone::decode(&mut data)?;
				subscriber.recv_publish_namespace_done(msg)?;
			}
			ietf::PublishNamespaceCancel::ID => {
				let msg = ietf::PublishNamespaceCancel::decode(&mut data)?;
				publisher.recv_publish_namespace_cancel(msg)?;
			}
			ietf::SubscribeNamespace::ID => {
				let msg = ietf::SubscribeNamespace::decode(&mut data)?;
				publisher.recv_subscribe_namespace(msg)?;
			}
			ietf::SubscribeNamespaceOk::ID => {
				let msg = ietf::SubscribeNamespaceOk::decode(&mut data)?;
				subscriber.recv_subscribe_namespace_ok(msg)?;
			}
			ietf::SubscribeNamespaceError::ID => {
				let msg = ietf::SubscribeNamespaceError::decode(&mut data)?;
				subscriber.recv_subscribe_namespace_error(msg)?;
			}
			ietf::UnsubscribeNamespace::ID => {
				let msg = ietf::UnsubscribeNamespace::decode(&mut data)?;
				publisher.recv_unsubscribe_namespace(msg)?;
			}
			ietf::TrackStatusRequest::ID => {
				let msg = ietf::TrackStatusRequest::decode(&mut data)?;
				publisher.recv_track_status_request(msg)?;
			}
			ietf::TrackStatus::ID => {
				let msg = ietf::TrackStatus::decode(&mut data)?;
				subscriber.recv_track_status(msg)?;
			}
			ietf::MaxRequestId::ID => {
				let msg = ietf::MaxRequestId::decode(&mut data)?;
				tracing::warn!(?msg, "ignoring max request id");
			}
			ietf::RequestsBlocked::ID => {
				let msg = ietf::RequestsBlocked::decode(&mut data)?;
				tracing::warn!(?msg, "ignoring requests blocked");
			}
			ietf::GoAway::ID => {
				// We don't follow redirects; tear the session down instead.
				let msg = ietf::GoAway::decode(&mut data)?;
				tracing::warn!(uri = %msg.new_session_uri, "goaway is unsupported");
				return Err(Error::Unsupported);
			}
			ietf::SubscribeUpdate::ID => return Err(Error::Unsupported),
			ietf::Fetch::ID => return Err(Error::Unsupported),
			ietf::FetchCancel::ID => return Err(Error::Unsupported),
			ietf::FetchOk::ID => return Err(Error::Unsupported),
			ietf::FetchError::ID => return Err(Error::Unsupported),
			ietf::Publish::ID => return Err(Error::Unsupported),
			ietf::PublishOk::ID => return Err(Error::Unsupported),
			ietf::PublishError::ID => return Err(Error::Unsupported),
			_ => return Err(Error::UnexpectedMessage),
		}

		if !data.is_empty() {
			return Err(Error::Decode(DecodeError::TooManyBytes));
		}
	}
}

async fn run_control_write<S: web_transport_trait::SendStream>(
	mut control: Writer<S>,
	mut rx: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
) -> Result<(), Error> {
	while let Some(msg) = rx.recv().await {
		let mut buf = std::io::Cursor::new(msg);
		control.write_all(&mut buf).await?;
	}

	Ok(())
}
