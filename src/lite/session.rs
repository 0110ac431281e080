use std::sync::Arc;

use crate::{
	coding::Stream,
	lite,
	signals::Effect,
	AnnouncedConsumer, BroadcastConsumer, Error, Path,
};

use super::{Publisher, Subscriber};

/// The engine for a negotiated lite session.
///
/// Control is stream-per-request: the setup stream stays open for session
/// updates, announces and subscribes each get their own bidirectional stream,
/// and groups arrive on unidirectional streams.
#[derive(Clone)]
pub(crate) struct Session<S: web_transport_trait::Session> {
	publisher: Publisher<S>,
	subscriber: Subscriber<S>,
}

impl<S: web_transport_trait::Session> Session<S> {
	/// Run the engine over a session whose setup handshake already finished.
	pub fn start(session: S, setup: Stream<S>, effect: Arc<Effect>) -> Self {
		let publisher = Publisher::new(session.clone(), effect.clone());
		let subscriber = Subscriber::new(session.clone(), effect.clone());

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
				res = run_session(setup) => res,
				res = publisher.run() => res,
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

		this
	}

	pub fn publish(&self, path: Path, broadcast: BroadcastConsumer) -> Result<(), Error> {
		self.publisher.publish(path, broadcast)
	}

	pub fn consume(&self, path: Path) -> BroadcastConsumer {
		self.subscriber.consume(path)
	}

	pub fn announced(&self, prefix: Path) -> AnnouncedConsumer {
		self.subscriber.announced(prefix)
	}
}

// The setup stream stays open; the server occasionally sends updates we log
// and otherwise ignore.
async fn run_session<S: web_transport_trait::Session>(mut stream: Stream<S>) -> Result<(), Error> {
	while let Some(info) = stream.reader.decode_maybe::<lite::SessionUpdate>().await? {
		tracing::trace!(bitrate = %info.bitrate, "session update");
	}

	Err(Error::Cancel)
}
