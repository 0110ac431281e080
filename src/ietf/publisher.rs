use std::{collections::HashMap, sync::Arc};

use tokio::sync::oneshot;
use web_async::Lock;

use crate::{
	coding::Writer,
	ietf::{self, Control, GroupHeader},
	signals::Effect,
	BroadcastConsumer, Error, GroupConsumer, Path, Track, TrackConsumer,
};

#[derive(Default)]
struct State {
	// Locally published broadcasts, served on incoming Subscribe.
	broadcasts: HashMap<Path, BroadcastConsumer>,

	// Cancel handles for the tasks serving incoming subscriptions.
	subscribes: HashMap<u64, oneshot::Sender<()>>,

	// Outstanding namespace announcements, for correlating responses.
	announces: HashMap<u64, Path>,
}

/// The publisher half of an ietf session: answers Subscribe and serves groups.
#[derive(Clone)]
pub(super) struct Publisher<S: web_transport_trait::Session> {
	session: S,
	control: Control,
	effect: Arc<Effect>,
	state: Lock<State>,
}

impl<S: web_transport_trait::Session> Publisher<S> {
	pub fn new(session: S, control: Control, effect: Arc<Effect>) -> Self {
		Self {
			session,
			control,
			effect,
			state: Default::default(),
		}
	}

	/// Announce a broadcast under the given path and serve it until it closes.
	pub fn publish(&self, path: Path, broadcast: BroadcastConsumer) -> Result<(), Error> {
		{
			let mut state = self.state.lock();
			if state.broadcasts.contains_key(&path) {
				return Err(Error::Duplicate);
			}

			state.broadcasts.insert(path.clone(), broadcast.clone());
		}

		let request_id = self.control.request_id();
		self.state.lock().announces.insert(request_id, path.clone());

		tracing::debug!(broadcast = %path, "announce");
		self.control.send(ietf::PublishNamespace {
			request_id,
			track_namespace: path.clone(),
		})?;

		// Withdraw the announcement once the broadcast closes.
		let this = self.clone();
		self.effect.spawn(async move {
			broadcast.closed().await;

			if this.unpublish(&path) {
				tracing::debug!(broadcast = %path, "unannounce");
				this.control
					.send(ietf::PublishNamespaceDone { track_namespace: path })
					.ok();
			}
		});

		Ok(())
	}

	// Remove a broadcast, returning true if it was still published.
	fn unpublish(&self, path: &Path) -> bool {
		self.state.lock().broadcasts.remove(path).is_some()
	}

	pub fn recv_subscribe(&mut self, msg: ietf::Subscribe<'_>) -> Result<(), Error> {
		let request_id = msg.request_id;

		tracing::info!(id = %request_id, broadcast = %msg.track_namespace, track = %msg.track_name, "subscribe started");

		let broadcast = match self.state.lock().broadcasts.get(&msg.track_namespace).cloned() {
			Some(consumer) => consumer,
			None => {
				return self.control.send(ietf::SubscribeError {
					request_id,
					error_code: 404,
					reason_phrase: "Broadcast not found".into(),
				});
			}
		};

		let track = Track {
			name: msg.track_name.to_string(),
			priority: msg.subscriber_priority,
		};
		let track = broadcast.subscribe(&track);

		let (tx, rx) = oneshot::channel();
		self.state.lock().subscribes.insert(request_id, tx);

		self.control.send(ietf::SubscribeOk { request_id })?;

		let session = self.session.clone();
		let control = self.control.clone();
		let state = self.state.clone();
		let effect = self.effect.clone();

		self.effect.spawn(async move {
			let done = match Self::run_track(session, effect, request_id, track, rx).await {
				Ok(()) => ietf::PublishDone {
					request_id,
					status_code: 200,
					reason_phrase: "OK".into(),
				},
				Err(err) => {
					tracing::warn!(id = %request_id, %err, "subscribe error");
					ietf::PublishDone {
						request_id,
						status_code: 500,
						reason_phrase: err.to_string().into(),
					}
				}
			};

			control.send(done).ok();
			state.lock().subscribes.remove(&request_id);
		});

		Ok(())
	}

	async fn run_track(
		session: S,
		effect: Arc<Effect>,
		request_id: u64,
		mut track: TrackConsumer,
		mut cancel: oneshot::Receiver<()>,
	) -> Result<(), Error> {
		loop {
			let group = tokio::select! {
				biased;
				_ = &mut cancel => return Ok(()),
				group = track.next_group() => group?,
			};

			let group = match group {
				Some(group) => group,
				None => return Ok(()),
			};

			tracing::debug!(subscribe = %request_id, track = %track.info.name, sequence = %group.info.sequence, "serving group");

			let header = GroupHeader {
				request_id,
				group_id: group.info.sequence,
				has_extensions: false,
				has_subgroup: false,
				has_subgroup_object: false,
				has_end: true,
			};

			let session = session.clone();
			let priority = stream_priority(track.info.priority, group.info.sequence);

			effect.spawn(async move {
				let sequence = group.info.sequence;
				if let Err(err) = Self::run_group(session, header, priority, group).await {
					tracing::debug!(subscribe = %request_id, %sequence, %err, "group error");
				}
			});
		}
	}

	async fn run_group(session: S, header: GroupHeader, priority: i32, mut group: GroupConsumer) -> Result<(), Error> {
		let stream = session
			.open_uni()
			.await
			.map_err(|err| Error::Transport(Arc::new(err)))?;

		let mut stream = Writer::new(stream);
		stream.set_priority(priority);
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

			// Object id deltas are always 0.
			stream.encode(&0u8).await?;

			// The frame size, then the payload or a status for empty frames.
			stream.encode(&(frame.len() as u64)).await?;
			if frame.is_empty() {
				stream.encode(&(ietf::OBJECT_STATUS_NORMAL as u8)).await?;
			} else {
				stream.write_all(&mut std::io::Cursor::new(frame)).await?;
			}
		}

		// The FIN doubles as the end-of-group marker since has_end is set.
		stream.finish().await?;

		tracing::debug!(sequence = %header.group_id, "finished group");

		Ok(())
	}

	pub fn recv_unsubscribe(&mut self, msg: ietf::Unsubscribe) -> Result<(), Error> {
		if let Some(cancel) = self.state.lock().subscribes.remove(&msg.request_id) {
			cancel.send(()).ok();
		} else {
			tracing::warn!(id = %msg.request_id, "unsubscribe for unknown subscription");
		}

		Ok(())
	}

	pub fn recv_publish_namespace_ok(&mut self, msg: ietf::PublishNamespaceOk) -> Result<(), Error> {
		match self.state.lock().announces.remove(&msg.request_id) {
			Some(path) => tracing::debug!(broadcast = %path, "namespace published"),
			None => tracing::warn!(id = %msg.request_id, "publish namespace ok for unknown request"),
		}

		Ok(())
	}

	pub fn recv_publish_namespace_error(&mut self, msg: ietf::PublishNamespaceError<'_>) -> Result<(), Error> {
		let path = self.state.lock().announces.remove(&msg.request_id);
		let path = match path {
			Some(path) => path,
			None => {
				tracing::warn!(?msg, "publish namespace error for unknown request");
				return Ok(());
			}
		};

		tracing::warn!(broadcast = %path, code = %msg.error_code, reason = %msg.reason_phrase, "publish namespace error");

		// The peer rejected the namespace; stop serving it.
		self.unpublish(&path);

		Ok(())
	}

	pub fn recv_publish_namespace_cancel(&mut self, msg: ietf::PublishNamespaceCancel<'_>) -> Result<(), Error> {
		tracing::warn!(broadcast = %msg.track_namespace, code = %msg.error_code, "publish namespace cancelled");
		self.unpublish(&msg.track_namespace);
		Ok(())
	}

	pub fn recv_subscribe_namespace(&mut self, msg: ietf::SubscribeNamespace) -> Result<(), Error> {
		// We announce everything regardless of interest.
		tracing::debug!(prefix = %msg.namespace, "peer subscribed to namespace");
		self.control.send(ietf::SubscribeNamespaceOk {
			request_id: msg.request_id,
		})
	}

	pub fn recv_unsubscribe_namespace(&mut self, msg: ietf::UnsubscribeNamespace) -> Result<(), Error> {
		tracing::debug!(id = %msg.request_id, "peer unsubscribed from namespace");
		Ok(())
	}

	pub fn recv_track_status_request(&mut self, msg: ietf::TrackStatusRequest<'_>) -> Result<(), Error> {
		let status = match self.state.lock().broadcasts.contains_key(&msg.track_namespace) {
			true => ietf::TrackStatusCode::InProgress,
			false => ietf::TrackStatusCode::NotFound,
		};

		self.control.send(ietf::TrackStatus {
			request_id: msg.request_id,
			status,
		})
	}
}

// Quinn takes an i32 priority, so we squeeze the track priority and group
// sequence into 32 bits. Sequences wrap at 2^24, which takes days to reach
// even with a group per frame.
fn stream_priority(track_priority: u8, group_sequence: u64) -> i32 {
	let sequence = 0xFFFFFF - (group_sequence as u32 & 0xFFFFFF);
	((track_priority as i32) << 24) | sequence as i32
}
