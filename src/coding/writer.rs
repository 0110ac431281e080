use std::sync::Arc;

use crate::{coding::*, Error};

/// An encoder over the send half of a stream.
///
/// Messages are serialized into a scratch buffer and flushed in full, so the
/// length prefix is always known before the payload hits the wire.
pub struct Writer<S: web_transport_trait::SendStream> {
	stream: S,
	buffer: bytes::BytesMut,
}

impl<S: web_transport_trait::SendStream> Writer<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	pub async fn encode<T: Encode>(&mut self, msg: &T) -> Result<(), Error> {
		self.buffer.clear();
		msg.encode(&mut self.buffer);

		while !self.buffer.is_empty() {
			self.stream
				.write_buf(&mut self.buffer)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?;
		}

		Ok(())
	}

	// NOTE: We use Buf so we don't perform a copy when using Quinn.
	pub async fn write_all<B: bytes::Buf + Send>(&mut self, buf: &mut B) -> Result<(), Error> {
		while buf.has_remaining() {
			self.stream
				.write_buf(buf)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?;
		}

		Ok(())
	}

	pub fn set_priority(&mut self, priority: i32) {
		self.stream.set_priority(priority);
	}

	/// A clean termination of the stream.
	pub async fn finish(&mut self) -> Result<(), Error> {
		self.stream.finish().await.map_err(|e| Error::Transport(Arc::new(e)))
	}

	pub fn abort(&mut self, err: &Error) {
		self.stream.reset(err.to_code());
	}

	/// Wait until the peer stops the stream.
	pub async fn closed(&mut self) -> Result<(), Error> {
		self.stream.closed().await.map_err(|e| Error::Transport(Arc::new(e)))
	}
}

impl<S: web_transport_trait::SendStream> Drop for Writer<S> {
	fn drop(&mut self) {
		// Unlike the Quinn default, we abort the stream on drop.
		self.stream.reset(Error::Cancel.to_code());
	}
}
