use std::{io, sync::Arc};

use bytes::{Buf, Bytes, BytesMut};

use crate::{coding::*, Error};

/// A decoder over the receive half of a stream.
///
/// Chunks are buffered internally; a [DecodeError::Short] from the inner
/// decoder triggers another read instead of surfacing to the caller.
pub struct Reader<S: web_transport_trait::RecvStream> {
	stream: S,
	buffer: BytesMut,
}

impl<S: web_transport_trait::RecvStream> Reader<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	pub async fn decode<T: Decode>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => {
					self.buffer.advance(cursor.position() as usize);
					return Ok(msg);
				}
				Err(DecodeError::Short) => self.fill().await?,
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Decode a message without consuming it from the buffer.
	pub async fn decode_peek<T: Decode>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer);
			match T::decode(&mut cursor) {
				Ok(msg) => return Ok(msg),
				Err(DecodeError::Short) => self.fill().await?,
				Err(e) => return Err(Error::Decode(e)),
			}
		}
	}

	/// Decode a message, or return None at a clean end of stream.
	pub async fn decode_maybe<T: Decode>(&mut self) -> Result<Option<T>, Error> {
		match self.closed().await {
			Ok(()) => Ok(None),
			Err(Error::Decode(DecodeError::ExpectedEnd)) => Ok(Some(self.decode().await?)),
			Err(e) => Err(e),
		}
	}

	/// Return exactly `size` bytes, or fail at end of stream.
	pub async fn read_exact(&mut self, size: usize) -> Result<Bytes, Error> {
		while self.buffer.len() < size {
			self.fill().await?;
		}

		Ok(self.buffer.split_to(size).freeze())
	}

	/// Wait until the stream is closed, erroring if there are any additional bytes.
	pub async fn closed(&mut self) -> Result<(), Error> {
		if self.buffer.is_empty() && !self.fill_maybe().await? {
			return Ok(());
		}

		Err(DecodeError::ExpectedEnd.into())
	}

	pub fn abort(&mut self, err: &Error) {
		self.stream.stop(err.to_code());
	}

	// Read more data into the buffer, erroring at end of stream.
	async fn fill(&mut self) -> Result<(), Error> {
		if !self.fill_maybe().await? {
			return Err(Error::Decode(DecodeError::Short));
		}

		Ok(())
	}

	// Read more data into the buffer, returning false at end of stream.
	async fn fill_maybe(&mut self) -> Result<bool, Error> {
		let res = self
			.stream
			.read_buf(&mut self.buffer)
			.await
			.map_err(|e| Error::Transport(Arc::new(e)))?;

		Ok(res.is_some())
	}
}
