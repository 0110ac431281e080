use std::sync::{atomic, Arc};

use crate::{ietf::Message, Error};

/// A handle for sending control messages and allocating request ids.
///
/// Writes funnel through an unbounded channel into the single writer task, so
/// concurrent senders serialize without holding a lock across awaits.
#[derive(Clone)]
pub(super) struct Control {
	tx: tokio::sync::mpsc::UnboundedSender<Vec<u8>>,
	request_id: Arc<atomic::AtomicU64>,
}

impl Control {
	pub fn new(tx: tokio::sync::mpsc::UnboundedSender<Vec<u8>>) -> Self {
		Self {
			tx,
			// Clients use even request ids; odd ids belong to the server.
			request_id: Arc::new(atomic::AtomicU64::new(0)),
		}
	}

	pub fn send<T: Message>(&self, msg: T) -> Result<(), Error> {
		let buf = super::frame(&msg)?;
		self.tx.send(buf).map_err(|e| Error::Transport(Arc::new(e)))?;
		Ok(())
	}

	/// Allocate the next request id.
	///
	/// Ids are never returned to the pool; see MaxRequestId handling in the
	/// session for the other half of this gap.
	pub fn request_id(&self) -> u64 {
		self.request_id.fetch_add(2, atomic::Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::coding::{Decode, DecodeError};
	use bytes::{Buf, BufMut};

	struct Padding(usize);

	impl Message for Padding {
		const ID: u64 = 0x3f;

		fn encode<W: BufMut>(&self, w: &mut W) {
			w.put_bytes(0, self.0);
		}

		fn decode<B: Buf>(_: &mut B) -> Result<Self, DecodeError> {
			unimplemented!()
		}
	}

	#[test]
	fn request_ids_are_even() {
		let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
		let control = Control::new(tx);

		assert_eq!(control.request_id(), 0);
		assert_eq!(control.request_id(), 2);
		assert_eq!(control.request_id(), 4);
	}

	#[test]
	fn frames_messages() {
		let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
		let control = Control::new(tx);

		control.send(Padding(3)).unwrap();

		let buf = rx.try_recv().unwrap();
		let mut buf = bytes::Bytes::from(buf);
		assert_eq!(u64::decode(&mut buf).unwrap(), Padding::ID);
		assert_eq!(u16::decode(&mut buf).unwrap(), 3);
		assert_eq!(buf.remaining(), 3);
	}

	#[test]
	fn message_too_large() {
		let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
		let control = Control::new(tx);

		control.send(Padding(u16::MAX as usize)).unwrap();
		assert!(rx.try_recv().is_ok());

		// One byte past the 16-bit length prefix is fatal.
		assert!(matches!(control.send(Padding(u16::MAX as usize + 1)), Err(Error::TooLarge)));
	}
}
