use bytes::{Buf, BufMut};

use crate::coding::{DecodeError, Encode, Sizer};
use crate::Error;

/// A control message with a static type id.
///
/// On the wire each message is `ID varint ‖ u16 length ‖ payload`; the
/// framing itself lives in the control stream code, which needs the size
/// before the payload via [Message::encode_size].
pub trait Message: Sized {
	const ID: u64;

	/// Encode the payload, without the type id or length prefix.
	fn encode<W: BufMut>(&self, w: &mut W);

	/// Decode the payload; the buffer is bounded to the framed length and
	/// must be fully consumed.
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;

	/// The encoded payload size in bytes.
	fn encode_size(&self) -> usize {
		let mut sizer = Sizer::default();
		self.encode(&mut sizer);
		sizer.size
	}
}

/// Frame a message for the control stream: `ID ‖ u16 length ‖ payload`.
///
/// Fails with [Error::TooLarge] when the payload exceeds the length prefix.
pub(crate) fn frame<M: Message>(msg: &M) -> Result<Vec<u8>, Error> {
	let size: u16 = msg.encode_size().try_into().map_err(|_| Error::TooLarge)?;

	let mut buf = Vec::new();
	M::ID.encode(&mut buf);
	size.encode(&mut buf);
	msg.encode(&mut buf);

	Ok(buf)
}
