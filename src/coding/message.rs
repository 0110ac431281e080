use bytes::{Buf, BufMut};

use super::{Decode, DecodeError, Encode, Sizer};

/// A message framed with a varint size prefix (the lite discipline).
///
/// This trait wraps the existing Encode/Decode traits and automatically handles:
/// - Prefixing messages with their encoded size during encoding
/// - Reading the size prefix and bounding the decoder to exactly that many bytes
/// - Ensuring no bytes are left over or missing after decoding
pub trait Message: Sized {
	/// Encode this message, without the size prefix.
	fn encode<W: BufMut>(&self, w: &mut W);

	/// Decode this message, without the size prefix.
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

// Blanket implementations add the framing.
impl<T: Message> Encode for T {
	fn encode<W: BufMut>(&self, w: &mut W) {
		let mut sizer = Sizer::default();
		Message::encode(self, &mut sizer);
		sizer.size.encode(w);
		Message::encode(self, w);
	}
}

impl<T: Message> Decode for T {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let size = usize::decode(buf)?;
		if buf.remaining() < size {
			return Err(DecodeError::Short);
		}

		let mut limited = buf.take(size);
		let result = Message::decode(&mut limited)?;
		if limited.remaining() > 0 {
			return Err(DecodeError::TooManyBytes);
		}

		Ok(result)
	}
}
