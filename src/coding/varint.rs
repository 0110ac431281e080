use super::{Decode, DecodeError, Encode};

/// The largest value a QUIC varint can represent: 2^62 - 1.
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// QUIC variable-length integers.
///
/// The top two bits of the first byte select the total length (1, 2, 4, or 8
/// bytes); the remaining bits hold the magnitude, big-endian. Encoding always
/// uses the minimal width.
impl Encode for u64 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v = *self;
		assert!(v <= MAX_VARINT, "varint too large");

		if v < (1 << 6) {
			w.put_u8(v as u8);
		} else if v < (1 << 14) {
			w.put_u16(0b01 << 14 | v as u16);
		} else if v < (1 << 30) {
			w.put_u32(0b10 << 30 | v as u32);
		} else {
			w.put_u64(0b11 << 62 | v);
		}
	}
}

impl Decode for u64 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		if !r.has_remaining() {
			return Err(DecodeError::Short);
		}

		let first = r.get_u8();
		let size = 1usize << (first >> 6);
		let mut v = (first & 0b0011_1111) as u64;

		if r.remaining() < size - 1 {
			return Err(DecodeError::Short);
		}

		for _ in 1..size {
			v = (v << 8) | r.get_u8() as u64;
		}

		Ok(v)
	}
}

impl Encode for usize {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		(*self as u64).encode(w)
	}
}

impl Decode for usize {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let v = u64::decode(r)?;
		v.try_into().map_err(|_| DecodeError::BoundsExceeded)
	}
}
