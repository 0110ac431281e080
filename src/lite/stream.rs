use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::coding::*;

/// The first varint on a bidirectional stream, selecting its purpose.
#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum ControlType {
	Session = 0,
	Announce = 1,
	Subscribe = 2,

	// The setup handshake reuses the IETF CLIENT_SETUP/SERVER_SETUP ids so a
	// single stream can negotiate either variant.
	ClientCompat = 0x20,
	ServerCompat = 0x21,
}

impl Decode for ControlType {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let t = u64::decode(r)?;
		t.try_into().map_err(|_| DecodeError::InvalidMessage(t))
	}
}

impl Encode for ControlType {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v: u64 = (*self).into();
		v.encode(w)
	}
}

/// The first varint on a unidirectional stream.
#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum DataType {
	Group = 0,
}

impl Decode for DataType {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let t = u64::decode(r)?;
		t.try_into().map_err(|_| DecodeError::InvalidMessage(t))
	}
}

impl Encode for DataType {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v: u64 = (*self).into();
		v.encode(w)
	}
}
