use crate::{coding::*, ietf::Message};

/// MaxRequestId message (0x15), advertising the peer's request-id window.
///
/// We advertise a huge window at startup and ignore whatever the peer
/// advertises; the allocator is not flow controlled.
#[derive(Clone, Debug)]
pub struct MaxRequestId {
	pub request_id: u64,
}

impl Message for MaxRequestId {
	const ID: u64 = 0x15;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		Ok(Self { request_id })
	}
}

/// RequestsBlocked message (0x1a)
#[derive(Clone, Debug)]
pub struct RequestsBlocked {
	pub request_id: u64,
}

impl Message for RequestsBlocked {
	const ID: u64 = 0x1a;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		Ok(Self { request_id })
	}
}
