use std::borrow::Cow;

use crate::{coding::*, ietf::Message};

/// PublishDone message (0x0b), formerly SubscribeDone.
///
/// Sent by the publisher when a subscription ends, cleanly (status 200) or
/// not.
#[derive(Clone, Debug)]
pub struct PublishDone<'a> {
	pub request_id: u64,
	pub status_code: u64,
	pub reason_phrase: Cow<'a, str>,
}

impl<'a> Message for PublishDone<'a> {
	const ID: u64 = 0x0b;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.status_code.encode(w);
		self.reason_phrase.encode(w);
		0u64.encode(w); // stream count unsupported
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		let status_code = u64::decode(r)?;
		let reason_phrase = Cow::<str>::decode(r)?;
		let _stream_count = u64::decode(r)?;

		Ok(Self {
			request_id,
			status_code,
			reason_phrase,
		})
	}
}

// Publisher-initiated subscriptions are unsupported; receipt of any of these
// is fatal, so only the ids matter.

pub struct Publish {}
impl Publish {
	pub const ID: u64 = 0x1d;
}

pub struct PublishOk {}
impl PublishOk {
	pub const ID: u64 = 0x1e;
}

pub struct PublishError {}
impl PublishError {
	pub const ID: u64 = 0x1f;
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	fn encode_message<M: Message>(msg: &M) -> Vec<u8> {
		let mut buf = BytesMut::new();
		msg.encode(&mut buf);
		buf.to_vec()
	}

	fn decode_message<M: Message>(bytes: &[u8]) -> Result<M, DecodeError> {
		let mut buf = bytes::Bytes::copy_from_slice(bytes);
		M::decode(&mut buf)
	}

	#[test]
	fn publish_done_round_trip() {
		let msg = PublishDone {
			request_id: 6,
			status_code: 200,
			reason_phrase: "OK".into(),
		};

		let decoded: PublishDone = decode_message(&encode_message(&msg)).unwrap();

		assert_eq!(decoded.request_id, 6);
		assert_eq!(decoded.status_code, 200);
		assert_eq!(decoded.reason_phrase, "OK");
	}
}
