//! IETF moq-transport-14 subscribe namespace messages

use std::borrow::Cow;

use crate::{coding::*, ietf::Message, Path};

use super::namespace::{decode_namespace, encode_namespace};

/// SubscribeNamespace message (0x11)
/// Sent by the subscriber to request announcements under a prefix.
#[derive(Clone, Debug)]
pub struct SubscribeNamespace {
	pub namespace: Path,
	pub request_id: u64,
}

impl Message for SubscribeNamespace {
	const ID: u64 = 0x11;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		encode_namespace(w, &self.namespace);
		self.request_id.encode(w);
		0u8.encode(w); // no parameters
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let namespace = decode_namespace(r)?;
		let request_id = u64::decode(r)?;

		// Ignore parameters, who cares.
		let _params = Parameters::decode(r)?;

		Ok(Self { namespace, request_id })
	}
}

/// SubscribeNamespaceOk message (0x12)
#[derive(Clone, Debug)]
pub struct SubscribeNamespaceOk {
	pub request_id: u64,
}

impl Message for SubscribeNamespaceOk {
	const ID: u64 = 0x12;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		Ok(Self { request_id })
	}
}

/// SubscribeNamespaceError message (0x13)
#[derive(Clone, Debug)]
pub struct SubscribeNamespaceError<'a> {
	pub request_id: u64,
	pub error_code: u64,
	pub reason_phrase: Cow<'a, str>,
}

impl<'a> Message for SubscribeNamespaceError<'a> {
	const ID: u64 = 0x13;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.error_code.encode(w);
		self.reason_phrase.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		let error_code = u64::decode(r)?;
		let reason_phrase = Cow::<str>::decode(r)?;

		Ok(Self {
			request_id,
			error_code,
			reason_phrase,
		})
	}
}

/// UnsubscribeNamespace message (0x14)
#[derive(Clone, Debug)]
pub struct UnsubscribeNamespace {
	pub request_id: u64,
}

impl Message for UnsubscribeNamespace {
	const ID: u64 = 0x14;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		Ok(Self { request_id })
	}
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
	fn subscribe_namespace_round_trip() {
		let msg = SubscribeNamespace {
			namespace: Path::new("room"),
			request_id: 8,
		};

		let decoded: SubscribeNamespace = decode_message(&encode_message(&msg)).unwrap();

		assert_eq!(decoded.namespace.as_str(), "room");
		assert_eq!(decoded.request_id, 8);
	}

	#[test]
	fn unsubscribe_namespace_round_trip() {
		let msg = UnsubscribeNamespace { request_id: 8 };

		let decoded: UnsubscribeNamespace = decode_message(&encode_message(&msg)).unwrap();
		assert_eq!(decoded.request_id, 8);
	}
}
