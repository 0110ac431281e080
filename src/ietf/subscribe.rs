//! IETF moq-transport-14 subscribe messages

use std::borrow::Cow;

use crate::{coding::*, ietf::Message, Path};

use super::namespace::{decode_namespace, encode_namespace};

// We only send Largest Object (0x2), but accept Latest Group (0x1) too.
const FILTER_LARGEST_OBJECT: u8 = 0x02;
const FILTER_LATEST_GROUP: u8 = 0x01;

// We only support Group Order descending (0x02); 0x00 means "don't care".
const GROUP_ORDER_DESCENDING: u8 = 0x02;

/// Subscribe message (0x03)
/// Sent by the subscriber to request all future objects for the given track.
#[derive(Clone, Debug)]
pub struct Subscribe<'a> {
	pub request_id: u64,
	pub track_namespace: Path,
	pub track_name: Cow<'a, str>,
	pub subscriber_priority: u8,
}

impl<'a> Message for Subscribe<'a> {
	const ID: u64 = 0x03;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		encode_namespace(w, &self.track_namespace);
		self.track_name.encode(w);
		self.subscriber_priority.encode(w);
		GROUP_ORDER_DESCENDING.encode(w);
		true.encode(w); // forward
		FILTER_LARGEST_OBJECT.encode(w);
		0u8.encode(w); // no parameters
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		let track_namespace = decode_namespace(r)?;
		let track_name = Cow::<str>::decode(r)?;
		let subscriber_priority = u8::decode(r)?;

		// We always deliver descending; 0 means the subscriber doesn't care.
		let group_order = u8::decode(r)?;
		if group_order != 0 && group_order != GROUP_ORDER_DESCENDING {
			return Err(DecodeError::Unsupported);
		}

		let forward = bool::decode(r)?;
		if !forward {
			return Err(DecodeError::Unsupported);
		}

		let filter_type = u8::decode(r)?;
		if filter_type != FILTER_LATEST_GROUP && filter_type != FILTER_LARGEST_OBJECT {
			return Err(DecodeError::Unsupported);
		}

		// Ignore parameters, who cares.
		let _params = Parameters::decode(r)?;

		Ok(Self {
			request_id,
			track_namespace,
			track_name,
			subscriber_priority,
		})
	}
}

/// SubscribeOk message (0x04)
#[derive(Clone, Debug)]
pub struct SubscribeOk {
	pub request_id: u64,
}

impl Message for SubscribeOk {
	const ID: u64 = 0x04;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.request_id.encode(w); // track_alias == request_id, always
		0u64.encode(w); // expires = 0
		GROUP_ORDER_DESCENDING.encode(w);
		false.encode(w); // no content
		0u8.encode(w); // no parameters
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;

		// We don't support track aliases; they must mirror the request id.
		let track_alias = u64::decode(r)?;
		if track_alias != request_id {
			return Err(DecodeError::Unsupported);
		}

		let expires = u64::decode(r)?;
		if expires != 0 {
			return Err(DecodeError::Unsupported);
		}

		// Ignore group order, who cares.
		let _group_order = u8::decode(r)?;

		// The largest location, present only if content exists.
		if bool::decode(r)? {
			let _group = u64::decode(r)?;
			let _object = u64::decode(r)?;
		}

		// Ignore parameters, who cares.
		let _params = Parameters::decode(r)?;

		Ok(Self { request_id })
	}
}

/// SubscribeError message (0x05)
#[derive(Clone, Debug)]
pub struct SubscribeError<'a> {
	pub request_id: u64,
	pub error_code: u64,
	pub reason_phrase: Cow<'a, str>,
}

impl<'a> Message for SubscribeError<'a> {
	const ID: u64 = 0x05;

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

/// Unsubscribe message (0x0a)
#[derive(Clone, Debug)]
pub struct Unsubscribe {
	pub request_id: u64,
}

impl Message for Unsubscribe {
	const ID: u64 = 0x0a;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		Ok(Self { request_id })
	}
}

/// SubscribeUpdate (0x02); receipt is a fatal error.
pub struct SubscribeUpdate {}

impl SubscribeUpdate {
	pub const ID: u64 = 0x02;
}
