//! IETF moq-transport-14 track status messages

use std::borrow::Cow;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{coding::*, ietf::Message, Path};

use super::namespace::{decode_namespace, encode_namespace};

/// TrackStatusRequest message (0x0d), a one-shot state query.
#[derive(Clone, Debug)]
pub struct TrackStatusRequest<'a> {
	pub request_id: u64,
	pub track_namespace: Path,
	pub track_name: Cow<'a, str>,
}

impl<'a> Message for TrackStatusRequest<'a> {
	const ID: u64 = 0x0d;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		encode_namespace(w, &self.track_namespace);
		self.track_name.encode(w);
		0u8.encode(w); // subscriber priority
		0x02u8.encode(w); // group order: descending
		false.encode(w); // forward
		0x02u64.encode(w); // filter type: largest object
		0u8.encode(w); // no parameters
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		let track_namespace = decode_namespace(r)?;
		let track_name = Cow::<str>::decode(r)?;

		let _subscriber_priority = u8::decode(r)?;
		let _group_order = u8::decode(r)?;
		let _forward = bool::decode(r)?;
		let _filter_type = u64::decode(r)?;

		// Ignore parameters, who cares.
		let _params = Parameters::decode(r)?;

		Ok(Self {
			request_id,
			track_namespace,
			track_name,
		})
	}
}

/// TrackStatus message (0x0e), the answer to [TrackStatusRequest].
#[derive(Clone, Debug)]
pub struct TrackStatus {
	pub request_id: u64,
	pub status: TrackStatusCode,
}

impl Message for TrackStatus {
	const ID: u64 = 0x0e;

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.request_id.encode(w);
		self.status.encode(w);

		// The largest location; we don't track it, so always zero.
		0u64.encode(w);
		0u64.encode(w);

		0u8.encode(w); // no parameters
	}

	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let request_id = u64::decode(r)?;
		let status = TrackStatusCode::decode(r)?;

		let _largest_group = u64::decode(r)?;
		let _largest_object = u64::decode(r)?;

		// Ignore parameters, who cares.
		let _params = Parameters::decode(r)?;

		Ok(Self { request_id, status })
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum TrackStatusCode {
	InProgress = 0x00,
	NotFound = 0x01,
	NotAuthorized = 0x02,
	Ended = 0x03,
}

impl Encode for TrackStatusCode {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		u64::from(*self).encode(w);
	}
}

impl Decode for TrackStatusCode {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Self::try_from(u64::decode(r)?).map_err(|_| DecodeError::InvalidValue)
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
	fn track_status_request_round_trip() {
		let msg = TrackStatusRequest {
			request_id: 10,
			track_namespace: Path::new("room/a"),
			track_name: "video".into(),
		};

		let decoded: TrackStatusRequest = decode_message(&encode_message(&msg)).unwrap();

		assert_eq!(decoded.request_id, 10);
		assert_eq!(decoded.track_namespace.as_str(), "room/a");
		assert_eq!(decoded.track_name, "video");
	}

	#[test]
	fn track_status_round_trip() {
		for status in [
			TrackStatusCode::InProgress,
			TrackStatusCode::NotFound,
			TrackStatusCode::NotAuthorized,
			TrackStatusCode::Ended,
		] {
			let msg = TrackStatus { request_id: 11, status };

			let decoded: TrackStatus = decode_message(&encode_message(&msg)).unwrap();
			assert_eq!(decoded.request_id, 11);
			assert_eq!(decoded.status, status);
		}
	}

	#[test]
	fn track_status_rejects_unknown_code() {
		#[rustfmt::skip]
		let invalid_bytes = vec![
			0x0b, // request_id
			0x09, // INVALID status code
			0x00, 0x00, // largest location
			0x00, // num_params
		];

		let result: Result<TrackStatus, _> = decode_message(&invalid_bytes);
		assert!(matches!(result, Err(DecodeError::InvalidValue)));
	}
}
