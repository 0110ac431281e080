use crate::coding::{Decode, DecodeError, Encode};

const SUBGROUP_ID: u8 = 0x0;

/// The header starting every object stream: a stream type in `[0x10, 0x1f]`
/// whose low four bits are feature flags, then the subscription and group ids.
///
/// Frames follow the header directly; see the publisher/subscriber for the
/// object layout since it depends on these flags.
pub struct GroupHeader {
	pub request_id: u64,
	pub group_id: u64,

	// Each object carries extensions.
	pub has_extensions: bool,

	// There's an explicit subgroup id on the wire.
	pub has_subgroup: bool,

	// Use the first object id as the subgroup id.
	// Not compatible with has_subgroup.
	pub has_subgroup_object: bool,

	// The stream FIN doubles as the end marker.
	pub has_end: bool,
}

impl Encode for GroupHeader {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		assert!(
			!self.has_subgroup || !self.has_subgroup_object,
			"has_subgroup and has_subgroup_object cannot be true at the same time"
		);

		let mut id: u64 = 0x10;
		if self.has_extensions {
			id |= 0x01;
		}
		if self.has_subgroup {
			id |= 0x02;
		}
		if self.has_subgroup_object {
			id |= 0x04;
		}
		if self.has_end {
			id |= 0x08;
		}
		id.encode(w);

		self.request_id.encode(w);
		self.group_id.encode(w);

		if self.has_subgroup {
			SUBGROUP_ID.encode(w);
		}

		// Publisher priority.
		0u8.encode(w);
	}
}

impl Decode for GroupHeader {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let id = u64::decode(r)?;
		if !(0x10..=0x1f).contains(&id) {
			return Err(DecodeError::InvalidValue);
		}

		let has_extensions = (id & 0x01) != 0;
		let has_subgroup = (id & 0x02) != 0;
		let has_subgroup_object = (id & 0x04) != 0;
		let has_end = (id & 0x08) != 0;

		if has_subgroup && has_subgroup_object {
			return Err(DecodeError::InvalidValue);
		}

		let request_id = u64::decode(r)?;
		let group_id = u64::decode(r)?;

		if has_subgroup {
			let subgroup_id = u8::decode(r)?;
			if subgroup_id != SUBGROUP_ID {
				return Err(DecodeError::Unsupported);
			}
		}

		let _publisher_priority = u8::decode(r)?;

		Ok(Self {
			request_id,
			group_id,
			has_extensions,
			has_subgroup,
			has_subgroup_object,
			has_end,
		})
	}
}

/// The object status carried by zero-length frames.
///
/// An end-of-group sometimes arrives as status 0 rather than 3 depending on
/// the server; both are accepted.
pub const OBJECT_STATUS_NORMAL: u64 = 0x00;
pub const OBJECT_STATUS_GROUP_END: u64 = 0x03;
