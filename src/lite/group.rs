use crate::coding::*;

/// The header starting every group stream.
///
/// Frames follow as `size varint ‖ payload`; the stream FIN ends the group.
#[derive(Clone, Debug)]
pub struct Group {
	/// The subscription this group belongs to.
	pub subscribe: u64,

	/// The sequence number within the track.
	pub sequence: u64,
}

impl Message for Group {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let subscribe = u64::decode(r)?;
		let sequence = u64::decode(r)?;

		Ok(Self { subscribe, sequence })
	}

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.subscribe.encode(w);
		self.sequence.encode(w);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn round_trip() {
		let msg = Group {
			subscribe: 9,
			sequence: 1000,
		};

		let mut buf = BytesMut::new();
		Encode::encode(&msg, &mut buf);

		let decoded: Group = Decode::decode(&mut buf.freeze()).unwrap();
		assert_eq!(decoded.subscribe, 9);
		assert_eq!(decoded.sequence, 1000);
	}
}
