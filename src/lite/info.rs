use crate::coding::*;

/// Periodic session feedback from the server, currently just a bitrate
/// estimate. The values are logged and otherwise ignored.
#[derive(Clone, Debug)]
pub struct SessionUpdate {
	pub bitrate: u64,
}

impl Message for SessionUpdate {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let bitrate = u64::decode(r)?;
		Ok(Self { bitrate })
	}

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.bitrate.encode(w);
	}
}
