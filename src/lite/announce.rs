use crate::{coding::*, Path};

/// Sent by the publisher when a broadcast becomes active or goes away.
///
/// Paths are relative to the requested prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Announce {
	Active { suffix: Path },
	Ended { suffix: Path },
}

impl Announce {
	pub fn suffix(&self) -> &Path {
		match self {
			Announce::Active { suffix } => suffix,
			Announce::Ended { suffix } => suffix,
		}
	}
}

impl Message for Announce {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(match AnnounceStatus::decode(r)? {
			AnnounceStatus::Active => Self::Active {
				suffix: Path::decode(r)?,
			},
			AnnounceStatus::Ended => Self::Ended {
				suffix: Path::decode(r)?,
			},
		})
	}

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Self::Active { suffix } => {
				AnnounceStatus::Active.encode(w);
				suffix.encode(w);
			}
			Self::Ended { suffix } => {
				AnnounceStatus::Ended.encode(w);
				suffix.encode(w);
			}
		}
	}
}

/// Sent by the subscriber to request announcements under a prefix.
#[derive(Clone, Debug)]
pub struct AnnouncePlease {
	pub prefix: Path,
}

impl Message for AnnouncePlease {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let prefix = Path::decode(r)?;
		Ok(Self { prefix })
	}

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.prefix.encode(w)
	}
}

#[derive(Clone, Copy, Debug)]
enum AnnounceStatus {
	Ended = 0,
	Active = 1,
}

impl Decode for AnnounceStatus {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match u8::decode(r)? {
			0 => Ok(Self::Ended),
			1 => Ok(Self::Active),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl Encode for AnnounceStatus {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		(*self as u8).encode(w)
	}
}

/// Sent first on an announce stream with every currently active path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceInit {
	/// Active broadcasts as suffixes, to be joined with the prefix.
	pub suffixes: Vec<Path>,
}

impl Message for AnnounceInit {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = u64::decode(r)?;

		// Don't trust the count for the allocation size.
		let mut suffixes = Vec::with_capacity(count.min(1024) as usize);

		for _ in 0..count {
			suffixes.push(Path::decode(r)?);
		}

		Ok(Self { suffixes })
	}

	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.suffixes.len().encode(w);
		for suffix in &self.suffixes {
			suffix.encode(w);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn announce_round_trip() {
		for msg in [
			Announce::Active {
				suffix: Path::new("alice"),
			},
			Announce::Ended {
				suffix: Path::new("bob/camera"),
			},
		] {
			let mut buf = BytesMut::new();
			Encode::encode(&msg, &mut buf);

			let decoded: Announce = Decode::decode(&mut buf.freeze()).unwrap();
			assert_eq!(decoded, msg);
		}
	}

	#[test]
	fn announce_init_round_trip() {
		let msg = AnnounceInit {
			suffixes: vec![Path::new("a"), Path::new("b/c")],
		};

		let mut buf = BytesMut::new();
		Encode::encode(&msg, &mut buf);

		let decoded: AnnounceInit = Decode::decode(&mut buf.freeze()).unwrap();
		assert_eq!(decoded, msg);
	}
}
