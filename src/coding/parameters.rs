use std::collections::HashMap;

use crate::coding::*;

const MAX_PARAMS: u64 = 64;

/// A key/value extension map carried by setup and subscribe messages.
///
/// Encoded as a count followed by `(id varint, length varint, bytes)` entries.
/// Duplicate ids are a fatal decode error.
#[derive(Default, Debug, Clone)]
pub struct Parameters(HashMap<u64, Vec<u8>>);

impl Decode for Parameters {
	fn decode<R: bytes::Buf>(mut r: &mut R) -> Result<Self, DecodeError> {
		let mut map = HashMap::new();

		let count = u64::decode(r)?;
		if count > MAX_PARAMS {
			return Err(DecodeError::TooMany);
		}

		for _ in 0..count {
			let kind = u64::decode(r)?;
			if map.contains_key(&kind) {
				return Err(DecodeError::Duplicate);
			}

			let data = Vec::<u8>::decode(&mut r)?;
			map.insert(kind, data);
		}

		Ok(Parameters(map))
	}
}

impl Encode for Parameters {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.0.len().encode(w);

		for (kind, value) in self.0.iter() {
			kind.encode(w);
			value.encode(w);
		}
	}
}

impl Parameters {
	pub fn get(&self, kind: u64) -> Option<&Vec<u8>> {
		self.0.get(&kind)
	}

	pub fn set(&mut self, kind: u64, value: Vec<u8>) {
		self.0.insert(kind, value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::{Bytes, BytesMut};

	#[test]
	fn round_trip() {
		let mut params = Parameters::default();
		params.set(0, vec![0x03]);
		params.set(77, vec![1, 2, 3, 4]);

		let mut buf = BytesMut::new();
		params.encode(&mut buf);

		let decoded = Parameters::decode(&mut buf.freeze()).unwrap();
		assert_eq!(decoded.get(0), Some(&vec![0x03]));
		assert_eq!(decoded.get(77), Some(&vec![1, 2, 3, 4]));
		assert_eq!(decoded.get(1), None);
	}

	#[test]
	fn duplicate() {
		#[rustfmt::skip]
		let buf = [
			0x02, // count
			0x05, 0x01, 0xaa, // id=5
			0x05, 0x01, 0xbb, // id=5 again
		];

		let res = Parameters::decode(&mut Bytes::copy_from_slice(&buf));
		assert!(matches!(res, Err(DecodeError::Duplicate)));
	}

	#[test]
	fn too_many() {
		let mut buf = BytesMut::new();
		(MAX_PARAMS + 1).encode(&mut buf);

		let res = Parameters::decode(&mut buf.freeze());
		assert!(matches!(res, Err(DecodeError::TooMany)));
	}
}
