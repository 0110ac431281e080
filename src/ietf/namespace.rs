use crate::{coding::*, Path};

const MAX_COMPONENTS: usize = 32;

// The draft encodes a namespace as a tuple of strings; we flatten it to a Path.

pub(super) fn encode_namespace<W: bytes::BufMut>(w: &mut W, namespace: &Path) {
	let count = namespace.components().count();
	count.encode(w);

	for component in namespace.components() {
		component.encode(w);
	}
}

pub(super) fn decode_namespace<R: bytes::Buf>(r: &mut R) -> Result<Path, DecodeError> {
	let count = usize::decode(r)?;
	if count > MAX_COMPONENTS {
		return Err(DecodeError::TooMany);
	}

	let mut path = Path::default();
	for _ in 0..count {
		let component = String::decode(r)?;
		path = path.join(&component);
	}

	Ok(path)
}
