// Random-access retrieval is unsupported; receipt of any of these is fatal,
// so only the ids matter.

pub struct Fetch {}
impl Fetch {
	pub const ID: u64 = 0x16;
}

pub struct FetchCancel {}
impl FetchCancel {
	pub const ID: u64 = 0x17;
}

pub struct FetchOk {}
impl FetchOk {
	pub const ID: u64 = 0x18;
}

pub struct FetchError {}
impl FetchError {
	pub const ID: u64 = 0x19;
}

/// The stream type of a fetch data stream, rejected on receipt.
pub struct FetchHeader {}
impl FetchHeader {
	pub const TYPE: u64 = 0x05;
}
