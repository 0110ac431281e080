use std::sync::Arc;

use crate::coding::{DecodeError, Versions};

/// Every error that can surface from a MoQ session.
///
/// Transport and decode failures are fatal to the session; the remaining
/// variants are scoped to a single subscription, track, or group.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	/// The underlying QUIC/WebTransport session or stream failed.
	#[error("transport error: {0}")]
	Transport(Arc<dyn std::error::Error + Send + Sync>),

	/// A message or primitive failed to decode.
	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	/// The peer sent a control message with a type we don't recognize.
	#[error("unexpected message")]
	UnexpectedMessage,

	/// The peer opened a stream with a type we don't recognize.
	#[error("unexpected stream")]
	UnexpectedStream,

	/// The peer used a feature we intentionally don't support.
	#[error("unsupported")]
	Unsupported,

	/// No mutually supported version.
	#[error("unsupported versions: offered={0:?} supported={1:?}")]
	Version(Versions, Versions),

	/// The broadcast/track/group was not found.
	#[error("not found")]
	NotFound,

	/// The broadcast/track was already announced or subscribed.
	#[error("duplicate")]
	Duplicate,

	/// The operation was cancelled, usually because the other side went away.
	#[error("cancelled")]
	Cancel,

	/// A group arrived too late to be useful.
	#[error("group expired")]
	Old,

	/// An ietf control message payload exceeded the 16-bit length prefix.
	#[error("message too large")]
	TooLarge,

	/// The peer rejected or terminated a request with an application status.
	#[error("peer status {code}: {reason}")]
	Peer { code: u64, reason: String },
}

impl Error {
	/// The QUIC application error code used when resetting a stream or
	/// closing the session because of this error.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Transport(_) => 0x00,
			Self::Cancel => 0x01,
			Self::Decode(_) => 0x02,
			Self::UnexpectedMessage => 0x03,
			Self::UnexpectedStream => 0x04,
			Self::Unsupported => 0x05,
			Self::Version(..) => 0x06,
			Self::NotFound => 0x07,
			Self::Duplicate => 0x08,
			Self::Old => 0x09,
			Self::TooLarge => 0x0a,
			Self::Peer { .. } => 0x0b,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
