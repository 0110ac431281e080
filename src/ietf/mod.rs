//! The IETF `draft-ietf-moq-transport-14` wire variant.
//!
//! Control messages ride a single bidirectional stream as
//! `type varint ‖ u16 length ‖ payload`; each group of objects rides its own
//! unidirectional stream.

mod control;
mod fetch;
mod goaway;
mod group;
mod message;
mod namespace;
mod publish;
mod publish_namespace;
mod publisher;
mod request;
mod session;
mod setup;
mod subscribe;
mod subscribe_namespace;
mod subscriber;
mod track_status;

pub use fetch::*;
pub use goaway::*;
pub use group::*;
pub use message::*;
pub use publish::*;
pub use publish_namespace::*;
pub use request::*;
pub use setup::*;
pub use subscribe::*;
pub use subscribe_namespace::*;
pub use track_status::*;

pub(crate) use control::*;
pub(crate) use publisher::*;
pub(crate) use session::*;
pub(crate) use subscriber::*;
