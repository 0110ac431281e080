//! The lite wire variant: varint length framing, a stream per request.
//!
//! There's no single control stream; announcements and subscriptions each
//! ride their own bidirectional stream, and groups ride unidirectional
//! streams, all carrying length-prefixed messages.

mod announce;
mod group;
mod info;
mod publisher;
mod session;
mod stream;
mod subscribe;
mod subscriber;

pub use announce::*;
pub use group::*;
pub use info::*;
pub use stream::*;
pub use subscribe::*;

pub(crate) use session::*;

use publisher::*;
use subscriber::*;
