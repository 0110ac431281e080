//! # moq-client: Media over QUIC for clients
//!
//! A client-side implementation of the Media over QUIC (MoQ) transport,
//! speaking two wire variants over a single WebTransport/QUIC session:
//!
//! - `lite`: a minimal variant with varint length framing and a stream per
//!   request, optimized for practical deployment.
//! - `ietf`: the IETF `draft-ietf-moq-transport-14` variant with typed
//!   control messages on a single bidirectional control stream.
//!
//! The variant is negotiated during the setup handshake; everything above the
//! wire (broadcasts, tracks, groups, frames) is shared.
//!
//! ## Overview
//!
//! MoQ is a pub/sub protocol built on top of QUIC. A broadcast is a named
//! collection of [Track]s, each an ordered sequence of [Group]s, each an
//! ordered sequence of frames. Groups are delivered newest-first; each group
//! rides its own unidirectional stream so losing one never stalls another.
//!
//! To publish:
//! - [BroadcastProducer::new] to create a broadcast, then [Session::publish].
//! - [BroadcastProducer::create] to add a [TrackProducer] for each track.
//! - [TrackProducer::append_group] for each group of frames.
//! - [GroupProducer::write_frame] for each encoded frame.
//!
//! To consume:
//! - [Session::announced] to discover broadcasts as they are announced.
//! - [Session::consume] then [BroadcastConsumer::subscribe] for a track.
//! - [TrackConsumer::next_group] / [GroupConsumer::read_frame] to read.

mod error;
mod model;
mod path;
mod session;

pub mod coding;
pub mod ietf;
pub mod lite;
pub mod signals;

#[cfg(test)]
mod mock;

pub use error::*;
pub use model::*;
pub use path::*;
pub use session::*;
