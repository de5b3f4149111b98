#![deny(missing_docs, missing_debug_implementations)]

//! A sans-IO implementation of the AMQP 1.0 transport
//!
//! - [`frames`]: frame layout and the [`FrameCodec`](frames::FrameCodec)
//! - [`transport`]: protocol header
//! - [`connection`], [`session`], [`link`]: endpoint state machines
//! - [`driver`]: a tokio pump for a [`Connection`]
//!
//! Inbound bytes go through [`Connection::process`], which returns [`Event`]s. Outbound
//! frames are appended to the [`OutgoingBuffer`].

pub mod connection;
pub mod driver;
pub mod event;
pub mod frames;
pub mod link;
pub mod outgoing;
pub mod session;
pub mod transport;

pub use connection::Connection;
pub use event::Event;
pub use link::{Acceptance, Delivery, LinkId, SendOutcome, Sendable, SettleReason};
pub use outgoing::OutgoingBuffer;
pub use session::SessionId;

pub use ferrum_types as types;
