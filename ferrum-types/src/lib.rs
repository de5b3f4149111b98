#![deny(missing_docs, missing_debug_implementations)]

//! AMQP 1.0 data types
//!
//! - [`definitions`]: part 2.8 definitions and error conditions
//! - [`performatives`]: part 2.7 performatives
//! - [`messaging`]: part 3 termini and delivery states
//! - [`registry`]: static field tables and descriptor lookup

#[macro_use]
mod macros;

pub mod composite;
pub mod definitions;
pub mod messaging;
pub mod performatives;
pub mod registry;

pub use composite::Composite;
