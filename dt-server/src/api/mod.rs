//! HTTP handlers.
//!
//! Every endpoint answers with the `{code, message, data, trace_id,
//! timestamp}` envelope. Authentication and signature verification have
//! already happened upstream; the platform identity arrives as trusted
//! headers.

pub mod bet;
pub mod draw;
pub mod error;
pub mod extractors;
pub mod game_event;
pub mod round;
pub mod user;

pub use error::{failure, success};
