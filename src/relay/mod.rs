//! Relay logic: commands, mention extraction and notification.
//!
//! Everything here works against [`ChatTransport`] and the registration
//! store, never against the bot library directly.

pub mod commands;
pub mod handler;
pub mod mentions;
pub mod resolver;
pub mod transport;

pub use handler::Relay;
pub use transport::ChatTransport;
