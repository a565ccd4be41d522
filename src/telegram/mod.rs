//! Telegram integration.
//!
//! Connects the relay to the Telegram Bot API through teloxide.

pub mod adapter;
pub mod client;

pub use client::{StopReason, TelegramBotBuilder};
