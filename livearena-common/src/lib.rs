//! # LiveArena Common Library
//!
//! Shared code for the LiveArena services including:
//! - Event types (ArenaEvent enum) and the EventBus
//! - Configuration file resolution and loading
//! - Server-Sent Events helpers
//! - Utility functions

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
