//! Core types for streambridge.

pub mod message;
pub mod upstream;

pub use message::*;
pub use upstream::*;
