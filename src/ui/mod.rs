//! UI layer: plain-text rendering for the command line.

pub mod feed_rendering;
pub mod message_rendering;
