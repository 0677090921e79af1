//! Integration with the StudyBuddy REST backend.

pub mod adapters;
pub mod client;
pub mod dto;
