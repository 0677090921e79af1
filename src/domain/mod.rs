//! Domain layer: core entities and business rules.

pub mod chat_session_state;
pub mod conversation;
pub mod conversation_list_state;
pub mod feed;
pub mod group;
pub mod message;
pub mod notice;
pub mod placeholders;
pub mod session;
pub mod upload;
