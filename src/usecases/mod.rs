//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod chat_session;
pub mod context;
pub mod conversations;
pub mod list_resources;
pub mod load_feed;
pub mod load_messages;
pub mod login;
pub mod logout;
pub mod membership;
pub mod send_message;
pub mod upload_document;
