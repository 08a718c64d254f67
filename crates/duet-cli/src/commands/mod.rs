pub mod common;
pub mod conversation_id;
pub mod demo;
