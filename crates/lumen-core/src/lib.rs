//! # lumen-core
//!
//! Foundation types, branded IDs, and utilities shared by every Lumen crate.
//!
//! - **Branded IDs**: [`ids::UserId`], [`ids::ConversationId`],
//!   [`ids::MessageId`] as newtypes for type safety
//! - **Messages**: [`messages::ChatMessage`] with user/assistant roles
//! - **Constants**: conversation-core defaults shared across crates
//! - **Text utilities**: truncation and token estimation
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod text;

pub use ids::{ConversationId, MessageId, UserId};
pub use messages::{ChatMessage, Role};
