//! The messages exchanged in an agent conversation.
//!
//! Every message is a [`message::RoledMessage`] over a content type: the
//! instruction, system, assistant and action kinds each own a typed content
//! struct, while generic messages keep their content in a [`note::Note`]. Messages
//! are persisted as ordered dictionaries tagged with `lion_class`, and
//! [`registry::Message`] loads any of them back. The provider-facing form
//! of a message is its [`content::ChatMessage`].
pub mod action_request;
pub mod action_response;
pub mod assistant;
pub mod content;
pub mod id;
pub mod instruction;
pub mod log;
pub mod message;
pub mod note;
pub mod registry;
pub mod request_model;
pub mod role;
pub mod system;
