//! Chat layer between a transport and the engine.
//!
//! ```text
//! text ──► Command::parse ──► CommandHandler ──► store / engine ──► reply
//!    └──► (free text) ChatService::handle_message ──► engine.respond
//!                                                 └──► store interaction + snapshot
//! ```

pub mod commands;
pub mod service;

pub use commands::{Command, CommandHandler};
pub use service::ChatService;
