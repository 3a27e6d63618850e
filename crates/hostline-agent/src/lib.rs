//! Protocol layer for the cloud voice-agent socket: event decoding, the
//! settings handshake payload, tool-call validation, and the client
//! connection itself.

pub mod client;
pub mod error;
pub mod event;
pub mod settings;
pub mod toolcall;

pub use client::{connect, AgentStream};
pub use error::AgentError;
pub use event::{AgentEvent, FunctionCall, FunctionCallResponse};
pub use settings::SettingsMessage;
pub use toolcall::validate_tool_call;
