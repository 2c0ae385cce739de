//! OpenRouter chat-completions integration.
//!
//! The module contains the typed request/response wrappers, the sampling
//! parameter set, and the client used by CLI commands.

/// Chat-completions client and wire types.
pub mod client;
/// Validated sampling parameter set.
pub mod params;
