//! Ask OpenRouter-hosted models from the command line, optionally grounding
//! the question with context extracted from local documents or web pages.

/// CLI command implementations.
pub mod commands;
/// Local config file (profiles) handling.
pub mod config;
/// Context ingestion: files, office documents, and web pages.
pub mod context;
/// OpenRouter chat-completions client and sampling parameters.
pub mod openrouter;
/// Colored terminal output helpers.
pub mod ui;
