/// `ask` command: send a prompt (plus optional context) to a model.
pub mod ask;
/// `config` command: validate the local config file.
pub mod config;
