pub mod capability;
pub mod cli;
pub mod command;
pub mod config;
pub mod handler;
pub mod http;
pub mod localization;
pub mod session;
pub mod watcher;
