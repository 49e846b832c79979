//! I/O helpers: config, directories, child processes, prompts.

pub mod config;
pub mod dirs;
pub mod package;
pub mod process;
pub mod prompt;
pub mod runtime;
