//! Deterministic, pure preparation logic.
//!
//! Core modules never touch the filesystem or the global process
//! environment. They take explicit values and return new ones.

pub mod environment;
pub mod execution_mode;
pub mod path_list;
pub mod prepare;
pub mod run_config;
pub mod version;
