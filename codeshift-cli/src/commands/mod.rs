//! Command implementations for the codeshift CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod batch;
pub mod release;
