//! Configuration module for parthash
//!
//! Provides configuration management including CLI arguments,
//! config files, and runtime hashing settings.

mod settings;

pub use settings::*;
