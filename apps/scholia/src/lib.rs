//! # scholia
//!
//! Command-line front end for the Scholia research knowledge base.
//!
//! - `cli`: argument parsing and command implementations
//! - `config`: `scholia.toml` loading and overrides

pub mod cli;
pub mod config;
