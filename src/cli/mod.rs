//! CLI module
//!
//! Command-line interface over the async session.
//!
//! # Commands
//!
//! - `get` - GET a resource, optionally following pages
//! - `post` - POST a JSON body
//! - `put` - PUT a JSON body
//! - `delete` - DELETE a resource

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
