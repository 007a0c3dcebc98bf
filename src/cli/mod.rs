//! Command-line front end for `middled`

pub mod commands;

pub use commands::*;
