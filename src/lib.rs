//! Confluence container entrypoint library
//!
//! This module exports the resolver, writer and hand-off components for
//! testing and integration.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod fields;
pub mod format;
pub mod launch;
pub mod logging;
pub mod resolver;
pub mod sanitize;
pub mod version;
pub mod writer;
