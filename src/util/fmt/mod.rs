//! Human readable renditions of compiler data.
//!
//! Diagnostics implement [`std::fmt::Display`]. The alternate form (`{:#}`)
//! prefixes the message with the byte range it refers to.

pub mod error;
pub mod tree;
