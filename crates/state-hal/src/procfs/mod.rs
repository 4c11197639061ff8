//! Parsers for `/proc` text files.

pub mod mounts;
