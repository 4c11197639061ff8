//! Helpers for `/sys` block device attributes.

pub mod block;
