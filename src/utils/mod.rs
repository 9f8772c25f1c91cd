//! Shared utilities with no analysis semantics of their own.

pub mod graph;
