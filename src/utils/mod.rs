//! Utilities

pub mod benchmark;
