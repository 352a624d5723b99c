//! Domain models for Flagtrail.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod event;
pub mod webhook;
