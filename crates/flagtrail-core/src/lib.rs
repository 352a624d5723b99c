//! Flagtrail Core: domain models, error taxonomy, repository and
//! collaborator traits, the query filter builder and delta reconstruction.

pub mod error;
pub mod models;
pub mod notifier;
pub mod query;
pub mod reconstruct;
pub mod repository;

pub use error::{FlagtrailError, FlagtrailResult};
