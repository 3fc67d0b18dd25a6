//! Queries against the hosted database, one module per table.

pub mod activities;
pub mod care_summary;
pub mod organisations;
pub mod seniors;
pub mod volunteers;
