//! Core data models for the Trinket market/booth service.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod booth;
pub mod market;
