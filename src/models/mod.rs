//! Data models persisted by the service.
//!
//! They map to database tables via `sqlx::FromRow` and serialize as JSON via
//! `serde`.

pub mod video;
