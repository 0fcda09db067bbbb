//! Ranklist PostgreSQL Store
//!
//! A [`ranklist_storage::RankStore`] backed by PostgreSQL through a
//! deadpool-postgres connection pool. Row locks on the container serialize
//! concurrent mutations of one container; different containers proceed in
//! parallel.

pub mod config;
mod error;
pub mod schema;
pub mod store;

pub use config::DbConfig;
pub use schema::SCHEMA;
pub use store::{PgRankStore, PgTransaction};
