pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod stats;

pub use error::{BoxError, StatsError};
pub use stats::{StatKind, StatsService};
