pub mod hourly;
pub mod participant;
pub mod read_through;
pub mod total;

pub use self::read_through::{StatKind, StatsService};
