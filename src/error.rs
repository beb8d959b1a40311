use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Voting round {0} not found")]
    RoundNotFound(i64),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] BoxError),
}

impl StatsError {
    pub fn store(err: BoxError) -> Self {
        StatsError::StoreUnavailable(err)
    }
}
