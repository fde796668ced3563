use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagewatchError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
