use thiserror::Error;

/// Reasons a day's rating cannot be accepted. Nothing is persisted when one of
/// these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a date is required")]
    MissingDate,
    #[error("at least one category must be rated")]
    NothingRated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough history to forecast: have {available} entries, need at least {required}")]
pub struct InsufficientDataError {
    pub required: usize,
    pub available: usize,
}
