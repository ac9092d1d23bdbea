pub mod backup;
pub mod config;
pub mod error;
pub mod forecast;
pub mod history;
pub mod models;
pub mod parse;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod weights;

pub use error::{InsufficientDataError, ValidationError};
pub use history::{HistoryStore, Verdict, classify};
pub use models::{Category, CategoryRatings, Rating, RatingEntry};
pub use session::Session;
pub use weights::{PairwiseMatrix, WeightVector, compute_weights};
