use crate::backup::snapshot;
use crate::config::AppConfig;
use crate::error::InsufficientDataError;
use crate::forecast::{Forecast, forecast};
use crate::history::{HistoryStore, SeriesPoint, SeriesSelection, series};
use crate::models::{CategoryRatings, RatingEntry};
use crate::scoring::{CategoryAverages, averages_by_category, build_entry};
use crate::storage::{
    JsonFileStore, KeyValueStore, load_history, load_theme, load_weights, save_history,
    save_theme, save_weights,
};
use crate::weights::{PairwiseMatrix, WeightVector, compute_weights};
use anyhow::Result;
use chrono::NaiveDate;

/// State of one run: the loaded history and current weights, plus the store
/// they are written back to. Every mutation is validated first and persisted
/// before the in-memory state changes, so a failure leaves both untouched.
pub struct Session<S: KeyValueStore = JsonFileStore> {
    config: AppConfig,
    store: S,
    history: HistoryStore,
    weights: WeightVector,
}

impl Session<JsonFileStore> {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = JsonFileStore::open(&config.settings.paths.store_json)?;
        Self::open_with(config, store)
    }
}

impl<S: KeyValueStore> Session<S> {
    pub fn open_with(config: AppConfig, store: S) -> Result<Self> {
        let history = load_history(&store)?;
        let weights = load_weights(&store)?;
        log::debug!("session opened with {} history entries", history.len());
        Ok(Self {
            config,
            store,
            history,
            weights,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Derives weights from `matrix` and makes them current.
    pub fn save_weights(&mut self, matrix: &PairwiseMatrix) -> Result<&WeightVector> {
        let weights = compute_weights(matrix, self.config.settings.weights.normalize);
        save_weights(&mut self.store, &weights)?;
        log::info!("saved weights {:?}", weights.values());
        self.weights = weights;
        self.backup();
        Ok(&self.weights)
    }

    /// Scores the day with the current weights and upserts it.
    ///
    /// A missing date or an empty day fails with
    /// [`ValidationError`](crate::error::ValidationError) inside the returned
    /// error; nothing is written in that case.
    pub fn record(&mut self, date: Option<NaiveDate>, ratings: CategoryRatings) -> Result<RatingEntry> {
        let entry = build_entry(date, ratings, &self.weights)?;
        let mut next = self.history.clone();
        let replaced = next.upsert(entry.clone());
        save_history(&mut self.store, &next)?;
        self.history = next;
        log::info!(
            "{} entry for {} (overall {})",
            if replaced.is_some() { "replaced" } else { "saved" },
            entry.date,
            entry.overall
        );
        self.backup();
        Ok(entry)
    }

    /// Deletes the entry for `date`. Returns false without writing when there
    /// is none.
    pub fn delete(&mut self, date: NaiveDate) -> Result<bool> {
        let mut next = self.history.clone();
        if !next.delete(date) {
            return Ok(false);
        }
        save_history(&mut self.store, &next)?;
        self.history = next;
        log::info!("deleted entry for {date}");
        self.backup();
        Ok(true)
    }

    pub fn averages(&self) -> CategoryAverages {
        averages_by_category(self.history.entries())
    }

    pub fn forecast(&self) -> Result<Forecast, InsufficientDataError> {
        forecast(&self.history, self.config.settings.forecast.min_entries)
    }

    pub fn series(&self, selection: SeriesSelection) -> Vec<SeriesPoint> {
        series(&self.history, selection)
    }

    pub fn theme(&self) -> Result<String> {
        load_theme(&self.store, &self.config.settings.ui.default_theme)
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        save_theme(&mut self.store, theme)
    }

    fn backup(&self) {
        let Some(source) = self.store.backing_file() else {
            return;
        };
        let settings = &self.config.settings;
        if let Err(err) = snapshot(source, &settings.paths.backup_dir, &settings.backup) {
            log::warn!("backup failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_settings;
    use crate::error::ValidationError;
    use crate::models::{Category, Rating};
    use crate::storage::{HISTORY_KEY, MemoryStore};
    use std::path::Path;

    fn memory_session() -> Session<MemoryStore> {
        let config = AppConfig {
            settings: default_settings(Path::new("/nonexistent")),
            base_dir: Path::new("/nonexistent").to_path_buf(),
        };
        Session::open_with(config, MemoryStore::new()).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn fresh_session_uses_uniform_weights() {
        let session = memory_session();
        assert_eq!(session.weights(), &WeightVector::default());
        assert!(session.history().is_empty());
        assert_eq!(session.theme().unwrap(), "light");
    }

    #[test]
    fn rejected_day_leaves_store_untouched() {
        let mut session = memory_session();
        let err = session.record(Some(date("2024-01-01")), CategoryRatings::new()).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>(), Some(&ValidationError::NothingRated));
        let ratings = CategoryRatings::new().with(Category::Home, Rating::Rated(5));
        let err = session.record(None, ratings).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>(), Some(&ValidationError::MissingDate));
        assert!(session.history().is_empty());
        assert_eq!(session.store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn saved_weights_drive_later_scores() {
        let mut session = memory_session();
        let mut matrix = PairwiseMatrix::neutral(Category::COUNT);
        matrix.compare(Category::Wellbeing.index(), Category::Work.index(), 3.0);
        let weights = session.save_weights(&matrix).unwrap().clone();
        assert!((weights.sum() - 1.0).abs() < 1e-9);

        let ratings = CategoryRatings::new()
            .with(Category::Wellbeing, Rating::Rated(9))
            .with(Category::Work, Rating::Rated(3));
        let entry = session.record(Some(date("2024-02-01")), ratings).unwrap();
        // above the unweighted mean of 6.0 since wellbeing now outweighs work
        assert_eq!(entry.overall, 6.5);
    }

    #[test]
    fn delete_of_unknown_date_does_not_write() {
        let mut session = memory_session();
        assert!(!session.delete(date("2024-01-01")).unwrap());
        assert_eq!(session.store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn theme_round_trips() {
        let mut session = memory_session();
        session.set_theme("dark").unwrap();
        assert_eq!(session.theme().unwrap(), "dark");
    }
}
