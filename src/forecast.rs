use crate::error::InsufficientDataError;
use crate::history::HistoryStore;
use crate::models::{Category, RatingEntry};
use crate::scoring::round1;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_MIN_ENTRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Least-squares line through `(xs[i], ys[i])`. Extra values on the longer
    /// side are ignored. When all x are equal the line is flat at the mean of y.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Self {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return Self {
                slope: 0.0,
                intercept: 0.0,
            };
        }
        let (xs, ys) = (&xs[..n], &ys[..n]);
        let mean_x = xs.iter().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for (x, y) in xs.iter().zip(ys) {
            sxx += (x - mean_x) * (x - mean_x);
            sxy += (x - mean_x) * (y - mean_y);
        }
        let slope = if sxx > f64::EPSILON { sxy / sxx } else { 0.0 };
        Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Position of the predicted day in the oldest-first sequence.
    pub next_index: usize,
    pub overall: f64,
    pub categories: BTreeMap<Category, f64>,
}

/// Predicts the next entry's overall score and every category rating.
///
/// Series run oldest-first with the 0-based position as x. A category left
/// unrated on some day enters its fit as 0.
pub fn forecast(history: &HistoryStore, min_entries: usize) -> Result<Forecast, InsufficientDataError> {
    let available = history.len();
    if available < min_entries {
        return Err(InsufficientDataError {
            required: min_entries,
            available,
        });
    }

    let entries = history.chronological();
    let overall = predict_next(&entries, |e| e.overall);
    let categories = Category::ALL
        .into_iter()
        .map(|c| {
            let predicted =
                predict_next(&entries, |e| e.ratings.get(c).value().map(f64::from).unwrap_or(0.0));
            (c, predicted)
        })
        .collect();

    log::debug!("forecast over {available} entries: overall {overall}");
    Ok(Forecast {
        next_index: entries.len(),
        overall,
        categories,
    })
}

fn predict_next<F>(entries: &[&RatingEntry], value: F) -> f64
where
    F: Fn(&RatingEntry) -> f64,
{
    let xs: Vec<f64> = (0..entries.len()).map(|i| i as f64).collect();
    let ys: Vec<f64> = entries.iter().copied().map(|e| value(e)).collect();
    round1(LinearFit::fit(&xs, &ys).predict(entries.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryRatings, Rating};
    use chrono::NaiveDate;

    fn day(n: u32, wellbeing: Option<u8>, overall: f64) -> RatingEntry {
        let mut ratings = CategoryRatings::new();
        if let Some(v) = wellbeing {
            ratings.set(Category::Wellbeing, Rating::Rated(v));
        }
        ratings.set(Category::Home, Rating::Rated(5));
        RatingEntry::new(NaiveDate::from_ymd_opt(2024, 1, n).unwrap(), ratings, overall)
    }

    #[test]
    fn linear_series_extends() {
        let fit = LinearFit::fit(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert_eq!(fit.slope, 1.0);
        assert_eq!(fit.intercept, 1.0);
        assert_eq!(fit.predict(3.0), 4.0);
    }

    #[test]
    fn constant_x_gives_flat_line() {
        let fit = LinearFit::fit(&[2.0, 2.0], &[1.0, 3.0]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.predict(10.0), 2.0);
    }

    #[test]
    fn too_little_history_is_reported() {
        let history = HistoryStore::from_entries(vec![day(1, Some(4), 4.0), day(2, Some(5), 5.0)]);
        let err = forecast(&history, DEFAULT_MIN_ENTRIES).unwrap_err();
        assert_eq!(err.required, 3);
        assert_eq!(err.available, 2);
    }

    #[test]
    fn trend_direction_follows_dates_not_storage_order() {
        // newest stored first, as a display-sorted log would be
        let history = HistoryStore::from_entries(vec![
            day(3, Some(7), 7.0),
            day(2, Some(6), 6.0),
            day(1, Some(5), 5.0),
        ]);
        let result = forecast(&history, DEFAULT_MIN_ENTRIES).unwrap();
        assert_eq!(result.next_index, 3);
        assert_eq!(result.overall, 8.0);
        assert_eq!(result.categories[&Category::Wellbeing], 8.0);
        assert_eq!(result.categories[&Category::Home], 5.0);
        assert_eq!(result.categories[&Category::Living], 0.0);
    }

    #[test]
    fn unrated_days_pull_category_fit_to_zero() {
        let history = HistoryStore::from_entries(vec![
            day(1, Some(6), 5.0),
            day(2, Some(6), 5.0),
            day(3, None, 5.0),
        ]);
        let result = forecast(&history, DEFAULT_MIN_ENTRIES).unwrap();
        // ys = [6, 6, 0]: slope -3, intercept 7, next = -2
        assert_eq!(result.categories[&Category::Wellbeing], -2.0);
        assert_eq!(result.overall, 5.0);
    }
}
