use crate::error::ValidationError;
use crate::models::{Category, CategoryRatings, RatingEntry};
use crate::weights::WeightVector;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub type CategoryAverages = BTreeMap<Category, f64>;

/// Weighted mean of the rated categories, rounded to one decimal.
///
/// Unrated categories are left out of both the numerator and the denominator,
/// so only the ratio between the weights of rated categories matters.
pub fn aggregate(ratings: &CategoryRatings, weights: &WeightVector) -> Result<f64, ValidationError> {
    let pairs: Vec<(f64, f64)> = ratings
        .rated()
        .map(|(category, value)| (f64::from(value), weights.weight(category)))
        .collect();
    let overall = weighted_avg(&pairs).ok_or(ValidationError::NothingRated)?;
    Ok(round1(overall))
}

/// Validates a day's input and produces the entry to persist.
pub fn build_entry(
    date: Option<NaiveDate>,
    ratings: CategoryRatings,
    weights: &WeightVector,
) -> Result<RatingEntry, ValidationError> {
    let date = date.ok_or(ValidationError::MissingDate)?;
    let overall = aggregate(&ratings, weights)?;
    Ok(RatingEntry::new(date, ratings, overall))
}

/// Mean of every recorded rating per category; 0 for categories never rated.
pub fn averages_by_category<'a, I>(entries: I) -> CategoryAverages
where
    I: IntoIterator<Item = &'a RatingEntry>,
{
    let mut totals = [(0.0_f64, 0_usize); Category::COUNT];
    for entry in entries {
        for (category, value) in entry.ratings.rated() {
            let slot = &mut totals[category.index()];
            slot.0 += f64::from(value);
            slot.1 += 1;
        }
    }
    Category::ALL
        .into_iter()
        .map(|c| {
            let (sum, count) = totals[c.index()];
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            (c, avg)
        })
        .collect()
}

/// Rounds half away from zero at one decimal. The value is first settled at
/// nine decimals so float noise like 7.2499999999 rounds as 7.25.
pub fn round1(value: f64) -> f64 {
    let settled = (value * 1e9).round() / 1e9;
    (settled * 10.0).round() / 10.0
}

fn weighted_avg(pairs: &[(f64, f64)]) -> Option<f64> {
    let num: f64 = pairs.iter().map(|(s, w)| s * w).sum();
    let den: f64 = pairs.iter().map(|(_, w)| w).sum();
    if den > 0.0 { Some(num / den) } else { None }
}
