use crate::parse::{parse_lenient_f64, parse_lenient_i64};
use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DATE_FMT: &str = "%Y-%m-%d";

/// Life areas a day is rated on. Declaration order is the matrix and weight
/// vector index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Wellbeing,
    Home,
    Work,
    Street,
    Weather,
    Inanimate,
    Living,
}

impl Category {
    pub const COUNT: usize = 7;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Wellbeing,
        Category::Home,
        Category::Work,
        Category::Street,
        Category::Weather,
        Category::Inanimate,
        Category::Living,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Wellbeing => "wellbeing",
            Category::Home => "home",
            Category::Work => "work",
            Category::Street => "street",
            Category::Weather => "weather",
            Category::Inanimate => "inanimate",
            Category::Living => "living",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Wellbeing => "Well-being",
            Category::Home => "Relations at home",
            Category::Work => "Relations at work",
            Category::Street => "Relations outside",
            Category::Weather => "Weather",
            Category::Inanimate => "Inanimate nature",
            Category::Living => "Living nature",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_key(&s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// One category's score for a day. Null, missing, zero, negative and
/// non-numeric inputs all collapse to `Unrated` when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
    Rated(u8),
    #[default]
    Unrated,
}

impl Rating {
    pub const MAX: u8 = 10;

    pub fn from_value(value: i64) -> Self {
        if value <= 0 {
            Rating::Unrated
        } else {
            Rating::Rated(value.min(Rating::MAX as i64) as u8)
        }
    }

    pub fn parse(raw: &str) -> Self {
        parse_lenient_i64(raw)
            .map(Rating::from_value)
            .unwrap_or(Rating::Unrated)
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Rating::from_value)
                .unwrap_or(Rating::Unrated),
            Value::String(s) => Rating::parse(s),
            _ => Rating::Unrated,
        }
    }

    /// Zero reads as unrated and anything above [`Rating::MAX`] as the maximum.
    pub fn normalized(self) -> Self {
        match self {
            Rating::Rated(v) => Rating::from_value(i64::from(v)),
            Rating::Unrated => Rating::Unrated,
        }
    }

    pub fn value(self) -> Option<u8> {
        match self {
            Rating::Rated(v) => Some(v),
            Rating::Unrated => None,
        }
    }

    pub fn is_rated(self) -> bool {
        matches!(self, Rating::Rated(_))
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rating::Rated(v) => serializer.serialize_u8(*v),
            Rating::Unrated => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Rating::from_json(&value))
    }
}

/// Ratings for all categories of one day, indexed by [`Category::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryRatings([Rating; Category::COUNT]);

impl CategoryRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> Rating {
        self.0[category.index()]
    }

    pub fn set(&mut self, category: Category, rating: Rating) {
        self.0[category.index()] = rating.normalized();
    }

    pub fn with(mut self, category: Category, rating: Rating) -> Self {
        self.set(category, rating);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Rating)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn rated(&self) -> impl Iterator<Item = (Category, u8)> + '_ {
        self.iter().filter_map(|(c, r)| r.value().map(|v| (c, v)))
    }

    pub fn rated_count(&self) -> usize {
        self.0.iter().filter(|r| r.is_rated()).count()
    }
}

impl FromIterator<(Category, Rating)> for CategoryRatings {
    fn from_iter<I: IntoIterator<Item = (Category, Rating)>>(iter: I) -> Self {
        let mut ratings = CategoryRatings::new();
        for (category, rating) in iter {
            ratings.set(category, rating);
        }
        ratings
    }
}

impl Serialize for CategoryRatings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::COUNT))?;
        for (category, rating) in self.iter() {
            map.serialize_entry(category.key(), &rating)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryRatings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .iter()
            .filter_map(|(key, value)| {
                Category::from_key(key).map(|c| (c, Rating::from_json(value)))
            })
            .collect())
    }
}

/// One day's record. `overall` is the weighted mean of the rated categories,
/// rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub date: NaiveDate,
    pub ratings: CategoryRatings,
    #[serde(deserialize_with = "overall_from_number_or_text")]
    pub overall: f64,
}

impl RatingEntry {
    pub fn new(date: NaiveDate, ratings: CategoryRatings, overall: f64) -> Self {
        Self {
            date,
            ratings,
            overall,
        }
    }
}

// Older blobs stored `overall` as a preformatted string such as "7.3".
fn overall_from_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => parse_lenient_f64(&s)
            .ok_or_else(|| de::Error::custom(format!("overall '{s}' is not a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FMT).unwrap()
    }

    #[test]
    fn category_order_matches_indices() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
            assert_eq!(Category::from_key(c.key()), Some(*c));
        }
        assert_eq!("Weather".parse::<Category>(), Ok(Category::Weather));
        assert!("mood".parse::<Category>().is_err());
    }

    #[test]
    fn unrated_encodings_collapse() {
        assert_eq!(Rating::from_json(&Value::Null), Rating::Unrated);
        assert_eq!(Rating::from_json(&json!(0)), Rating::Unrated);
        assert_eq!(Rating::from_json(&json!(-3)), Rating::Unrated);
        assert_eq!(Rating::from_json(&json!("n/a")), Rating::Unrated);
        assert_eq!(Rating::parse(""), Rating::Unrated);
        assert_eq!(Rating::parse("6"), Rating::Rated(6));
        assert_eq!(Rating::from_json(&json!("9")), Rating::Rated(9));
        assert_eq!(Rating::from_json(&json!(7.8)), Rating::Rated(7));
        assert_eq!(Rating::from_value(14), Rating::Rated(10));
    }

    #[test]
    fn huge_ratings_clamp_from_text_and_json() {
        assert_eq!(Rating::parse("99999999999999999999"), Rating::Rated(10));
        assert_eq!(Rating::from_json(&json!(1e20)), Rating::Rated(10));
        assert_eq!(Rating::parse("-99999999999999999999"), Rating::Unrated);
    }

    #[test]
    fn out_of_range_ratings_are_normalized_when_stored() {
        let ratings = CategoryRatings::new()
            .with(Category::Home, Rating::Rated(0))
            .with(Category::Work, Rating::Rated(200))
            .with(Category::Street, Rating::Rated(10));
        assert_eq!(ratings.get(Category::Home), Rating::Unrated);
        assert_eq!(ratings.get(Category::Work), Rating::Rated(10));
        assert_eq!(ratings.get(Category::Street), Rating::Rated(10));
        assert_eq!(ratings.rated_count(), 2);
    }

    #[test]
    fn ratings_serialize_every_category() {
        let ratings = CategoryRatings::new().with(Category::Work, Rating::Rated(6));
        let value = serde_json::to_value(ratings).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), Category::COUNT);
        assert_eq!(obj["work"], json!(6));
        assert_eq!(obj["home"], Value::Null);
    }

    #[test]
    fn ratings_read_missing_and_unknown_keys() {
        let ratings: CategoryRatings =
            serde_json::from_value(json!({"wellbeing": 8, "mood": 3, "home": null})).unwrap();
        assert_eq!(ratings.get(Category::Wellbeing), Rating::Rated(8));
        assert_eq!(ratings.get(Category::Home), Rating::Unrated);
        assert_eq!(ratings.get(Category::Living), Rating::Unrated);
        assert_eq!(ratings.rated_count(), 1);
    }

    #[test]
    fn entry_accepts_string_overall() {
        let entry: RatingEntry = serde_json::from_value(json!({
            "date": "2024-01-03",
            "ratings": {"wellbeing": 8, "work": 6},
            "overall": "7.3"
        }))
        .unwrap();
        assert_eq!(entry.date, date("2024-01-03"));
        assert_eq!(entry.overall, 7.3);
        assert_eq!(entry.ratings.rated().count(), 2);
    }

    #[test]
    fn entry_rejects_non_numeric_overall() {
        let parsed = serde_json::from_value::<RatingEntry>(json!({
            "date": "2024-01-03",
            "ratings": {},
            "overall": "great"
        }));
        assert!(parsed.is_err());
    }
}
