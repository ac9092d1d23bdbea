use chrono::NaiveDate;
use std::fs;
use wellbeing_planner::backup::list_snapshots;
use wellbeing_planner::config::AppConfig;
use wellbeing_planner::history::SeriesSelection;
use wellbeing_planner::storage::{HISTORY_KEY, JsonFileStore, KeyValueStore, WEIGHTS_KEY};
use wellbeing_planner::{
    Category, CategoryRatings, InsufficientDataError, PairwiseMatrix, Rating, Session,
    ValidationError,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn rated(pairs: &[(Category, &str)]) -> CategoryRatings {
    pairs.iter().map(|(c, raw)| (*c, Rating::parse(raw))).collect()
}

#[test]
fn entries_persist_across_sessions_in_date_order() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();

    let mut session = Session::open(cfg.clone()).unwrap();
    session
        .record(Some(date("2024-01-03")), rated(&[(Category::Wellbeing, "7")]))
        .unwrap();
    session
        .record(Some(date("2024-01-01")), rated(&[(Category::Home, "5")]))
        .unwrap();
    drop(session);

    let session = Session::open(cfg).unwrap();
    let dates: Vec<_> = session
        .history()
        .ordered_descending()
        .iter()
        .map(|e| (e.date, e.overall))
        .collect();
    assert_eq!(
        dates,
        vec![(date("2024-01-03"), 7.0), (date("2024-01-01"), 5.0)]
    );
}

#[test]
fn resaving_a_day_replaces_it() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    let mut session = Session::open(cfg).unwrap();

    session
        .record(Some(date("2024-03-10")), rated(&[(Category::Work, "3")]))
        .unwrap();
    session
        .record(
            Some(date("2024-03-10")),
            rated(&[(Category::Work, "9"), (Category::Weather, "")]),
        )
        .unwrap();

    assert_eq!(session.history().len(), 1);
    let entry = session.history().get(date("2024-03-10")).unwrap();
    assert_eq!(entry.ratings.get(Category::Work), Rating::Rated(9));
    assert_eq!(entry.ratings.get(Category::Weather), Rating::Unrated);
    assert_eq!(entry.overall, 9.0);
}

#[test]
fn failed_save_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    let store_path = cfg.settings.paths.store_json.clone();
    let mut session = Session::open(cfg).unwrap();

    let err = session
        .record(Some(date("2024-01-01")), rated(&[(Category::Home, "0"), (Category::Work, "abc")]))
        .unwrap_err();
    assert_eq!(err.downcast_ref::<ValidationError>(), Some(&ValidationError::NothingRated));
    assert!(!store_path.exists());
    assert!(session.history().is_empty());
}

#[test]
fn weights_from_comparisons_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    let mut session = Session::open(cfg.clone()).unwrap();

    let mut cells = vec!["1".to_string(); PairwiseMatrix::upper_triangle_len(Category::COUNT)];
    // wellbeing vs home is the first cell
    cells[0] = "5".into();
    let matrix = PairwiseMatrix::from_upper_triangle(Category::COUNT, &cells);
    let saved = session.save_weights(&matrix).unwrap().clone();
    assert!((saved.sum() - 1.0).abs() < 1e-9);
    assert!(saved.weight(Category::Wellbeing) > saved.weight(Category::Home));

    let store = JsonFileStore::open(&cfg.settings.paths.store_json).unwrap();
    assert!(store.get(WEIGHTS_KEY).unwrap().is_some());
    let reopened = Session::open(cfg).unwrap();
    assert_eq!(reopened.weights(), &saved);
}

#[test]
fn forecast_needs_three_days_then_follows_trend() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    let mut session = Session::open(cfg).unwrap();

    session
        .record(Some(date("2024-05-02")), rated(&[(Category::Living, "4")]))
        .unwrap();
    session
        .record(Some(date("2024-05-01")), rated(&[(Category::Living, "3")]))
        .unwrap();
    let err = session.forecast().unwrap_err();
    assert_eq!(
        err,
        InsufficientDataError {
            required: 3,
            available: 2
        }
    );

    session
        .record(Some(date("2024-05-03")), rated(&[(Category::Living, "5")]))
        .unwrap();
    let forecast = session.forecast().unwrap();
    assert_eq!(forecast.overall, 6.0);
    assert_eq!(forecast.categories[&Category::Living], 6.0);

    let averages = session.averages();
    assert_eq!(averages[&Category::Living], 4.0);
    assert_eq!(averages[&Category::Home], 0.0);

    let points = session.series(SeriesSelection::Category(Category::Living));
    let values: Vec<_> = points.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![Some(3.0), Some(4.0), Some(5.0)]);
}

#[test]
fn deletes_are_persisted_and_backed_up() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    let mut session = Session::open(cfg.clone()).unwrap();

    session
        .record(Some(date("2024-01-01")), rated(&[(Category::Street, "6")]))
        .unwrap();
    assert!(!session.delete(date("2023-01-01")).unwrap());
    assert!(session.delete(date("2024-01-01")).unwrap());

    let store = JsonFileStore::open(&cfg.settings.paths.store_json).unwrap();
    assert_eq!(store.get(HISTORY_KEY).unwrap(), Some(serde_json::json!([])));
    let backups = list_snapshots(&cfg.settings.paths.backup_dir, "store").unwrap();
    assert!(!backups.is_empty());
}

#[test]
fn legacy_blob_with_string_overall_loads() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig::load_from(dir.path()).unwrap();
    fs::write(
        &cfg.settings.paths.store_json,
        r#"{
            "categoryWeights": [0.2, 0.1, 0.2, 0.1, 0.2, 0.1, 0.1],
            "ratingHistory": [
                {"date": "2024-01-01", "ratings": {"wellbeing": 8, "home": null, "work": 0}, "overall": "8.0"}
            ],
            "theme": "dark"
        }"#,
    )
    .unwrap();

    let session = Session::open(cfg).unwrap();
    let entry = session.history().get(date("2024-01-01")).unwrap();
    assert_eq!(entry.overall, 8.0);
    assert_eq!(entry.ratings.rated_count(), 1);
    assert_eq!(session.weights().weight(Category::Work), 0.2);
    assert_eq!(session.theme().unwrap(), "dark");
}
