//! Acceptance tests against the preprod NA platform.
//!
//! Credentials are read from the environment or a `.env` file. Run with
//! `cargo test --test live -- --ignored`.

use chrono::NaiveDate;
use geosys::{Client, Credentials, Environment, Geometry, Region, Table};

// Covers two pixels: mh11v4i225j4612, mh11v4i226j4612
const POLYGON: &str = "POLYGON((-91.29152885756007 40.39177489815265,-91.28403789132507 40.391776131485386,-91.28386736508233 40.389390758655935,-91.29143832829979 40.38874592864832,-91.29152885756007 40.39177489815265))";

fn client() -> Client {
    dotenvy::dotenv().ok();
    let var = |k: &str| std::env::var(k).unwrap_or_else(|_| panic!("{} is not set", k));
    Client::new(
        Credentials::new(
            var("API_CLIENT_ID"),
            var("API_CLIENT_SECRET"),
            var("API_USERNAME"),
            var("API_PASSWORD"),
        ),
        Environment::Preprod,
        Region::Na,
    )
    .unwrap()
}

fn polygon() -> Geometry {
    POLYGON.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
#[ignore]
fn live_authenticate() {
    let token = client().authenticate().unwrap();
    let v = serde_json::to_value(token).unwrap();
    for k in ["access_token", "expires_in", "token_type", "scope", "expires_at", "refresh_token"] {
        assert!(v.get(k).is_some(), "missing {}", k);
    }
}

#[test]
#[ignore]
fn live_time_series() {
    let points = client()
        .get_time_series(&polygon(), date("2020-01-01"), date("2020-01-07"), "NDVI")
        .unwrap();
    assert_eq!(points.len(), 7);
    let table = Table::from_records(&points).unwrap().with_index("date").unwrap();
    assert!(table.has_column("value") && table.has_column("index"));
}

#[test]
#[ignore]
fn live_time_series_by_pixel() {
    let points = client()
        .get_time_series_by_pixel(&polygon(), date("2020-01-01"), date("2020-01-07"), "NDVI")
        .unwrap();
    assert_eq!(points.len(), 14);
    assert!(points.iter().all(|p| p.index == "NDVI"));
    for id in ["mh11v4i225j4612", "mh11v4i226j4612"] {
        assert!(points.iter().any(|p| p.pixel_id() == Some(id)));
    }
}

#[test]
#[ignore]
fn live_coverage_in_season_ndvi() {
    let records = client()
        .get_coverage_in_season_ndvi(&polygon(), date("2021-01-01"), date("2022-01-01"), "SENTINEL_2")
        .unwrap();
    let table = Table::from_records(&records).unwrap();
    for c in ["coverageType", "image.id", "image.sensor", "image.date", "seasonField.id"] {
        assert!(table.is_empty() || table.has_column(c), "missing column {}", c);
    }
}

#[test]
#[ignore]
fn live_image_as_array() {
    // 4 bands, 76 rows, 71 columns.
    let arr = client()
        .get_image_as_array("d1bqwqq", "IKc73hpUQ6spGyDC80dOd8SDFIKHF1CezmxsZGmXlzg")
        .unwrap();
    assert_eq!(arr.shape(), &[4, 76, 71]);
}

#[test]
#[ignore]
fn live_weather_temperature() {
    let records = client()
        .get_weather_temperature(&polygon(), date("2021-01-01"), date("2022-01-01"))
        .unwrap();
    let table = Table::from_records(&records).unwrap();
    for c in ["date", "temperature.standard", "temperature.standardMax", "temperature.groundMin"] {
        assert!(table.is_empty() || table.has_column(c), "missing column {}", c);
    }
}
