use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::util::{de_date, iso_date};

pub(crate) const WEATHER_PATH: &str = "Weather/v1/weather";

/// Daily temperatures at a location, in degrees Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(deserialize_with = "de_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub temperature: Temperature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Temperature {
    #[serde(default)]
    pub ground_min: Option<f64>,
    #[serde(default)]
    pub ground: Option<f64>,
    #[serde(default)]
    pub agro: Option<f64>,
    #[serde(default)]
    pub agro_min: Option<f64>,
    #[serde(default)]
    pub agro_max: Option<f64>,
    #[serde(default)]
    pub standard_min: Option<f64>,
    #[serde(default)]
    pub standard: Option<f64>,
    #[serde(default)]
    pub standard_max: Option<f64>,
}

pub(crate) fn temperature_query(
    location_wkt: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(&'static str, String)> {
    vec![
        ("$offset", "0".to_string()),
        ("$limit", "None".to_string()),
        ("$count", "false".to_string()),
        ("Location", location_wkt.to_string()),
        (
            "Date",
            format!(
                "$between:{}T00:00:00.0000000Z|{}T00:00:00.0000000Z",
                iso_date(start),
                iso_date(end)
            ),
        ),
        ("Provider", "GLOBAL1".to_string()),
        ("WeatherType", "HISTORICAL_DAILY".to_string()),
        ("$fields", "Date,Temperature".to_string()),
    ]
}
