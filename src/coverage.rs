use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::util::{de_date, iso_date};

pub(crate) fn catalog_imagery_path(season_field_id: &str) -> String {
    format!(
        "field-level-maps/v4/season-fields/{}/catalog-imagery",
        season_field_id
    )
}

/// One satellite image covering a season field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRecord {
    pub coverage_type: String,
    pub image: CoverageImage,
    pub season_field: SeasonFieldRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageImage {
    pub id: String,
    #[serde(default)]
    pub available_bands: Vec<String>,
    pub sensor: String,
    #[serde(default)]
    pub soil_material: Option<String>,
    #[serde(default)]
    pub spatial_resolution: Option<f64>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(deserialize_with = "de_date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonFieldRef {
    pub id: String,
}

pub(crate) fn coverage_query(
    start: NaiveDate,
    end: NaiveDate,
    sensor: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("maps.type", "INSEASON_NDVI".to_string()),
        ("Image.Sensor", sensor.to_string()),
        ("CoverageType", "CLEAR".to_string()),
        ("$limit", "None".to_string()),
        (
            "$filter",
            format!(
                "Image.Date >= '{}' and Image.Date <= '{}'",
                iso_date(start),
                iso_date(end)
            ),
        ),
    ]
}
