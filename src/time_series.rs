use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::util::{de_date, iso_date};

pub(crate) const VALUES_PATH: &str = "vegetation-time-series/v1/season-fields/values";
pub(crate) const PIXEL_VALUES_PATH: &str = "vegetation-time-series/v1/season-fields/pixels/values";

/// One index value on one day, for the whole field or for a single pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(deserialize_with = "de_date")]
    pub date: NaiveDate,
    pub index: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel: Option<Pixel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub id: String,
}

impl TimeSeriesPoint {
    pub fn pixel_id(&self) -> Option<&str> {
        self.pixel.as_ref().map(|p| p.id.as_str())
    }
}

pub(crate) fn values_query(
    season_field_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    index: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("$offset", "0".to_string()),
        ("$limit", "None".to_string()),
        ("$count", "false".to_string()),
        ("SeasonField.Id", season_field_id.to_string()),
        ("index", index.to_string()),
        (
            "$filter",
            format!("Date >= '{}' and Date <= '{}'", iso_date(start), iso_date(end)),
        ),
    ]
}

/// Orders by date, then pixel id, and drops exact duplicates.
pub(crate) fn normalize(points: &mut Vec<TimeSeriesPoint>) {
    // index and value only order ties so that identical rows end up adjacent
    points.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.pixel_id().cmp(&b.pixel_id()))
            .then_with(|| a.index.cmp(&b.index))
            .then_with(|| a.value.total_cmp(&b.value))
    });
    points.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pixel_rows_sort_by_date_then_pixel() {
        let mut pts: Vec<TimeSeriesPoint> = serde_json::from_value(json!([
            {"date": "2020-01-02T00:00:00Z", "index": "NDVI", "value": 0.2, "pixel": {"id": "p2"}},
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.3, "pixel": {"id": "p2"}},
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.1, "pixel": {"id": "p1"}},
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.1, "pixel": {"id": "p1"}}
        ]))
        .unwrap();
        normalize(&mut pts);

        let keys: Vec<_> = pts
            .iter()
            .map(|p| (iso_date(p.date), p.pixel_id().unwrap().to_string()))
            .collect();
        assert_eq!(
            keys,
            [
                ("2020-01-01".to_string(), "p1".to_string()),
                ("2020-01-01".to_string(), "p2".to_string()),
                ("2020-01-02".to_string(), "p2".to_string()),
            ]
        );
    }

    #[test]
    fn rows_differing_only_in_value_are_kept() {
        let mut pts: Vec<TimeSeriesPoint> = serde_json::from_value(json!([
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.9},
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.1},
            {"date": "2020-01-01T00:00:00Z", "index": "NDVI", "value": 0.9}
        ]))
        .unwrap();
        normalize(&mut pts);

        let values: Vec<f64> = pts.iter().map(|p| p.value).collect();
        assert_eq!(values, [0.1, 0.9]);
    }

    #[test]
    fn filter_covers_inclusive_range() {
        let q = values_query(
            "sf1",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 7).unwrap(),
            "NDVI",
        );
        let filter = q.iter().find(|(k, _)| *k == "$filter").unwrap();
        assert_eq!(filter.1, "Date >= '2020-01-01' and Date <= '2020-01-07'");
        assert!(q.contains(&("SeasonField.Id", "sf1".to_string())));
    }
}
