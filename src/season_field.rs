use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;

pub(crate) const SEASON_FIELDS_PATH: &str = "master-data-management/v6/seasonfields";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SeasonFieldRequest<'a> {
    boundary: Boundary<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Boundary<'a> {
    wkt: &'a str,
}

impl<'a> SeasonFieldRequest<'a> {
    pub(crate) fn new(geometry: &'a Geometry) -> Self {
        Self {
            boundary: Boundary {
                wkt: geometry.as_wkt(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SeasonFieldReply {
    pub(crate) id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let g = Geometry::from_wkt("POLYGON((0 0,1 0,1 1,0 0))").unwrap();
        let body = serde_json::to_value(SeasonFieldRequest::new(&g)).unwrap();
        assert_eq!(body, json!({"Boundary": {"Wkt": "POLYGON((0 0,1 0,1 1,0 0))"}}));
    }
}
