use std::fmt;
use std::str::FromStr;

use crate::error::GeosysError;

/// A polygon in WKT, forwarded verbatim to the service.
///
/// Only the geometry tag and parenthesis balance are checked; coordinates are
/// left for the service to validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry(String);

impl Geometry {
    pub fn from_wkt(wkt: &str) -> Result<Self, GeosysError> {
        let wkt = wkt.trim();
        let upper = wkt.to_ascii_uppercase();
        if !(upper.starts_with("POLYGON") || upper.starts_with("MULTIPOLYGON")) {
            return Err(GeosysError::InvalidGeometry(format!(
                "expected a POLYGON or MULTIPOLYGON, got [{}]",
                truncate(wkt, 32)
            )));
        }

        let mut depth = 0i32;
        for c in wkt.chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        if depth != 0 || !wkt.contains('(') {
            return Err(GeosysError::InvalidGeometry(
                "unbalanced parentheses".to_string(),
            ));
        }

        Ok(Self(wkt.to_string()))
    }

    pub fn as_wkt(&self) -> &str {
        &self.0
    }
}

fn truncate(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

impl FromStr for Geometry {
    type Err = GeosysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wkt(s)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Geometry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
