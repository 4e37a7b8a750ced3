//! Row-oriented tables built by flattening JSON records.
//!
//! Nested objects become dotted column names (`{"image": {"id": ..}}` becomes
//! `image.id`), arrays are kept whole as cell values and cells a record does
//! not carry are `null`.

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    index_name: Option<String>,
    index: Vec<Value>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::from_values(&values))
    }

    pub fn from_values(values: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut flat_rows: Vec<Map<String, Value>> = Vec::with_capacity(values.len());

        for v in values {
            let mut flat = Map::new();
            match v {
                Value::Object(map) => flatten_into("", map, &mut flat),
                other => {
                    flat.insert("0".to_string(), other.clone());
                }
            }
            for k in flat.keys() {
                if !columns.iter().any(|c| c == k) {
                    columns.push(k.clone());
                }
            }
            flat_rows.push(flat);
        }

        let rows = flat_rows
            .into_iter()
            .map(|mut flat| {
                columns
                    .iter()
                    .map(|c| flat.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self {
            index_name: None,
            index: Vec::new(),
            columns,
            rows,
        }
    }

    /// Moves `column` out of the data columns and makes it the row index.
    pub fn with_index(mut self, column: &str) -> Result<Self> {
        let pos = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| anyhow!("no column [{}] to index by", column))?;

        self.columns.remove(pos);
        self.index = self.rows.iter_mut().map(|r| r.remove(pos)).collect();
        self.index_name = Some(column.to_string());
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r[pos]).collect())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Map<String, Value>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}.{}", prefix, k)
        };
        match v {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&key, inner, out),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header: Vec<&str> = Vec::new();
        if let Some(name) = &self.index_name {
            header.push(name);
        }
        header.extend(self.columns.iter().map(String::as_str));
        writeln!(f, "{}", header.join("\t"))?;

        for (i, row) in self.rows.iter().enumerate() {
            let mut cells: Vec<String> = Vec::with_capacity(row.len() + 1);
            if self.index_name.is_some() {
                cells.push(cell(&self.index[i]));
            }
            cells.extend(row.iter().map(cell));
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects() {
        let t = Table::from_values(&[
            json!({"coverageType": "CLEAR", "image": {"id": "a", "availableBands": ["Red", "Nir"]}, "seasonField": {"id": "sf"}}),
            json!({"coverageType": "CLEAR", "image": {"id": "b", "weather": "SUNNY"}}),
        ]);

        assert_eq!(
            t.columns(),
            [
                "coverageType",
                "image.id",
                "image.availableBands",
                "seasonField.id",
                "image.weather"
            ]
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0][2], json!(["Red", "Nir"]));
        assert_eq!(t.rows()[1][3], Value::Null);
        assert_eq!(t.column("image.weather").unwrap()[1], &json!("SUNNY"));
    }

    #[test]
    fn index_by_date() {
        let t = Table::from_values(&[
            json!({"date": "2020-01-01", "index": "NDVI", "value": 0.5}),
            json!({"date": "2020-01-02", "index": "NDVI", "value": 0.6}),
        ])
        .with_index("date")
        .unwrap();

        assert_eq!(t.index_name(), Some("date"));
        assert_eq!(t.columns(), ["index", "value"]);
        assert_eq!(t.index()[1], json!("2020-01-02"));
        assert!(!t.has_column("date"));
        assert_eq!(
            t.to_string(),
            "date\tindex\tvalue\n2020-01-01\tNDVI\t0.5\n2020-01-02\tNDVI\t0.6\n"
        );
    }

    #[test]
    fn missing_index_column_fails() {
        assert!(Table::from_values(&[json!({"a": 1})]).with_index("date").is_err());
    }
}
