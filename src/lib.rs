//! A small blocking Rust client for the Geosys geospatial analytics API.
//!
//! The client authenticates against the Geosys identity service, resolves a
//! WKT polygon to a season field, and reshapes the service's JSON into typed
//! rows (vegetation index time series, imagery coverage, weather) or into a
//! `(bands, height, width)` array for reflectance maps.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`API_CLIENT_ID`,
//!   `API_CLIENT_SECRET`, `API_USERNAME`, `API_PASSWORD`, plus optional
//!   `GEOSYS_ENV` / `GEOSYS_REGION`) or a `.geosysrc` file (current directory
//!   or home directory).
//! - Call [`Client::get_time_series`] with a polygon, a date range and an index.
//!
//! ```no_run
//! use anyhow::Result;
//! use chrono::NaiveDate;
//! use geosys::{Client, Geometry, Table};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let field: Geometry = "POLYGON((-91.2915 40.3917,-91.2840 40.3917,-91.2838 40.3893,-91.2915 40.3917))".parse()?;
//!     let rows = client.get_time_series(
//!         &field,
//!         NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2020, 1, 7).unwrap(),
//!         "NDVI",
//!     )?;
//!     println!("{}", Table::from_records(&rows)?.with_index("date")?);
//!     Ok(())
//! }
//! ```
//!
//! Operations return [`anyhow::Result`]; failures the caller may want to
//! branch on carry a [`GeosysError`] that can be recovered with
//! `downcast_ref`.

#![forbid(unsafe_code)]

mod auth;
mod client;
mod config;
mod coverage;
mod environment;
mod error;
mod geometry;
mod imagery;
mod season_field;
mod table;
mod time_series;
mod util;
mod weather;

pub use auth::Token;
pub use client::Client;
pub use config::{ClientConfig, Credentials};
pub use coverage::{CoverageImage, CoverageRecord, SeasonFieldRef};
pub use environment::{Environment, Region};
pub use error::GeosysError;
pub use geometry::Geometry;
pub use imagery::{ImageArray, decode_image};
pub use table::Table;
pub use time_series::{Pixel, TimeSeriesPoint};
pub use weather::{Temperature, WeatherRecord};
