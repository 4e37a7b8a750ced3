use anyhow::Result;
use chrono::NaiveDate;
use geosys::{Client, Geometry, Table};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure credentials via env vars, a `.env` file or `.geosysrc`.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let client = Client::from_env()?.with_progress(true);

    let field: Geometry = "POLYGON((-91.29152885756007 40.39177489815265,-91.28403789132507 40.391776131485386,-91.28386736508233 40.389390758655935,-91.29143832829979 40.38874592864832,-91.29152885756007 40.39177489815265))".parse()?;
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2020, 1, 7).expect("valid date");

    let points = client.get_time_series(&field, start, end, "NDVI")?;
    println!("{}", Table::from_records(&points)?.with_index("date")?);

    let weather = client.get_weather_temperature(&field, start, end)?;
    println!("{}", Table::from_records(&weather)?.with_index("date")?);
    Ok(())
}
