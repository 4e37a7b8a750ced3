use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Method, StatusCode};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::auth::{Token, password_grant, refresh_grant};
use crate::config::{ClientConfig, Credentials, load_config};
use crate::coverage::{CoverageRecord, catalog_imagery_path, coverage_query};
use crate::environment::{Environment, Region};
use crate::error::{GeosysError, ProblemDetails, format_api_error};
use crate::geometry::Geometry;
use crate::imagery::{ImageArray, decode_image, reflectance_map_path};
use crate::season_field::{SEASON_FIELDS_PATH, SeasonFieldReply, SeasonFieldRequest};
use crate::time_series::{PIXEL_VALUES_PATH, TimeSeriesPoint, VALUES_PATH, normalize, values_query};
use crate::util::{check_range, prealloc, urljoin};
use crate::weather::{WEATHER_PATH, WeatherRecord, temperature_query};

type Query<'a> = [(&'a str, String)];

/// Blocking client for the Geosys analytics API.
///
/// The session token is fetched on first use and renewed when it is about to
/// expire, so every operation can be called on a fresh client.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
    token: Mutex<Option<Token>>,
}

impl Client {
    /// Creates a client for the public endpoints of `environment` in `region`.
    pub fn new(credentials: Credentials, environment: Environment, region: Region) -> Result<Self> {
        Self::with_config(ClientConfig::new(credentials, environment, region))
    }

    /// Creates a client using environment variables and/or `.geosysrc`.
    ///
    /// Credentials come from `API_CLIENT_ID`, `API_CLIENT_SECRET`, `API_USERNAME`
    /// and `API_PASSWORD`; `GEOSYS_ENV` and `GEOSYS_REGION` select the endpoints.
    pub fn from_env() -> Result<Self> {
        Self::with_config(load_config()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("geosys-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("geosys-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(60));

        if !config.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            config,
            timeout: Duration::from_secs(60),
            progress: false,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shows a progress bar on stderr while downloading images.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Exchanges the credentials for a fresh session token and caches it.
    pub fn authenticate(&self) -> Result<Token> {
        let token = self.fetch_token()?;
        *self.lock_token() = Some(token.clone());
        Ok(token)
    }

    /// The cached session token, if one was obtained.
    pub fn token(&self) -> Option<Token> {
        self.lock_token().clone()
    }

    /// Resolves a polygon to the season field id the service tracks it under.
    pub fn get_season_field_id(&self, geometry: &Geometry) -> Result<String> {
        let url = urljoin(&self.config.api_url, SEASON_FIELDS_PATH);
        let reply: SeasonFieldReply =
            self.api_json(Method::POST, &url, &[], &SeasonFieldRequest::new(geometry))?;
        tracing::info!(season_field = %reply.id, "resolved season field");
        Ok(reply.id)
    }

    /// Daily values of `index` (e.g. `NDVI`) over the field, sorted by date.
    ///
    /// Fails with [`GeosysError::DataUnavailable`] when the service has no values
    /// in `[start, end]`.
    pub fn get_time_series(
        &self,
        geometry: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
        index: &str,
    ) -> Result<Vec<TimeSeriesPoint>> {
        self.time_series(VALUES_PATH, geometry, start, end, index)
    }

    /// Daily values of `index` for every pixel covering the field, sorted by date
    /// then pixel id.
    pub fn get_time_series_by_pixel(
        &self,
        geometry: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
        index: &str,
    ) -> Result<Vec<TimeSeriesPoint>> {
        self.time_series(PIXEL_VALUES_PATH, geometry, start, end, index)
    }

    fn time_series(
        &self,
        path: &str,
        geometry: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
        index: &str,
    ) -> Result<Vec<TimeSeriesPoint>> {
        check_range(start, end)?;
        let season_field_id = self.get_season_field_id(geometry)?;

        let url = urljoin(&self.config.api_url, path);
        let query = values_query(&season_field_id, start, end, index);
        let mut points: Vec<TimeSeriesPoint> = self.api_json(Method::GET, &url, &query, &Value::Null)?;

        normalize(&mut points);
        if points.is_empty() {
            return Err(GeosysError::DataUnavailable(format!(
                "no {} values for season field {} between {} and {}",
                index, season_field_id, start, end
            ))
            .into());
        }
        Ok(points)
    }

    /// Clear in-season NDVI images of `sensor` (e.g. `SENTINEL_2`) taken in
    /// `[start, end]`, sorted by image date.
    pub fn get_coverage_in_season_ndvi(
        &self,
        geometry: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
        sensor: &str,
    ) -> Result<Vec<CoverageRecord>> {
        check_range(start, end)?;
        let season_field_id = self.get_season_field_id(geometry)?;

        let url = urljoin(&self.config.api_url, &catalog_imagery_path(&season_field_id));
        let mut records: Vec<CoverageRecord> =
            self.api_json(Method::GET, &url, &coverage_query(start, end, sensor), &Value::Null)?;
        records.sort_by(|a, b| a.image.date.cmp(&b.image.date));
        Ok(records)
    }

    /// Downloads the reflectance map of one image as a `(bands, height, width)` array.
    pub fn get_image_as_array(&self, field_id: &str, image_id: &str) -> Result<ImageArray> {
        let url = urljoin(&self.config.api_url, &reflectance_map_path(field_id, image_id));
        let bytes = self.api_bytes(&url, &[("$epsg-out", "3857".to_string())])?;
        decode_image(&bytes).with_context(|| {
            format!(
                "failed to decode image {} of season field {}",
                image_id, field_id
            )
        })
    }

    /// Historical daily temperatures at the polygon, sorted by date.
    pub fn get_weather_temperature(
        &self,
        geometry: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeatherRecord>> {
        check_range(start, end)?;
        let url = urljoin(&self.config.api_url, WEATHER_PATH);
        let query = temperature_query(geometry.as_wkt(), start, end);
        let mut records: Vec<WeatherRecord> = self.api_json(Method::GET, &url, &query, &Value::Null)?;
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<Token>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch_token(&self) -> Result<Token> {
        let token = password_grant(
            &self.http,
            &self.config.identity_url,
            &self.config.credentials,
            self.timeout,
        )?;
        tracing::info!(
            identity = %self.config.identity_url,
            expires_in = token.expires_in,
            "authenticated"
        );
        Ok(token)
    }

    fn renew(&self, expired: &Token) -> Result<Token> {
        if !expired.refresh_token.is_empty() {
            match refresh_grant(
                &self.http,
                &self.config.identity_url,
                &self.config.credentials,
                &expired.refresh_token,
                self.timeout,
            ) {
                Ok(token) => {
                    tracing::info!(expires_in = token.expires_in, "refreshed session token");
                    return Ok(token);
                }
                Err(e) => tracing::warn!(error = %e, "token refresh failed, re-authenticating"),
            }
        }
        self.fetch_token()
    }

    /// Authorization header value for a valid token, renewing it when needed.
    fn bearer(&self) -> Result<String> {
        let mut guard = self.lock_token();
        let token = match guard.take() {
            Some(t) if !t.is_expired() => t,
            Some(t) => self.renew(&t)?,
            None => self.fetch_token()?,
        };
        let bearer = token.bearer();
        *guard = Some(token);
        Ok(bearer)
    }

    fn send<F>(&self, method: &Method, url: &str, build: F) -> Result<Response>
    where
        F: Fn(&HttpClient) -> RequestBuilder,
    {
        tracing::debug!(%method, url, "request");
        let resp = build(&self.http)
            .header(AUTHORIZATION, self.bearer()?)
            .timeout(self.timeout)
            .send()
            .with_context(|| format!("could not connect ({})", url))?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        // The token may have been revoked server side; retry once with a new one.
        tracing::warn!(url, "HTTP 401, re-authenticating");
        let bearer = self.authenticate()?.bearer();
        build(&self.http)
            .header(AUTHORIZATION, bearer)
            .timeout(self.timeout)
            .send()
            .with_context(|| format!("could not connect ({})", url))
    }

    fn api_json<TReq: Serialize, TResp: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &Query<'_>,
        request: &TReq,
    ) -> Result<TResp> {
        let resp = self.send(&method, url, |http| {
            let req = http.request(method.clone(), url).query(query);
            if method == Method::GET {
                req
            } else {
                req.json(request)
            }
        })?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(api_error(status, url, &text));
        }

        serde_json::from_str::<TResp>(&text)
            .with_context(|| format!("failed to parse API JSON (url={}, status={})", url, status))
    }

    fn api_bytes(&self, url: &str, query: &Query<'_>) -> Result<Vec<u8>> {
        let mut resp = self.send(&Method::GET, url, |http| http.get(url).query(query))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(api_error(status, url, &text));
        }

        let total = resp.content_length();
        let pb = if self.progress {
            let pb = match total {
                Some(n) => ProgressBar::new(n),
                None => ProgressBar::new_spinner(),
            };
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .map(|s| s.progress_chars("=>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            Some(pb)
        } else {
            None
        };

        let mut out = Vec::with_capacity(prealloc(total.unwrap_or(0)));
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = resp.read(&mut buf).context("download interrupted")?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        tracing::debug!(url, bytes = out.len(), "downloaded");
        Ok(out)
    }
}

fn api_error(status: StatusCode, url: &str, text: &str) -> anyhow::Error {
    // Try to parse problem details for actionable messages.
    if let Ok(pd) = serde_json::from_str::<ProblemDetails>(text) {
        return format_api_error(status, url, &pd);
    }

    GeosysError::Api {
        status: status.as_u16(),
        url: url.to_string(),
        message: text.trim().to_string(),
    }
    .into()
}
