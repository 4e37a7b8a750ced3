use anyhow::Result;
use chrono::Utc;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Credentials;
use crate::error::GeosysError;
use crate::util::cookie_value;

/// Seconds before `expires_at` at which a token is treated as expired.
const EXPIRY_SKEW_SECS: f64 = 60.0;

/// OAuth2 session token issued by the Geosys identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub scope: String,
    /// UNIX timestamp (seconds).
    pub expires_at: f64,
    pub refresh_token: String,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at - EXPIRY_SKEW_SECS <= now_secs()
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_at: Option<f64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Resource-owner password grant.
pub(crate) fn password_grant(
    http: &HttpClient,
    token_url: &str,
    creds: &Credentials,
    timeout: Duration,
) -> Result<Token> {
    let form = [
        ("grant_type", "password"),
        ("username", creds.username.as_str()),
        ("password", creds.password.as_str()),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
    ];
    request_token(http, token_url, &form, timeout)
}

pub(crate) fn refresh_grant(
    http: &HttpClient,
    token_url: &str,
    creds: &Credentials,
    refresh_token: &str,
    timeout: Duration,
) -> Result<Token> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
    ];
    let mut token = request_token(http, token_url, &form, timeout)?;
    if token.refresh_token.is_empty() {
        token.refresh_token = refresh_token.to_string();
    }
    Ok(token)
}

fn request_token(
    http: &HttpClient,
    token_url: &str,
    form: &[(&str, &str)],
    timeout: Duration,
) -> Result<Token> {
    let auth_err = |reason: String| GeosysError::Authentication {
        url: token_url.to_string(),
        reason,
    };

    tracing::debug!(url = token_url, "POST token");
    let resp = http
        .post(token_url)
        .timeout(timeout)
        .form(form)
        .send()
        .map_err(|e| auth_err(format!("could not reach identity service: {}", e)))?;

    let status = resp.status();
    let cookie_refresh = cookie_value(resp.headers(), "refresh_token");
    let text = resp.text().unwrap_or_default();

    if !status.is_success() {
        let reason = match serde_json::from_str::<IdentityError>(&text) {
            Ok(IdentityError {
                error: Some(error),
                error_description,
            }) => match error_description {
                Some(d) => format!("HTTP {}: {} ({})", status.as_u16(), error, d),
                None => format!("HTTP {}: {}", status.as_u16(), error),
            },
            _ => format!("HTTP {}: {}", status.as_u16(), text.trim()),
        };
        return Err(auth_err(reason).into());
    }

    let reply: TokenReply = serde_json::from_str(&text)
        .map_err(|e| auth_err(format!("unexpected token response: {}", e)))?;

    Ok(Token {
        expires_at: reply
            .expires_at
            .unwrap_or_else(|| now_secs() + reply.expires_in as f64),
        access_token: reply.access_token,
        expires_in: reply.expires_in,
        token_type: reply.token_type.unwrap_or_else(|| "Bearer".to_string()),
        scope: reply.scope.unwrap_or_default(),
        refresh_token: reply.refresh_token.or(cookie_refresh).unwrap_or_default(),
    })
}
