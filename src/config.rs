use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::environment::{self, Environment, Region};

/// OAuth2 client and user credentials for the Geosys identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub environment: Environment,
    pub region: Region,
    /// Base API URL, e.g. `https://api.geosys-na.net`.
    pub api_url: String,
    /// OAuth2 token endpoint.
    pub identity_url: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

impl ClientConfig {
    /// Configuration targeting the public endpoints of `environment`/`region`.
    pub fn new(credentials: Credentials, environment: Environment, region: Region) -> Self {
        Self {
            credentials,
            environment,
            region,
            api_url: environment::api_url(region, environment).to_string(),
            identity_url: environment::identity_url(region, environment).to_string(),
            verify: true,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = url.into();
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

#[derive(Debug, Default)]
struct RcConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
    env: Option<String>,
    region: Option<String>,
    api_url: Option<String>,
    identity_url: Option<String>,
    verify: Option<bool>,
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        let v = Some(value.to_string());
        match key {
            "client_id" => self.client_id = v,
            "client_secret" => self.client_secret = v,
            "username" => self.username = v,
            "password" => self.password = v,
            "env" => self.env = v,
            "region" => self.region = v,
            "api_url" => self.api_url = v,
            "identity_url" => self.identity_url = v,
            "verify" => self.verify = Some(parse_flag(value)),
            _ => {}
        }
    }

    /// True when every key is set, so no rc file can contribute anything.
    fn is_full(&self) -> bool {
        self.client_id.is_some()
            && self.client_secret.is_some()
            && self.username.is_some()
            && self.password.is_some()
            && self.env.is_some()
            && self.region.is_some()
            && self.api_url.is_some()
            && self.identity_url.is_some()
            && self.verify.is_some()
    }
}

/// Loads configuration from environment variables and/or `.geosysrc`.
pub(crate) fn load_config() -> Result<ClientConfig> {
    load_config_with(|k| std::env::var(k).ok(), &rc_candidates())
}

fn load_config_with<F>(env: F, rc_candidates: &[PathBuf]) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = RcConfig {
        client_id: env("API_CLIENT_ID"),
        client_secret: env("API_CLIENT_SECRET"),
        username: env("API_USERNAME"),
        password: env("API_PASSWORD"),
        env: env("GEOSYS_ENV"),
        region: env("GEOSYS_REGION"),
        api_url: env("GEOSYS_API_URL"),
        identity_url: env("GEOSYS_IDENTITY_URL"),
        verify: env("GEOSYS_VERIFY").map(|v| parse_flag(&v)),
    };

    if !cfg.is_full() {
        if let Some(rc_path) = rc_candidates.iter().find(|p| p.exists()) {
            let file = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            cfg.client_id = cfg.client_id.or(file.client_id);
            cfg.client_secret = cfg.client_secret.or(file.client_secret);
            cfg.username = cfg.username.or(file.username);
            cfg.password = cfg.password.or(file.password);
            cfg.env = cfg.env.or(file.env);
            cfg.region = cfg.region.or(file.region);
            cfg.api_url = cfg.api_url.or(file.api_url);
            cfg.identity_url = cfg.identity_url.or(file.identity_url);
            cfg.verify = cfg.verify.or(file.verify);
        }
    }

    let client_id = require(cfg.client_id, "client_id", "API_CLIENT_ID", rc_candidates)?;
    let client_secret = require(
        cfg.client_secret,
        "client_secret",
        "API_CLIENT_SECRET",
        rc_candidates,
    )?;
    let username = require(cfg.username, "username", "API_USERNAME", rc_candidates)?;
    let password = require(cfg.password, "password", "API_PASSWORD", rc_candidates)?;

    let environment = match cfg.env {
        Some(v) => v.parse()?,
        None => Environment::default(),
    };
    let region = match cfg.region {
        Some(v) => v.parse()?,
        None => Region::default(),
    };

    let mut out = ClientConfig::new(
        Credentials::new(client_id, client_secret, username, password),
        environment,
        region,
    )
    .with_verify(cfg.verify.unwrap_or(true));
    if let Some(url) = cfg.api_url {
        out = out.with_api_url(url);
    }
    if let Some(url) = cfg.identity_url {
        out = out.with_identity_url(url);
    }
    Ok(out)
}

fn require(
    value: Option<String>,
    rc_key: &str,
    env_key: &str,
    rc_candidates: &[PathBuf],
) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => {
            if !rc_candidates.is_empty() {
                bail!(
                    "Missing configuration: {} (set {} or put `{}:` in one of: {})",
                    rc_key,
                    env_key,
                    rc_key,
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            bail!(
                "Missing configuration: {} (set {} or create .geosysrc)",
                rc_key,
                env_key
            );
        }
    }
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // `password:` may sit on one line with the value on the next.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // URLs contain colons too, so only a known `key:` prefix ends the continuation.
            if !starts_with_key(line) {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                cfg.set(k, v);
            }
        }
    }

    cfg
}

const RC_KEYS: &[&str] = &[
    "client_id",
    "client_secret",
    "username",
    "password",
    "env",
    "region",
    "api_url",
    "identity_url",
    "verify",
];

fn starts_with_key(line: &str) -> bool {
    line.split_once(':')
        .map(|(k, _)| RC_KEYS.contains(&k.trim()))
        .unwrap_or(false)
}

fn parse_flag(v: &str) -> bool {
    !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) GEOSYS_RC (explicit)
    // 2) ./.geosysrc
    // 3) ~/.geosysrc
    if let Ok(p) = std::env::var("GEOSYS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".geosysrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".geosysrc"));
    }
    v
}
