use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// Deployment stage of the Geosys platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Prod,
    Preprod,
}

/// Geographic deployment of the Geosys platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Na,
    Eu,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Preprod => "preprod",
        }
    }
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Na => "na",
            Region::Eu => "eu",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Prod),
            "preprod" | "test" => Ok(Environment::Preprod),
            other => bail!("unknown environment [{}] (expected prod or preprod)", other),
        }
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "na" => Ok(Region::Na),
            "eu" => Ok(Region::Eu),
            other => bail!("unknown region [{}] (expected na or eu)", other),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn api_url(region: Region, env: Environment) -> &'static str {
    match (region, env) {
        (Region::Na, Environment::Prod) => "https://api.geosys-na.net",
        (Region::Na, Environment::Preprod) => "https://api-pp.geosys-na.net",
        (Region::Eu, Environment::Prod) => "https://api.geosys-eu.net",
        (Region::Eu, Environment::Preprod) => "https://api-pp.geosys-eu.net",
    }
}

pub(crate) fn identity_url(region: Region, env: Environment) -> &'static str {
    match (region, env) {
        (Region::Na, Environment::Prod) => "https://identity.geosys-na.com/v2.1/connect/token",
        (Region::Na, Environment::Preprod) => {
            "https://identity.preprod.geosys-na.com/v2.1/connect/token"
        }
        (Region::Eu, Environment::Prod) => "https://identity.geosys-eu.com/v2.1/connect/token",
        (Region::Eu, Environment::Preprod) => {
            "https://identity.preprod.geosys-eu.com/v2.1/connect/token"
        }
    }
}
