use crate::prelude::*;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Host carrying the TCP-bridged serial link to the SP PRO.
    pub host: String,

    #[serde(default = "Config::default_port")]
    pub port: u16,

    #[serde(default = "Config::default_password")]
    pub password: String,

    /// Seconds between poll cycles.
    #[serde(default = "Config::default_interval")]
    pub interval: u64,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    pub influx: Influx,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub url: String,
    pub database: String,

    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn new(file: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file)
            .map_err(|err| anyhow!("error reading config {}: {}", file, err))?;

        Ok(serde_yaml::from_str(&content)?)
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_password() -> String {
        "Selectronic SP PRO".to_string()
    }

    fn default_interval() -> u64 {
        15
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_enabled() -> bool {
        true
    }
}
