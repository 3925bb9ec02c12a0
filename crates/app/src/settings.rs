//! Application settings, read from an optional `settings.toml` in the
//! working directory and overridden by `WALLET__<SECTION>__<KEY>`
//! environment variables, e.g. `WALLET__AUTH__SECRET`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 3000
//! database = { sqlite = "./wallet.db" }
//!
//! [auth]
//! secret = "change-me"
//! token_ttl_secs = 3600
//!
//! [engine]
//! store_timeout_ms = 5000
//! transfer_fee_bps = 100
//! reference_prefix = "TRX"
//! pin_hash_cost = 12
//! ```
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl_secs() -> u64 {
    3600
}

impl Auth {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Engine {
    pub store_timeout_ms: Option<u64>,
    /// Peer transfer fee in basis points.
    pub transfer_fee_bps: Option<i64>,
    pub reference_prefix: Option<String>,
    pub pin_hash_cost: Option<u32>,
}

impl Engine {
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(engine::DEFAULT_STORE_TIMEOUT)
    }

    pub fn fee_policy(&self) -> engine::FeePolicy {
        self.transfer_fee_bps
            .map(|bps| engine::FeePolicy::new(engine::FeeRate::from_basis_points(bps)))
            .unwrap_or_default()
    }

    pub fn references(&self) -> Result<engine::ReferenceGenerator, engine::EngineError> {
        match &self.reference_prefix {
            Some(prefix) => engine::ReferenceGenerator::with_prefix(prefix),
            None => Ok(engine::ReferenceGenerator::default()),
        }
    }

    pub fn pin_hash_cost(&self) -> u32 {
        self.pin_hash_cost.unwrap_or(engine::DEFAULT_PIN_HASH_COST)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(Environment::with_prefix("WALLET").separator("__")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Result<Settings, ConfigError> {
        Settings::from_config(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn full_settings_are_read() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            bind = "0.0.0.0"
            port = 8080
            database = { sqlite = "./wallet.db" }

            [auth]
            secret = "s3cret"
            token_ttl_secs = 60

            [engine]
            store_timeout_ms = 250
            transfer_fee_bps = 50
            reference_prefix = "WAL"
            pin_hash_cost = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.server.port, 8080);
        assert!(matches!(settings.server.database, Database::Sqlite(ref p) if p == "./wallet.db"));
        assert_eq!(settings.auth.token_ttl(), Duration::from_secs(60));
        assert_eq!(settings.engine.store_timeout(), Duration::from_millis(250));
        assert_eq!(
            settings.engine.fee_policy(),
            engine::FeePolicy::new(engine::FeeRate::from_basis_points(50))
        );
        let reference = settings.engine.references().unwrap().next_reference();
        assert!(reference.as_str().starts_with("WAL"));
        assert_eq!(settings.engine.pin_hash_cost(), 10);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = "memory"

            [auth]
            secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "info");
        assert!(settings.server.bind.is_none());
        assert!(matches!(settings.server.database, Database::Memory));
        assert_eq!(settings.auth.token_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.engine.store_timeout(), engine::DEFAULT_STORE_TIMEOUT);
        assert_eq!(settings.engine.fee_policy(), engine::FeePolicy::default());
        assert_eq!(settings.engine.pin_hash_cost(), engine::DEFAULT_PIN_HASH_COST);
    }

    #[test]
    fn bad_reference_prefix_is_reported() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = "memory"

            [auth]
            secret = "s3cret"

            [engine]
            reference_prefix = "no spaces"
            "#,
        )
        .unwrap();
        assert!(settings.engine.references().is_err());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(parse("[server]\nport = 3000\ndatabase = \"memory\"\n").is_err());
    }
}
