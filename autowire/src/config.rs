//! Application configuration, created with opinionated default values, which can then be
//! overwritten by an optional `autowire.json` file and by environment variables prefixed with
//! `AUTOWIRE_`, e.g. `AUTOWIRE_AUTO_INJECT=0` disables auto-injection.

use autowire_di::global::DefaultContextOptions;
use autowire_di::resolver::ResolverOptions;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

const CONFIG_ENV_PREFIX: &str = "AUTOWIRE";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "autowire.json";

/// Resolution and logging configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplicationConfig {
    /// Enables registration and resolution. When disabled, nothing resolves.
    pub auto_inject: bool,
    /// Cache resolved instances per provider.
    pub singleton: bool,
    /// Fail resolution when a constructor parameter cannot be resolved.
    pub reject_incomplete: bool,
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Default level for the installed logger. Besides tracing level names, accepts `0` or
    /// `disable` to turn logging off and `1` for info. `2`, `3` and `verbose` all mean debug.
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            auto_inject: true,
            singleton: true,
            reject_incomplete: false,
            install_tracing_logger: true,
            log_level: "info".to_string(),
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            auto_inject: value.auto_inject.unwrap_or(default.auto_inject),
            singleton: value.singleton.unwrap_or(default.singleton),
            reject_incomplete: value
                .reject_incomplete
                .unwrap_or(default.reject_incomplete),
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            log_level: value.log_level.unwrap_or(default.log_level),
        }
    }
}

impl ApplicationConfig {
    /// Loads the config from [CONFIG_FILE] and environment variables.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            singleton: self.singleton,
            reject_incomplete: self.reject_incomplete,
        }
    }

    pub fn default_context_options(&self) -> DefaultContextOptions {
        DefaultContextOptions {
            auto_inject: self.auto_inject,
            resolver: self.resolver_options(),
        }
    }

    /// Parses [ApplicationConfig::log_level].
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        match self.log_level.trim().to_lowercase().as_str() {
            "0" | "disable" | "off" => Ok(LevelFilter::OFF),
            "1" => Ok(LevelFilter::INFO),
            "2" | "3" | "verbose" => Ok(LevelFilter::DEBUG),
            level => level
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::Message(format!("Invalid log level: {level}"))),
        }
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    auto_inject: Option<bool>,
    singleton: Option<bool>,
    reject_incomplete: Option<bool>,
    install_tracing_logger: Option<bool>,
    log_level: Option<String>,
}
