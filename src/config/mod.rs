mod settings;


use std::path::Path;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};

use settings::PartialSettings;

pub use settings::{
    AmqpSettings, BackendKind, BackendSettings, BrokerSettings, DEFAULT_AMQP_URL,
    DEFAULT_PUBLISH_ENDPOINT, DEFAULT_SUBMISSION_ENDPOINT, LoggingSettings, Settings, ZmqSettings,
};

/// Environment variables override file values, e.g.
/// `RELAY_BROKER__SUBMISSION_ENDPOINT=ipc:///run/relay/submit.sock`.
const ENV_PREFIX: &str = "RELAY";

/// Loads the configuration from `config/default` (if present) and environment variables,
/// merged over the default settings.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder().add_source(File::with_name("config/default").required(false));
    build(builder)
}

/// Like [`load_config`] but reads an explicit file, which must exist.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let builder = Config::builder().add_source(File::from(path.as_ref()).required(true));
    build(builder)
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let settings = Settings {
        broker: BrokerSettings {
            submission_endpoint: partial
                .broker
                .and_then(|b| b.submission_endpoint)
                .unwrap_or(default.broker.submission_endpoint),
        },
        publishers: partial.publishers.unwrap_or(default.publishers),
        logging: LoggingSettings {
            level: partial
                .logging
                .and_then(|l| l.level)
                .unwrap_or(default.logging.level),
        },
    };

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.publishers.is_empty() {
        return Err(ConfigError::Message(
            "at least one publisher must be configured".to_string(),
        ));
    }
    Ok(())
}
