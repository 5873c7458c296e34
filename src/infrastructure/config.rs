use crate::domain::window::DEFAULT_DURATION_MINUTES;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub window: WindowSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreSettings {
    Influx(InfluxSettings),
    Memory(MemorySettings),
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MemorySettings {
    /// CSV export with a `Time` column and one column per tag
    #[serde(default)]
    pub seed_csv: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowSettings {
    pub default_duration_minutes: f64,
}

fn default_measurement() -> String {
    "process_data".to_string()
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("store.backend", "memory")?
        .set_default("window.default_duration_minutes", DEFAULT_DURATION_MINUTES)?)
}

/// Load `config/app.*`, overridden by `TREND__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(config::Environment::with_prefix("TREND").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn load(toml: &str) -> AppConfig {
        builder()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load("");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.window.default_duration_minutes, 60.0);
        assert!(matches!(config.store, StoreSettings::Memory(MemorySettings { seed_csv: None })));
    }

    #[test]
    fn test_influx_store() {
        let config = load(
            r#"
            [server]
            port = 9000

            [store]
            backend = "influx"
            host = "http://influx:8086/"
            token = "secret"
            database = "plant"
            retention_policy = "autogen"
            "#,
        );
        assert_eq!(config.server.port, 9000);
        let StoreSettings::Influx(influx) = config.store else {
            panic!("expected influx settings");
        };
        assert_eq!(influx.database, "plant");
        assert_eq!(influx.measurement, "process_data");
    }
}
