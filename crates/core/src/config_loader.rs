use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging defaults, TOML,
    /// environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("QUORUM_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }

    /// Loads configuration with a profile overlay, e.g. `Config.live.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("QUORUM_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TradeMode;
    use figment::Jail;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("does/not/exist.toml")
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.mode, TradeMode::Paper);
            assert_eq!(config.trading.capacity, 3);
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                mode = "live"

                [trading]
                watchlist = ["SOLUSDT"]
                capacity = 5
                "#,
            )?;
            jail.set_env("QUORUM_EXCHANGE__API_KEY", "k");
            jail.set_env("QUORUM_EXCHANGE__API_SECRET", "s");

            let config = ConfigLoader::load_from("Config.toml")
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.mode, TradeMode::Live);
            assert_eq!(config.trading.watchlist, vec!["SOLUSDT".to_string()]);
            assert_eq!(config.trading.capacity, 5);
            assert_eq!(config.exchange.api_key, "k");
            // Untouched sections keep their defaults.
            assert_eq!(config.scheduler.scan_interval_secs, 900);
            Ok(())
        });
    }
}
