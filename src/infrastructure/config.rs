use crate::application::transport::TransportStrategy;
use crate::domain::kpi::DEFAULT_WARNING_THRESHOLD;
use serde::Deserialize;

pub const DEFAULT_SOURCE_URL: &str = "https://docs.google.com/spreadsheets/d/1K8w405s3SthSLFbYdYT1PAnpnuzGMUOl0qxQDSiCKs8/export?format=csv&gid=69853061";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    pub alerts: AlertSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub default_url: String,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransportSettings {
    #[serde(default)]
    pub proxies: Vec<ProxyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    pub name: String,
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    pub warning_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Preferences file; empty keeps preferences in memory only
    #[serde(default)]
    pub preferences_path: String,
}

impl TransportSettings {
    /// Direct fetch first, then each proxy in configured order
    pub fn strategies(&self) -> Vec<TransportStrategy> {
        std::iter::once(TransportStrategy::Direct)
            .chain(self.proxies.iter().map(|p| TransportStrategy::Proxy {
                name: p.name.clone(),
                endpoint: p.endpoint.clone(),
            }))
            .collect()
    }
}

fn builder_with_defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("source.default_url", DEFAULT_SOURCE_URL)?
        .set_default("source.refresh_interval_secs", 30i64)?
        .set_default("source.request_timeout_secs", 20i64)?
        .set_default("alerts.warning_threshold", DEFAULT_WARNING_THRESHOLD)?
        .set_default("storage.preferences_path", "data/preferences.json")?)
}

/// Load `config/app.toml` (optional) overlaid with `TELEMETRY__*` environment variables
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder_with_defaults()?
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(config::Environment::with_prefix("TELEMETRY").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> AppConfig {
        builder_with_defaults()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = from_toml("");
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.source.default_url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.source.refresh_interval_secs, 30);
        assert_eq!(cfg.alerts.warning_threshold, 60.0);
        assert_eq!(cfg.transport.strategies(), vec![TransportStrategy::Direct]);
    }

    #[test]
    fn test_proxies_follow_direct() {
        let cfg = from_toml(
            r#"
            [source]
            refresh_interval_secs = 10

            [[transport.proxies]]
            name = "corsproxy.io"
            endpoint = "https://corsproxy.io/?"

            [[transport.proxies]]
            name = "allorigins"
            endpoint = "https://api.allorigins.win/raw?url="
            "#,
        );
        assert_eq!(cfg.source.refresh_interval_secs, 10);
        let names: Vec<String> = cfg
            .transport
            .strategies()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["direct", "corsproxy.io", "allorigins"]);
    }
}
