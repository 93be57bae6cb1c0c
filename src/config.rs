use crate::error::UnfluffedError;
use crate::model::CountryCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_DEBOUNCE_MS: u64 = 250;
const DEFAULT_PRICE_REFRESH_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: Url,
    pub country: CountryCode,
    pub no_cache: bool,
    pub debounce: Duration,
    pub price_refresh: Duration,
    pub request_timeout: Duration,
    pub cache_dir: PathBuf,
}

/// Values given on the command line; these win over everything else.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub backend_url: Option<String>,
    pub country: Option<String>,
    pub no_cache: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    defaults: ConfigDefaults,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigDefaults {
    backend_url: Option<String>,
    country: Option<String>,
    debounce_ms: Option<u64>,
    price_refresh_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn load(cli: CliOverrides) -> Result<Self, UnfluffedError> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("unfluffed");
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("unfluffed");

        let file_config = load_config_file(&config_dir);
        Self::resolve(cli, |key| std::env::var(key).ok(), file_config, cache_dir)
    }

    /// Priority: CLI flags → env vars → config file → defaults
    pub fn resolve(
        cli: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
        file_config: ConfigFile,
        cache_dir: PathBuf,
    ) -> Result<Self, UnfluffedError> {
        let defaults = file_config.defaults;

        let backend_url = cli
            .backend_url
            .or_else(|| env("UNFLUFFED_BACKEND_URL"))
            .or(defaults.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let country = match cli
            .country
            .or_else(|| env("UNFLUFFED_COUNTRY"))
            .or(defaults.country)
        {
            Some(code) => code.parse()?,
            None => CountryCode::default(),
        };

        let debounce_ms = defaults.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS);
        let price_refresh_secs = defaults
            .price_refresh_secs
            .unwrap_or(DEFAULT_PRICE_REFRESH_SECS);
        let request_timeout_secs = defaults
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        if price_refresh_secs == 0 || request_timeout_secs == 0 {
            return Err(UnfluffedError::Config(
                "price_refresh_secs and request_timeout_secs must be greater than zero"
                    .to_string(),
            ));
        }

        Ok(AppConfig {
            backend_url: parse_backend_url(&backend_url)?,
            country,
            no_cache: cli.no_cache,
            debounce: Duration::from_millis(debounce_ms),
            price_refresh: Duration::from_secs(price_refresh_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            cache_dir,
        })
    }
}

/// Endpoints are joined relative to the base, so its path must end in `/`.
pub fn parse_backend_url(raw: &str) -> Result<Url, UnfluffedError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| UnfluffedError::Config(format!("Invalid backend URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UnfluffedError::Config(format!(
            "Backend URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn load_config_file(config_dir: &Path) -> ConfigFile {
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed {}: {}", config_path.display(), e);
                ConfigFile::default()
            }),
            Err(_) => ConfigFile::default(),
        }
    } else {
        ConfigFile::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(
        cli: CliOverrides,
        env: &[(&str, &str)],
        file: &str,
    ) -> Result<AppConfig, UnfluffedError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let file_config: ConfigFile = toml::from_str(file).unwrap();
        AppConfig::resolve(
            cli,
            |key| env.get(key).cloned(),
            file_config,
            PathBuf::from("/tmp/unfluffed-test"),
        )
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = resolve(CliOverrides::default(), &[], "").unwrap();
        assert_eq!(config.backend_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.country, CountryCode::US);
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.price_refresh, Duration::from_secs(300));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = r#"
            [defaults]
            backend_url = "https://file.example"
            country = "ca"
            debounce_ms = 150
        "#;
        let env = [
            ("UNFLUFFED_BACKEND_URL", "https://env.example/proxy"),
            ("UNFLUFFED_COUNTRY", "uk"),
        ];

        let config = resolve(CliOverrides::default(), &env, file).unwrap();
        assert_eq!(config.backend_url.as_str(), "https://env.example/proxy/");
        assert_eq!(config.country, CountryCode::UK);
        assert_eq!(config.debounce, Duration::from_millis(150));

        let cli = CliOverrides {
            country: Some("US".to_string()),
            ..CliOverrides::default()
        };
        let config = resolve(cli, &env, file).unwrap();
        assert_eq!(config.country, CountryCode::US);

        let config = resolve(CliOverrides::default(), &[], file).unwrap();
        assert_eq!(config.backend_url.as_str(), "https://file.example/");
        assert_eq!(config.country, CountryCode::CA);
    }

    #[test]
    fn rejects_unknown_country_and_bad_urls() {
        let cli = CliOverrides {
            country: Some("de".to_string()),
            ..CliOverrides::default()
        };
        assert!(matches!(resolve(cli, &[], ""), Err(UnfluffedError::Config(_))));

        assert!(parse_backend_url("not a url").is_err());
        assert!(parse_backend_url("ftp://example.com").is_err());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let file = "[defaults]\nprice_refresh_secs = 0\n";
        assert!(resolve(CliOverrides::default(), &[], file).is_err());
    }
}
