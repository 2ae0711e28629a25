use std::env;
use std::path::PathBuf;

use crate::finder::DEFAULT_TOP_N;
use crate::geocoder::DEFAULT_GEOCODER_URL;

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Schedule CSV location: an http(s) URL or a file path
    pub schedule: Option<String>,
    /// Geocoder base URL
    pub geocoder_url: String,
    /// Results per search
    pub top_n: usize,
    /// JSON roster file; the built-in roster is used when unset
    pub roster: Option<PathBuf>,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: None,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            top_n: DEFAULT_TOP_N,
            roster: None,
            port: 3000,
        }
    }
}

impl Config {
    /// Read `DOGWISE_SCHEDULE_URL`, `DOGWISE_GEOCODER_URL`, `DOGWISE_TOP_N`,
    /// `DOGWISE_ROSTER` and `PORT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            schedule: non_empty("DOGWISE_SCHEDULE_URL"),
            geocoder_url: non_empty("DOGWISE_GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            top_n: non_empty("DOGWISE_TOP_N")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.top_n),
            roster: non_empty("DOGWISE_ROSTER").map(PathBuf::from),
            port: non_empty("PORT")
                .and_then(|p| p.trim().parse::<u16>().ok())
                .unwrap_or(defaults.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.geocoder_url, "https://api.zippopotam.us");
        assert_eq!(config.top_n, 5);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DOGWISE_SCHEDULE_URL", "https://example.com/sheet.csv"),
            ("DOGWISE_GEOCODER_URL", "http://localhost:8080"),
            ("DOGWISE_TOP_N", "3"),
            ("DOGWISE_ROSTER", "roster.json"),
            ("PORT", "8081"),
        ]);
        assert_eq!(config.schedule.as_deref(), Some("https://example.com/sheet.csv"));
        assert_eq!(config.geocoder_url, "http://localhost:8080");
        assert_eq!(config.top_n, 3);
        assert_eq!(config.roster, Some(PathBuf::from("roster.json")));
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("DOGWISE_SCHEDULE_URL", "  "),
            ("DOGWISE_TOP_N", "0"),
            ("PORT", "not-a-port"),
        ]);
        assert_eq!(config.schedule, None);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.port, 3000);
    }
}
