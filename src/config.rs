//! Resolver configuration, read from `~/.geolink/config.json`.
//!
//! Every field has a default; a missing or unreadable file yields
//! [`ResolverConfig::default`]. Partial files are merged over the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("geolink/", env!("CARGO_PKG_VERSION"), " (map-link-resolver)");

/// How a relay reports the URL its redirect chain ended at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStyle {
    /// The relay itself redirects; the final URL of the request is the answer.
    #[default]
    Redirect,
    /// The answer is in an `x-final-url` response header.
    Header,
    /// The answer is `status.url` in a JSON body.
    Json,
}

/// One third-party redirect-following relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    /// Endpoint template. `{url}` is replaced by the percent-encoded target,
    /// `{raw}` by the target verbatim.
    pub template: String,
    #[serde(default)]
    pub style: RelayStyle,
}

impl RelayConfig {
    pub fn target_for(&self, url: &str) -> String {
        self.template
            .replace("{url}", &urlencoding::encode(url))
            .replace("{raw}", url)
    }
}

fn default_relays() -> Vec<RelayConfig> {
    vec![
        RelayConfig {
            name: "allorigins".into(),
            template: "https://api.allorigins.win/get?url={url}".into(),
            style: RelayStyle::Json,
        },
        RelayConfig {
            name: "cors-anywhere".into(),
            template: "https://cors-anywhere.herokuapp.com/{raw}".into(),
            style: RelayStyle::Header,
        },
        RelayConfig {
            name: "thingproxy".into(),
            template: "https://thingproxy.freeboard.io/fetch/{raw}".into(),
            style: RelayStyle::Redirect,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Base URL of the Nominatim-compatible geocoder.
    pub nominatim_url: String,
    pub user_agent: String,
    /// Per-request timeout for every network call.
    pub timeout_secs: u64,
    pub max_redirects: u32,
    /// Relays tried, in order, when direct short-link resolution fails.
    pub relays: Vec<RelayConfig>,
    /// Skip all network calls.
    pub offline: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_secs: 8,
            max_redirects: 10,
            relays: default_relays(),
            offline: false,
        }
    }
}

impl ResolverConfig {
    /// Load from the default location (~/.geolink/config.json).
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Self {
        Self::read_file(path).unwrap_or_default()
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".geolink")
            .join("config.json")
    }

    fn read_file(path: &Path) -> Option<Self> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ResolverConfig::load_from(&dir.path().join("config.json"));
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.relays.len(), 3);
        assert_eq!(config.relays[0].name, "allorigins");
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "timeout_secs": 3, "offline": true }"#).unwrap();

        let config = ResolverConfig::load_from(&path);
        assert_eq!(config.timeout_secs, 3);
        assert!(config.offline);
        assert_eq!(config.nominatim_url, DEFAULT_NOMINATIM_URL);
        assert_eq!(config.relays, default_relays());
    }

    #[test]
    fn test_custom_relays() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "relays": [ { "name": "mine", "template": "https://r.test/?u={url}" } ] }"#,
        )
        .unwrap();

        let config = ResolverConfig::load_from(&path);
        assert_eq!(config.relays.len(), 1);
        assert_eq!(config.relays[0].style, RelayStyle::Redirect);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ResolverConfig::load_from(&path), ResolverConfig::default());
    }

    #[test]
    fn test_relay_target_encoding() {
        let relay = RelayConfig {
            name: "x".into(),
            template: "https://r.test/get?url={url}&raw={raw}".into(),
            style: RelayStyle::Json,
        };
        assert_eq!(
            relay.target_for("https://g.co/kgs/a b"),
            "https://r.test/get?url=https%3A%2F%2Fg.co%2Fkgs%2Fa%20b&raw=https://g.co/kgs/a b"
        );
    }
}
