// src/config.rs
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::crawl::types::CrawlError;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";

/// Environment-style key -> address lookup.
pub trait AddressLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads process environment variables (after `dotenvy` has run).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLookup;

impl AddressLookup for EnvLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl AddressLookup for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// First non-blank answer wins.
#[derive(Default)]
pub struct LayeredLookup {
    layers: Vec<Box<dyn AddressLookup>>,
}

impl LayeredLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, l: impl AddressLookup + 'static) -> Self {
        self.layers.push(Box::new(l));
        self
    }

    /// Environment first, then the optional sources file.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new()
            .layer(EnvLookup)
            .layer(load_addresses_default()?))
    }
}

impl AddressLookup for LayeredLookup {
    fn lookup(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|l| non_blank(l.lookup(key)))
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Configured value, else the registry default, else the key itself as a literal.
pub fn resolve_address(
    key: &str,
    default: Option<&str>,
    lookup: &dyn AddressLookup,
) -> Result<String, CrawlError> {
    let resolved = non_blank(lookup.lookup(key))
        .or_else(|| non_blank(default.map(str::to_string)))
        .or_else(|| non_blank(Some(key.to_string())));

    resolved.ok_or_else(|| CrawlError::Configuration {
        key: key.to_string(),
        cause: "key is blank and nothing is configured".to_string(),
    })
}

/// Load an address table from an explicit path. Supports TOML or JSON.
pub fn load_addresses_from(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source addresses from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_addresses(&content, ext.as_str())
}

/// Load addresses using env var + fallback:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
///
/// No file at all yields an empty table.
pub fn load_addresses_default() -> Result<BTreeMap<String, String>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_addresses_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from(DEFAULT_SOURCES_CONFIG_PATH);
    if toml_p.exists() {
        return load_addresses_from(&toml_p);
    }
    Ok(BTreeMap::new())
}

fn parse_addresses(s: &str, hint_ext: &str) -> Result<BTreeMap<String, String>> {
    #[derive(serde::Deserialize)]
    struct AddressFile {
        #[serde(default)]
        addresses: BTreeMap<String, String>,
    }

    let file: AddressFile = if hint_ext == "json" {
        serde_json::from_str(s).context("parsing json address file")?
    } else {
        toml::from_str(s).context("parsing toml address file")?
    };

    Ok(file
        .addresses
        .into_iter()
        .filter_map(|(k, v)| {
            let (k, v) = (k.trim().to_string(), v.trim().to_string());
            (!k.is_empty() && !v.is_empty()).then_some((k, v))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolution_order_is_lookup_default_key() {
        let t = table(&[("SJC_DAILY", "https://sjc.example/api")]);
        assert_eq!(
            resolve_address("SJC_DAILY", Some("https://fallback"), &t).unwrap(),
            "https://sjc.example/api"
        );
        assert_eq!(
            resolve_address("PNJ_DAILY", Some("https://giavang.pnj.com.vn/"), &t).unwrap(),
            "https://giavang.pnj.com.vn/"
        );
        assert_eq!(
            resolve_address("https://literal.example/feed", None, &t).unwrap(),
            "https://literal.example/feed"
        );
    }

    #[test]
    fn blank_values_fall_through() {
        let t = table(&[("DOJI_DAILY", "   ")]);
        assert_eq!(
            resolve_address("DOJI_DAILY", Some("https://doji.example"), &t).unwrap(),
            "https://doji.example"
        );
        let err = resolve_address("  ", None, &t).unwrap_err();
        assert!(matches!(err, CrawlError::Configuration { .. }));
    }

    #[test]
    fn layered_lookup_prefers_first_layer() {
        let l = LayeredLookup::new()
            .layer(table(&[("A", "")]))
            .layer(table(&[("A", "second")]));
        assert_eq!(l.lookup("A").as_deref(), Some("second"));
        assert_eq!(l.lookup("B"), None);
    }

    #[test]
    fn toml_and_json_address_files_parse() {
        let toml = "[addresses]\nBTMC_DAILY = \" http://btmc \"\nEMPTY = \"\"\n";
        let out = parse_addresses(toml, "toml").unwrap();
        assert_eq!(out, table(&[("BTMC_DAILY", "http://btmc")]));

        let json = r#"{"addresses": {"SJC_DAILY": "http://sjc"}}"#;
        let out = parse_addresses(json, "json").unwrap();
        assert_eq!(out, table(&[("SJC_DAILY", "http://sjc")]));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not read
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_SOURCES_CONFIG_PATH);

        assert!(load_addresses_default().unwrap().is_empty());

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_SOURCES_CONFIG_PATH),
            "[addresses]\nSJC_DAILY = \"http://from-file\"\n",
        )
        .unwrap();
        assert_eq!(
            load_addresses_default().unwrap(),
            table(&[("SJC_DAILY", "http://from-file")])
        );

        let p_env = tmp.path().join("override.json");
        fs::write(&p_env, r#"{"addresses": {"SJC_DAILY": "http://from-env"}}"#).unwrap();
        env::set_var(ENV_SOURCES_CONFIG_PATH, p_env.display().to_string());
        assert_eq!(
            load_addresses_default().unwrap(),
            table(&[("SJC_DAILY", "http://from-env")])
        );

        env::set_var(ENV_SOURCES_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(load_addresses_default().is_err());

        env::remove_var(ENV_SOURCES_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
