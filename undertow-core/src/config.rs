//! Centralized configuration for Undertow.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the codebase.

use std::time::Duration;

use crate::torrent::SelectorKind;

/// Central configuration for all Undertow components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct UndertowConfig {
    pub network: NetworkConfig,
    pub selection: SelectionConfig,
}

/// HTTP settings for fetching `.torrent` documents.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Whole-request timeout for metadata fetches
    pub fetch_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// Largest metainfo document accepted, in bytes
    pub max_metainfo_size: usize,
    /// Redirects followed before giving up
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            user_agent: "undertow/0.1.0",
            max_metainfo_size: 10 * 1024 * 1024, // 10 MiB
            max_redirects: 3,
        }
    }
}

/// Default piece selection for newly built clients.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub default_selector: SelectorKind,
    /// Seed for randomized selection, `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_selector: SelectorKind::RandomizedRarest,
            seed: None,
        }
    }
}

impl UndertowConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seconds) = env_value::<u64>("UNDERTOW_FETCH_TIMEOUT") {
            config.network.fetch_timeout = Duration::from_secs(seconds);
        }

        if let Some(size) = env_value::<usize>("UNDERTOW_MAX_METAINFO_SIZE") {
            config.network.max_metainfo_size = size;
        }

        if let Some(kind) = env_value::<SelectorKind>("UNDERTOW_SELECTOR") {
            config.selection.default_selector = kind;
        }

        if let Some(seed) = env_value::<u64>("UNDERTOW_SELECTION_SEED") {
            config.selection.seed = Some(seed);
        }

        config
    }

    /// Creates a configuration for deterministic tests.
    pub fn for_testing() -> Self {
        Self {
            network: NetworkConfig {
                fetch_timeout: Duration::from_secs(5),
                user_agent: "undertow/test",
                ..NetworkConfig::default()
            },
            selection: SelectionConfig {
                default_selector: SelectorKind::RandomizedRarest,
                seed: Some(42),
            },
        }
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {name}: {raw}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = UndertowConfig::default();

        assert_eq!(config.network.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.network.max_metainfo_size, 10 * 1024 * 1024);
        assert_eq!(config.network.max_redirects, 3);
        assert_eq!(
            config.selection.default_selector,
            SelectorKind::RandomizedRarest
        );
        assert_eq!(config.selection.seed, None);
    }

    #[test]
    fn test_testing_preset_is_seeded() {
        let config = UndertowConfig::for_testing();

        assert_eq!(config.selection.seed, Some(42));
        assert_eq!(config.network.user_agent, "undertow/test");
        assert!(config.network.fetch_timeout < NetworkConfig::default().fetch_timeout);
    }

    // Single test touching the environment, so no other test observes it.
    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("UNDERTOW_FETCH_TIMEOUT", "60");
            std::env::set_var("UNDERTOW_MAX_METAINFO_SIZE", "4096");
            std::env::set_var("UNDERTOW_SELECTOR", "sequential");
            std::env::set_var("UNDERTOW_SELECTION_SEED", "12345");
        }

        let config = UndertowConfig::from_env();

        assert_eq!(config.network.fetch_timeout, Duration::from_secs(60));
        assert_eq!(config.network.max_metainfo_size, 4096);
        assert_eq!(config.selection.default_selector, SelectorKind::Sequential);
        assert_eq!(config.selection.seed, Some(12345));

        unsafe {
            std::env::set_var("UNDERTOW_FETCH_TIMEOUT", "soon");
            std::env::set_var("UNDERTOW_SELECTOR", "fastest");
        }

        let config = UndertowConfig::from_env();
        assert_eq!(config.network.fetch_timeout, Duration::from_secs(30));
        assert_eq!(
            config.selection.default_selector,
            SelectorKind::RandomizedRarest
        );

        unsafe {
            std::env::remove_var("UNDERTOW_FETCH_TIMEOUT");
            std::env::remove_var("UNDERTOW_MAX_METAINFO_SIZE");
            std::env::remove_var("UNDERTOW_SELECTOR");
            std::env::remove_var("UNDERTOW_SELECTION_SEED");
        }
    }
}
