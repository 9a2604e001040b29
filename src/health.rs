//! Health signals published by the bridge

use std::collections::BTreeMap;

/// Metric that is `1` once the speaker has loaded its configuration
pub const CONFIG_LOADED_METRIC: &str = "metallb_k8s_client_config_loaded_bool";
/// Metric that is `1` while the loaded configuration is stale
pub const CONFIG_STALE_METRIC: &str = "metallb_k8s_client_config_stale_bool";

/// Data key of the health record holding the "loaded" signal
pub const CONFIG_LOADED_KEY: &str = "configLoaded";
/// Data key of the health record holding the "stale" signal
pub const CONFIG_STALE_KEY: &str = "configStale";

/// One scrape worth of health signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    pub config_loaded: bool,
    pub config_stale: bool,
}

impl HealthSample {
    /// Writes both signals into a config map data section.
    /// Other entries are left untouched.
    pub fn apply_to(&self, data: &mut BTreeMap<String, String>) {
        data.insert(
            CONFIG_LOADED_KEY.to_string(),
            canonical_bool(self.config_loaded).to_string(),
        );
        data.insert(
            CONFIG_STALE_KEY.to_string(),
            canonical_bool(self.config_stale).to_string(),
        );
    }
}

/// The only two spellings ever written to the cluster
pub fn canonical_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_preserves_foreign_keys() {
        let mut data = BTreeMap::new();
        data.insert("foo".to_string(), "bar".to_string());
        data.insert(CONFIG_STALE_KEY.to_string(), "1".to_string());
        HealthSample {
            config_loaded: true,
            config_stale: false,
        }
        .apply_to(&mut data);

        assert_eq!(data.len(), 3);
        assert_eq!(data["foo"], "bar");
        assert_eq!(data[CONFIG_LOADED_KEY], "true");
        assert_eq!(data[CONFIG_STALE_KEY], "false");
    }
}
