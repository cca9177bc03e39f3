//! Mapping between canonical base names, environment-qualified display
//! names, and filesystem-safe file names.
//!
//! The remote service only knows display names (`Order Sync-prod`); the
//! operator config and Git tags only know base names (`Order Sync`). This
//! module is the sole authority for going back and forth.

use crate::config::{DeployConfig, Environment, UnmatchedSuffixPolicy};
use crate::error::{FlowDeployError, Result};

/// Suffix codec built from the validated configuration.
///
/// Cheap to construct and clone; holds its own copy of the suffix table so it
/// can be handed to engines without tying their lifetimes to the config.
#[derive(Debug, Clone)]
pub struct NameCodec {
    /// Suffix table ordered longest-suffix-first so lookup is unambiguous
    suffixes: Vec<(Environment, String)>,
    policy: UnmatchedSuffixPolicy,
}

impl NameCodec {
    /// Build a codec from a validated configuration
    pub fn new(config: &DeployConfig) -> Self {
        let mut suffixes: Vec<(Environment, String)> = config
            .suffixes
            .iter()
            .map(|(env, suffix)| (*env, suffix.clone()))
            .collect();
        // Longest first: validation guarantees no suffix is a suffix of
        // another, but longest-first keeps matching order-independent anyway.
        suffixes.sort_by_key(|(_, s)| std::cmp::Reverse(s.len()));
        Self {
            suffixes,
            policy: config.on_unmatched_suffix,
        }
    }

    /// The configured suffix for an environment
    pub fn suffix_for(&self, env: Environment) -> Result<&str> {
        self.suffixes
            .iter()
            .find(|(e, _)| *e == env)
            .map(|(_, s)| s.as_str())
            .ok_or_else(|| {
                FlowDeployError::Config(format!("No suffix configured for environment '{env}'"))
            })
    }

    /// Render a base name to its display name in an environment
    pub fn display_name(&self, base_name: &str, env: Environment) -> Result<String> {
        Ok(format!("{}{}", base_name, self.suffix_for(env)?))
    }

    /// Strip the matching environment suffix from a display name.
    ///
    /// A name matching no configured suffix is returned unchanged: such
    /// entities are treated as unmanaged/legacy, not as errors.
    pub fn base_name<'a>(&self, display_name: &'a str) -> &'a str {
        for (_, suffix) in &self.suffixes {
            if let Some(stripped) = display_name.strip_suffix(suffix.as_str()) {
                return stripped;
            }
        }
        display_name
    }

    /// The environment a display name belongs to.
    ///
    /// Returns `None` for an unmatched name under the default policy, or
    /// `Some(Dev)` under the legacy `default-dev` policy.
    pub fn environment_of(&self, display_name: &str) -> Option<Environment> {
        for (env, suffix) in &self.suffixes {
            if display_name.ends_with(suffix.as_str()) {
                return Some(*env);
            }
        }
        match self.policy {
            UnmatchedSuffixPolicy::Unknown => None,
            UnmatchedSuffixPolicy::DefaultDev => Some(Environment::Dev),
        }
    }

    /// Derive the export file name for a display name.
    ///
    /// The environment suffix is stripped first, so the dev and prod exports
    /// of one base name share a single file. Characters outside
    /// `[A-Za-z0-9 _-]` are dropped, whitespace runs collapse to single
    /// underscores, and the result is lowercased with a `.json` extension.
    ///
    /// Deterministic but not collision-free: `Order Sync` and `order_sync`
    /// both map to `order_sync.json` and will silently overwrite each other
    /// on export. Known hazard, documented rather than detected.
    pub fn file_name(&self, display_name: &str) -> String {
        let base = self.base_name(display_name);

        let mut result = String::with_capacity(base.len() + 5);
        let mut pending_separator = false;
        for c in base.chars() {
            if c.is_whitespace() {
                pending_separator = !result.is_empty();
            } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                if pending_separator {
                    result.push('_');
                    pending_separator = false;
                }
                result.extend(c.to_lowercase());
            }
            // Everything else is dropped without acting as a separator
        }
        result.push_str(".json");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeployConfig, ServerConfig};
    use std::collections::BTreeMap;

    fn codec_with_policy(policy: UnmatchedSuffixPolicy) -> NameCodec {
        let config = DeployConfig {
            server: ServerConfig {
                base_url: "http://localhost".to_string(),
                api_key: None,
            },
            backup_before_deploy: true,
            max_backups_to_keep: 10,
            on_unmatched_suffix: policy,
            suffixes: {
                let mut map = BTreeMap::new();
                map.insert(Environment::Dev, "-dev".to_string());
                map.insert(Environment::Staging, "-staging".to_string());
                map.insert(Environment::Prod, "-prod".to_string());
                map
            },
            workflows: Vec::new(),
        };
        NameCodec::new(&config)
    }

    fn codec() -> NameCodec {
        codec_with_policy(UnmatchedSuffixPolicy::Unknown)
    }

    #[test]
    fn test_suffix_round_trip() {
        let codec = codec();
        for env in Environment::ALL {
            let display = codec.display_name("Order Sync", env).unwrap();
            assert_eq!(codec.base_name(&display), "Order Sync");
            assert_eq!(codec.environment_of(&display), Some(env));
        }
    }

    #[test]
    fn test_unmatched_name_returned_unchanged() {
        let codec = codec();
        assert_eq!(codec.base_name("Legacy Flow"), "Legacy Flow");
    }

    #[test]
    fn test_unmatched_policy_unknown() {
        let codec = codec();
        assert_eq!(codec.environment_of("Legacy Flow"), None);
    }

    #[test]
    fn test_unmatched_policy_default_dev() {
        let codec = codec_with_policy(UnmatchedSuffixPolicy::DefaultDev);
        assert_eq!(codec.environment_of("Legacy Flow"), Some(Environment::Dev));
        // Matched names are unaffected by the policy
        assert_eq!(codec.environment_of("X-prod"), Some(Environment::Prod));
    }

    #[test]
    fn test_file_name_strips_suffix_first() {
        let codec = codec();
        assert_eq!(codec.file_name("Order Sync-dev"), "order_sync.json");
        assert_eq!(codec.file_name("Order Sync-prod"), "order_sync.json");
    }

    #[test]
    fn test_file_name_collision_hazard() {
        // Two distinct base names normalizing to the same file name is the
        // documented behavior, not an accident.
        let codec = codec();
        assert_eq!(codec.file_name("Order Sync"), "order_sync.json");
        assert_eq!(codec.file_name("order_sync"), "order_sync.json");
    }

    #[test]
    fn test_file_name_determinism_and_cleanup() {
        let codec = codec();
        assert_eq!(codec.file_name("Order   Sync"), "order_sync.json");
        assert_eq!(codec.file_name("Order Sync (v2)!"), "order_sync_v2.json");
        assert_eq!(codec.file_name("Order Sync"), codec.file_name("Order Sync"));
    }

    #[test]
    fn test_suffix_for_unconfigured_environment() {
        let mut config = DeployConfig {
            server: ServerConfig {
                base_url: "http://localhost".to_string(),
                api_key: None,
            },
            backup_before_deploy: true,
            max_backups_to_keep: 10,
            on_unmatched_suffix: UnmatchedSuffixPolicy::Unknown,
            suffixes: BTreeMap::new(),
            workflows: Vec::new(),
        };
        config.suffixes.insert(Environment::Dev, "-dev".to_string());
        config
            .suffixes
            .insert(Environment::Prod, "-prod".to_string());
        let codec = NameCodec::new(&config);
        assert!(codec.suffix_for(Environment::Staging).is_err());
    }
}
