//! Engine configuration, populated from environment variables.

use std::collections::BTreeSet;

/// Runtime configuration for assembly and validation.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SGRAPH_SEQUENTIAL` | unset | Run validation rules one after another instead of on the rayon pool |
/// | `SGRAPH_ALLOW_UNKNOWN_TRAITS` | unset | Report unknown traits as warnings instead of errors |
/// | `SGRAPH_DISABLE_RULES` | empty | Comma-separated rule names to skip (e.g. `Paginated,AuthTrait`) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Run rules concurrently.
    pub parallel: bool,

    /// Traits with no definition are a warning, and their values are kept.
    pub allow_unknown_traits: bool,

    /// Rule names, as returned by `Validator::name`, that are not run.
    pub disabled_rules: BTreeSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            allow_unknown_traits: false,
            disabled_rules: BTreeSet::new(),
        }
    }
}

impl EngineConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](EngineConfig::from_env) with a custom variable
    /// source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).is_some_and(|v| is_truthy(&v));

        let disabled_rules = lookup("SGRAPH_DISABLE_RULES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            parallel: !flag("SGRAPH_SEQUENTIAL"),
            allow_unknown_traits: flag("SGRAPH_ALLOW_UNKNOWN_TRAITS"),
            disabled_rules,
        }
    }

    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled_rules.contains(rule)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert!(config.parallel);
        assert!(config.is_enabled("Paginated"));
    }

    #[test]
    fn reads_flags_and_rule_list() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SGRAPH_SEQUENTIAL", "true"),
            ("SGRAPH_ALLOW_UNKNOWN_TRAITS", "1"),
            ("SGRAPH_DISABLE_RULES", "Paginated, AuthTrait,,"),
        ]));
        assert!(!config.parallel);
        assert!(config.allow_unknown_traits);
        assert!(!config.is_enabled("Paginated"));
        assert!(!config.is_enabled("AuthTrait"));
        assert!(config.is_enabled("Target"));
        assert_eq!(config.disabled_rules.len(), 2);
    }

    #[test]
    fn falsy_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[("SGRAPH_SEQUENTIAL", "no")]));
        assert!(config.parallel);
    }
}
