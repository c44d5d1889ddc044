//! Accepted enforcer configurations and their status conditions

use dashmap::DashMap;
use quota_types::{ConditionKind, ConfigError, EnforcerConfig, EnforcerId, StatusCondition};

#[derive(Debug, Clone, Default)]
struct Entry {
    /// Last accepted configuration, if any
    config: Option<EnforcerConfig>,
    conditions: Vec<StatusCondition>,
}

/// Registry of enforcer configurations.
///
/// A rejected update keeps the last accepted configuration running and
/// records a `ConfigInvalid` condition until a valid update arrives.
#[derive(Debug, Default)]
pub struct EnforcerRegistry {
    entries: DashMap<EnforcerId, Entry>,
}

impl EnforcerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an accepted configuration, clearing any `ConfigInvalid` condition
    pub fn apply(&self, config: EnforcerConfig) {
        let mut entry = self.entries.entry(config.id.clone()).or_default();
        entry
            .conditions
            .retain(|c| c.kind != ConditionKind::ConfigInvalid);
        entry.config = Some(config);
    }

    /// Record a rejected configuration
    pub fn reject(&self, id: &EnforcerId, error: &ConfigError) {
        let mut entry = self.entries.entry(id.clone()).or_default();
        entry
            .conditions
            .retain(|c| c.kind != ConditionKind::ConfigInvalid);
        entry
            .conditions
            .push(StatusCondition::new(ConditionKind::ConfigInvalid, error.to_string()));
    }

    /// Remove an enforcer. Returns whether it was known.
    pub fn remove(&self, id: &EnforcerId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn contains(&self, id: &EnforcerId) -> bool {
        self.entries.contains_key(id)
    }

    /// Accepted configuration for `id`
    pub fn get(&self, id: &EnforcerId) -> Option<EnforcerConfig> {
        self.entries.get(id).and_then(|e| e.config.clone())
    }

    pub fn conditions(&self, id: &EnforcerId) -> Vec<StatusCondition> {
        self.entries
            .get(id)
            .map(|e| e.conditions.clone())
            .unwrap_or_default()
    }

    /// Set a condition, keeping the original `since` if it is already present
    pub fn set_condition(&self, id: &EnforcerId, kind: ConditionKind, message: impl Into<String>) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            let message = message.into();
            match entry.conditions.iter_mut().find(|c| c.kind == kind) {
                Some(existing) => existing.message = message,
                None => entry.conditions.push(StatusCondition::new(kind, message)),
            }
        }
    }

    pub fn clear_condition(&self, id: &EnforcerId, kind: ConditionKind) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.conditions.retain(|c| c.kind != kind);
        }
    }

    /// All known identities, sorted
    pub fn ids(&self) -> Vec<EnforcerId> {
        let mut ids: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Every accepted configuration
    pub fn configs(&self) -> Vec<EnforcerConfig> {
        self.entries
            .iter()
            .filter_map(|e| e.config.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_types::ResourceThreshold;

    fn config(name: &str) -> EnforcerConfig {
        EnforcerConfig::new(EnforcerId::new("ops", name), "team-a")
            .with_threshold(ResourceThreshold::new("cpu", 80, 90))
    }

    #[test]
    fn test_rejection_keeps_last_accepted_config() {
        let registry = EnforcerRegistry::new();
        let id = EnforcerId::new("ops", "a");
        registry.apply(config("a"));

        registry.reject(&id, &ConfigError::MissingField("resourceThresholds"));

        assert!(registry.get(&id).is_some());
        let conditions = registry.conditions(&id);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].kind, ConditionKind::ConfigInvalid);

        registry.apply(config("a"));
        assert!(registry.conditions(&id).is_empty());
    }

    #[test]
    fn test_rejection_of_unknown_enforcer_is_tracked() {
        let registry = EnforcerRegistry::new();
        let id = EnforcerId::new("ops", "new");
        registry.reject(
            &id,
            &ConfigError::InvertedThresholds {
                resource: "cpu".into(),
                warning: 95,
                critical: 90,
            },
        );

        assert!(registry.contains(&id));
        assert!(registry.get(&id).is_none());
        assert!(registry.configs().is_empty());
    }

    #[test]
    fn test_condition_since_is_stable() {
        let registry = EnforcerRegistry::new();
        let id = EnforcerId::new("ops", "a");
        registry.apply(config("a"));

        registry.set_condition(&id, ConditionKind::EvaluationFailing, "first");
        let since = registry.conditions(&id)[0].since;
        registry.set_condition(&id, ConditionKind::EvaluationFailing, "second");

        let conditions = registry.conditions(&id);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message, "second");
        assert_eq!(conditions[0].since, since);

        registry.clear_condition(&id, ConditionKind::EvaluationFailing);
        assert!(registry.conditions(&id).is_empty());
    }

    #[test]
    fn test_remove() {
        let registry = EnforcerRegistry::new();
        registry.apply(config("a"));
        assert!(registry.remove(&EnforcerId::new("ops", "a")));
        assert!(!registry.remove(&EnforcerId::new("ops", "a")));
        assert!(registry.is_empty());
    }
}
