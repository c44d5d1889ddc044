//! Enforcer manifests and the registry of known configuration kinds
//!
//! Configuration arrives as a manifest with `apiVersion`, `kind`,
//! `metadata` and `spec`. Which kinds are understood is decided by a
//! [`KindRegistry`] that callers build and pass in explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::enforcer::{EnforcerConfig, EnforcerSpec};
use crate::error::ConfigError;
use crate::ids::EnforcerId;

/// API version of the built-in enforcer kind
pub const ENFORCER_API_VERSION: &str = "quota.maple.dev/v1";

/// Kind name of the built-in enforcer kind
pub const ENFORCER_KIND: &str = "ResourceQuotaEnforcer";

/// Object metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name
    pub name: String,

    /// Namespace the object lives in
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// A configuration manifest as submitted by an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerManifest {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: serde_json::Value,
}

impl EnforcerManifest {
    /// Render a configuration back into the built-in manifest form
    pub fn from_config(config: &EnforcerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api_version: ENFORCER_API_VERSION.to_string(),
            kind: ENFORCER_KIND.to_string(),
            metadata: ObjectMeta {
                name: config.id.name().to_string(),
                namespace: config.id.namespace().to_string(),
            },
            spec: serde_json::to_value(&config.spec)
                .map_err(|e| ConfigError::Malformed(e.to_string()))?,
        })
    }
}

/// Decodes the `spec` of one manifest kind into an enforcer configuration
pub type KindDecoder = fn(&ObjectMeta, serde_json::Value) -> Result<EnforcerConfig, ConfigError>;

/// Registry of configuration kinds the core understands
#[derive(Clone, Default)]
pub struct KindRegistry {
    decoders: HashMap<(String, String), KindDecoder>,
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.decoders.keys().collect();
        kinds.sort();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

impl KindRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in enforcer kind registered
    pub fn with_builtin_kinds() -> Self {
        Self::new().register(ENFORCER_API_VERSION, ENFORCER_KIND, decode_enforcer_v1)
    }

    /// Register a decoder for a kind
    pub fn register(
        mut self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        decoder: KindDecoder,
    ) -> Self {
        self.decoders
            .insert((api_version.into(), kind.into()), decoder);
        self
    }

    /// Decode a manifest into a validated configuration
    pub fn decode(&self, manifest: EnforcerManifest) -> Result<EnforcerConfig, ConfigError> {
        let decoder = self
            .decoders
            .get(&(manifest.api_version.clone(), manifest.kind.clone()))
            .ok_or_else(|| ConfigError::UnknownKind {
                api_version: manifest.api_version.clone(),
                kind: manifest.kind.clone(),
            })?;

        if manifest.metadata.name.trim().is_empty() {
            return Err(ConfigError::MissingField("metadata.name"));
        }

        decoder(&manifest.metadata, manifest.spec)?.validated()
    }

    /// Decode a raw JSON manifest
    pub fn decode_json(&self, value: serde_json::Value) -> Result<EnforcerConfig, ConfigError> {
        let manifest: EnforcerManifest =
            serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        self.decode(manifest)
    }
}

fn decode_enforcer_v1(
    metadata: &ObjectMeta,
    spec: serde_json::Value,
) -> Result<EnforcerConfig, ConfigError> {
    let spec: EnforcerSpec =
        serde_json::from_value(spec).map_err(|e| ConfigError::Malformed(e.to_string()))?;
    Ok(EnforcerConfig {
        id: EnforcerId::new(&metadata.namespace, &metadata.name),
        spec,
    })
}

fn default_namespace() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> serde_json::Value {
        json!({
            "apiVersion": ENFORCER_API_VERSION,
            "kind": ENFORCER_KIND,
            "metadata": { "name": "team-a-quota", "namespace": "ops" },
            "spec": {
                "targetNamespace": "team-a",
                "resourceThresholds": [
                    { "resourceName": "cpu", "warningThresholdPercent": 70, "criticalThresholdPercent": 85 },
                    { "resourceName": "memory" }
                ],
                "actions": { "blockNewDeployments": true, "criticalAlertChannel": "http://hooks/critical" },
                "checkIntervalSeconds": 30
            }
        })
    }

    #[test]
    fn test_decode_builtin_kind() {
        let registry = KindRegistry::with_builtin_kinds();
        let config = registry.decode_json(manifest()).unwrap();

        assert_eq!(config.id, EnforcerId::new("ops", "team-a-quota"));
        assert_eq!(config.target_namespace(), "team-a");
        assert_eq!(config.thresholds().len(), 2);
        assert_eq!(config.thresholds()[1].warning_threshold_percent, 80);
        assert!(config.actions().block_new_deployments);
        assert!(config.actions().send_critical_alert);
        assert_eq!(config.spec.check_interval_seconds, 30);
    }

    #[test]
    fn test_empty_registry_rejects_everything() {
        let registry = KindRegistry::new();
        let err = registry.decode_json(manifest()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKind { .. }));
    }

    #[test]
    fn test_decode_validates() {
        let mut value = manifest();
        value["spec"]["resourceThresholds"][0]["warningThresholdPercent"] = json!(95);
        let err = KindRegistry::with_builtin_kinds()
            .decode_json(value)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedThresholds { .. }));
    }

    #[test]
    fn test_decode_malformed_spec() {
        let mut value = manifest();
        value["spec"] = json!({ "resourceThresholds": "nope" });
        let err = KindRegistry::with_builtin_kinds()
            .decode_json(value)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_manifest_round_trips_config() {
        let registry = KindRegistry::with_builtin_kinds();
        let config = registry.decode_json(manifest()).unwrap();
        let rendered = EnforcerManifest::from_config(&config).unwrap();
        assert_eq!(registry.decode(rendered).unwrap(), config);
    }
}
