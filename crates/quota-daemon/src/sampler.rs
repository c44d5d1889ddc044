//! Usage sampling
//!
//! The sampler answers "how much of each named resource is namespace N
//! using, and what is its limit". It is a pure query with no side effects.

use async_trait::async_trait;
use dashmap::DashMap;
use quota_types::ResourceUsage;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Usage query failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    /// Source unreachable, timed out or answered with garbage
    #[error("usage source unavailable: {0}")]
    Transient(String),

    /// The namespace does not exist
    #[error("namespace not found: {0}")]
    NotFound(String),
}

/// Source of per-namespace resource usage
#[async_trait]
pub trait UsageSampler: Send + Sync {
    /// Sample `resources` in `namespace`.
    ///
    /// Resources the source knows nothing about are left out of the result.
    async fn sample(
        &self,
        namespace: &str,
        resources: &[String],
    ) -> Result<Vec<ResourceUsage>, SampleError>;
}

/// Usage table held in memory
#[derive(Debug, Default)]
pub struct StaticUsageSampler {
    namespaces: DashMap<String, Vec<ResourceUsage>>,
}

impl StaticUsageSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a namespace table
    pub fn from_table(table: HashMap<String, Vec<ResourceUsage>>) -> Self {
        let sampler = Self::new();
        for (namespace, usage) in table {
            sampler.namespaces.insert(namespace, usage);
        }
        sampler
    }

    /// Replace all usage for a namespace
    pub fn set_namespace(&self, namespace: impl Into<String>, usage: Vec<ResourceUsage>) {
        self.namespaces.insert(namespace.into(), usage);
    }

    /// Insert or replace the usage of a single resource
    pub fn set_usage(&self, namespace: &str, usage: ResourceUsage) {
        let mut entry = self.namespaces.entry(namespace.to_string()).or_default();
        match entry
            .iter()
            .position(|u| u.resource_name == usage.resource_name)
        {
            Some(index) => entry[index] = usage,
            None => entry.push(usage),
        }
    }

    /// Forget a namespace; later samples answer `NotFound`
    pub fn remove_namespace(&self, namespace: &str) {
        self.namespaces.remove(namespace);
    }
}

#[async_trait]
impl UsageSampler for StaticUsageSampler {
    async fn sample(
        &self,
        namespace: &str,
        resources: &[String],
    ) -> Result<Vec<ResourceUsage>, SampleError> {
        let usage = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| SampleError::NotFound(namespace.to_string()))?;

        Ok(usage
            .iter()
            .filter(|u| resources.contains(&u.resource_name))
            .cloned()
            .collect())
    }
}

/// Usage from a remote reporting service.
///
/// Issues `GET {base}/namespaces/{namespace}/usage?resources=a,b` and
/// expects a JSON array of `{resourceName, current, limit}`.
#[derive(Debug, Clone)]
pub struct HttpUsageSampler {
    client: Client,
    base_url: Url,
}

impl HttpUsageSampler {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SampleError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SampleError::Transient(format!("invalid usage service URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SampleError::Transient(format!(
                "usage service URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SampleError::Transient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Usage endpoint for a namespace, with the name percent-encoded as one segment
    fn usage_url(&self, namespace: &str) -> Result<Url, SampleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SampleError::Transient(format!("invalid usage service URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(&["namespaces", namespace, "usage"]);
        Ok(url)
    }
}

#[async_trait]
impl UsageSampler for HttpUsageSampler {
    async fn sample(
        &self,
        namespace: &str,
        resources: &[String],
    ) -> Result<Vec<ResourceUsage>, SampleError> {
        let url = self.usage_url(namespace)?;

        let response = self
            .client
            .get(url)
            .query(&[("resources", resources.join(","))])
            .send()
            .await
            .map_err(|e| SampleError::Transient(format!("usage request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SampleError::NotFound(namespace.to_string())),
            status if !status.is_success() => {
                return Err(SampleError::Transient(format!(
                    "usage service answered {}",
                    status
                )))
            }
            _ => {}
        }

        response
            .json::<Vec<ResourceUsage>>()
            .await
            .map_err(|e| SampleError::Transient(format!("invalid usage response: {}", e)))
    }
}
