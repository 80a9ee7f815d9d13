//! Customer profile lookup
//!
//! The tool guard binds each session to one customer profile. Profiles come
//! from a [`ProfileProvider`]; [`CachedProfileProvider`] puts a process-wide
//! moka TTL cache in front of any provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Customer identity bound to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub loyalty_points: u32,
    /// Any other profile attributes, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomerProfile {
    pub fn new(customer_id: impl Into<String>) -> Self {
        CustomerProfile {
            customer_id: customer_id.into(),
            first_name: None,
            last_name: None,
            email: None,
            loyalty_points: 0,
            extra: Map::new(),
        }
    }
}

/// Source of customer profiles
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// Fetch the profile for `customer_id`
    async fn fetch(&self, customer_id: &str) -> Result<CustomerProfile>;
}

/// In-memory profile table
#[derive(Debug, Clone, Default)]
pub struct StaticProfileProvider {
    profiles: HashMap<String, CustomerProfile>,
}

impl StaticProfileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider seeded with one demo customer
    pub fn with_demo_customer(customer_id: &str) -> Self {
        let mut profile = CustomerProfile::new(customer_id);
        profile.first_name = Some("Alex".to_string());
        profile.last_name = Some("Johnson".to_string());
        profile.email = Some("alex.johnson@example.com".to_string());
        profile.loyalty_points = 133;
        Self::new().with_profile(profile)
    }

    pub fn with_profile(mut self, profile: CustomerProfile) -> Self {
        self.profiles.insert(profile.customer_id.clone(), profile);
        self
    }
}

#[async_trait]
impl ProfileProvider for StaticProfileProvider {
    async fn fetch(&self, customer_id: &str) -> Result<CustomerProfile> {
        self.profiles
            .get(customer_id)
            .cloned()
            .ok_or_else(|| Error::Session(format!("Customer not found: {}", customer_id)))
    }
}

/// TTL cache in front of another provider
#[derive(Clone)]
pub struct CachedProfileProvider {
    inner: Arc<dyn ProfileProvider>,
    cache: Cache<String, CustomerProfile>,
}

impl CachedProfileProvider {
    pub fn new(inner: Arc<dyn ProfileProvider>, ttl: Duration) -> Self {
        CachedProfileProvider {
            inner,
            cache: Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop a cached profile so the next fetch goes to the inner provider
    pub async fn invalidate(&self, customer_id: &str) {
        self.cache.invalidate(customer_id).await;
    }
}

#[async_trait]
impl ProfileProvider for CachedProfileProvider {
    async fn fetch(&self, customer_id: &str) -> Result<CustomerProfile> {
        let inner = self.inner.clone();
        let key = customer_id.to_string();
        self.cache
            .try_get_with(key.clone(), async move { inner.fetch(&key).await })
            .await
            .map_err(|e| Error::Session(format!("Profile lookup failed: {}", e)))
    }
}
