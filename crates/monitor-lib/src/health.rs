//! Component health for the transaction monitor
//!
//! The service tracks two components: the engine (lock contention shows up
//! here) and the baseline (monitored statuses running on fallback
//! thresholds show up here). Overall status is the worst component status.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but with reduced fidelity
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Whether requests should still be routed to the service
    pub fn is_serving(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

/// Component names for health tracking
pub mod components {
    pub const ENGINE: &str = "engine";
    pub const BASELINE: &str = "baseline";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component entered its current status
    pub since: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            since: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    ready: bool,
}

/// Shared, cloneable registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Status changes reset `since`; repeated reports of the same status keep it
    async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        match state.components.get_mut(name) {
            Some(current) if current.status == status => current.message = message,
            _ => {
                state
                    .components
                    .insert(name.to_string(), ComponentHealth::new(status, message));
            }
        }
    }

    /// Mark the engine as built and serving
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        HealthResponse::from_components(components)
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        if !state.ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Engine not yet initialized".to_string()),
            };
        }

        let failed = state
            .components
            .iter()
            .find(|(_, c)| !c.status.is_serving());

        match failed {
            Some((name, c)) => ReadinessResponse {
                ready: false,
                reason: Some(match &c.message {
                    Some(message) => format!("{} unhealthy: {}", name, message),
                    None => format!("{} unhealthy", name),
                }),
            },
            None => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_default_thresholds_degrade_overall() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;
        registry.register(components::BASELINE).await;

        registry
            .set_degraded(components::BASELINE, "no history for REVERSED")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.status.is_serving());
        assert_eq!(
            health.components[components::BASELINE].message.as_deref(),
            Some("no history for REVERSED")
        );
    }

    #[tokio::test]
    async fn test_worst_status_wins() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;
        registry.register(components::BASELINE).await;
        registry.set_degraded(components::BASELINE, "defaults").await;
        registry.set_unhealthy(components::ENGINE, "lock poisoned").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        registry.set_healthy(components::ENGINE).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_same_status_keeps_since() {
        let registry = HealthRegistry::new();
        registry.set_degraded(components::ENGINE, "busy").await;
        let first = registry.health().await.components[components::ENGINE].since;

        registry.set_degraded(components::ENGINE, "still busy").await;
        let health = registry.health().await;
        let engine = &health.components[components::ENGINE];

        assert_eq!(engine.since, first);
        assert_eq!(engine.message.as_deref(), Some("still busy"));
    }

    #[tokio::test]
    async fn test_readiness_transitions() {
        let registry = HealthRegistry::new();
        registry.register(components::ENGINE).await;
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::ENGINE, "lock poisoned").await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("engine unhealthy: lock poisoned")
        );
    }
}
