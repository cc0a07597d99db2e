//! Health endpoints: liveness, readiness and a component breakdown.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::error;

#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Up,
    Down,
}

#[derive(Clone)]
pub struct HealthChecker {
    db_pool: sqlx::PgPool,
}

impl HealthChecker {
    pub fn new(db_pool: sqlx::PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut checks = HashMap::new();
        let mut healthy = true;

        match timeout(Duration::from_secs(5), check_database(&self.db_pool)).await {
            Ok(Ok(elapsed_ms)) => {
                checks.insert(
                    "database".to_string(),
                    ComponentHealth {
                        status: ComponentState::Up,
                        response_time_ms: Some(elapsed_ms),
                        details: None,
                    },
                );
            }
            Ok(Err(e)) => {
                healthy = false;
                error!("database health check failed: {}", e);
                checks.insert(
                    "database".to_string(),
                    ComponentHealth {
                        status: ComponentState::Down,
                        response_time_ms: None,
                        details: Some(e.to_string()),
                    },
                );
            }
            Err(_) => {
                healthy = false;
                error!("database health check timed out");
                checks.insert(
                    "database".to_string(),
                    ComponentHealth {
                        status: ComponentState::Down,
                        response_time_ms: None,
                        details: Some("timeout".to_string()),
                    },
                );
            }
        }

        HealthStatus {
            status: if healthy {
                HealthState::Healthy
            } else {
                HealthState::Unhealthy
            },
            checks,
            timestamp: chrono::Utc::now(),
        }
    }
}

async fn check_database(pool: &sqlx::PgPool) -> Result<u128, sqlx::Error> {
    let start = Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(start.elapsed().as_millis())
}

pub async fn health(State(checker): State<HealthChecker>) -> impl IntoResponse {
    let status = checker.check_health().await;
    let code = if status.status == HealthState::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

pub async fn ready(State(checker): State<HealthChecker>) -> impl IntoResponse {
    let status = checker.check_health().await;
    if status.status == HealthState::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_states_serialize_lowercase() {
        let health = ComponentHealth {
            status: ComponentState::Up,
            response_time_ms: Some(12),
            details: None,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "up");
        assert_eq!(json["response_time_ms"], 12);
        assert!(json.get("details").is_none());
    }
}
