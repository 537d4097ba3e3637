use chrono::Utc;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use std::error::Error as StdError;
use std::time::{Duration, Instant};

use super::client::DocumentClient;

/// Point-in-time health verdict for one manager
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    /// Whether the ping succeeded
    pub healthy: bool,
    /// Human-readable summary
    pub message: String,
    /// Epoch milliseconds when the probe started
    pub timestamp: i64,
    /// Milliseconds spent in the probe, failures included
    pub latency: u64,
    pub details: HealthDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDetails {
    pub name: String,
    pub is_open: bool,
    pub is_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_response: Option<Document>,
    /// Error text including its `source()` chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy(
        name: &str,
        database: &str,
        ping_response: Document,
        timestamp: i64,
        latency: u64,
    ) -> Self {
        Self {
            healthy: true,
            message: "MongoDB connection is healthy".to_string(),
            timestamp,
            latency,
            details: HealthDetails {
                name: name.to_string(),
                is_open: true,
                is_ready: is_ready(&ping_response),
                database_name: Some(database.to_string()),
                ping_response: Some(ping_response),
                error: None,
            },
        }
    }

    pub fn unhealthy(name: &str, error: &(dyn StdError + 'static), timestamp: i64, latency: u64) -> Self {
        Self {
            healthy: false,
            message: format!("MongoDB health check failed: {}", error),
            timestamp,
            latency,
            details: HealthDetails {
                name: name.to_string(),
                is_open: false,
                is_ready: false,
                database_name: None,
                ping_response: None,
                error: Some(describe_error(error)),
            },
        }
    }
}

/// Probe failure: the client's own error or an expired deadline
#[derive(Debug, thiserror::Error)]
pub enum ProbeError<E: StdError + 'static> {
    #[error(transparent)]
    Client(E),

    #[error("ping did not complete within {}ms", .0.as_millis())]
    TimedOut(Duration),
}

/// `ok: 1` in any numeric or boolean encoding
pub fn is_ready(response: &Document) -> bool {
    match response.get("ok") {
        Some(Bson::Double(ok)) => *ok == 1.0,
        Some(Bson::Int32(ok)) => *ok == 1,
        Some(Bson::Int64(ok)) => *ok == 1,
        Some(Bson::Boolean(ok)) => *ok,
        _ => false,
    }
}

/// Render an error and every error in its `source()` chain
pub fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Ping `database`, bounded by `timeout` when one is configured
pub async fn ping_within<C: DocumentClient>(
    client: &C,
    database: &str,
    timeout: Option<Duration>,
) -> Result<Document, ProbeError<C::Error>> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, client.ping(database)).await {
            Ok(result) => result.map_err(ProbeError::Client),
            Err(_) => Err(ProbeError::TimedOut(limit)),
        },
        None => client.ping(database).await.map_err(ProbeError::Client),
    }
}

/// Run one probe and fold every outcome into a result
///
/// Never fails. Latency covers the ping only.
pub async fn probe<C: DocumentClient>(
    name: &str,
    client: &C,
    database: &str,
    timeout: Option<Duration>,
) -> HealthCheckResult {
    let timestamp = Utc::now().timestamp_millis();
    let start = Instant::now();

    let outcome = ping_within(client, database, timeout).await;
    let latency = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(response) => HealthCheckResult::healthy(name, database, response, timestamp, latency),
        Err(e) => HealthCheckResult::unhealthy(name, &e, timestamp, latency),
    }
}
