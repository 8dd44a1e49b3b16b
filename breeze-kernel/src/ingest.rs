use crate::error::KernelResult;
use crate::models::Reading;
use crate::registry::StatusRegistry;
use crate::storage::TelemetryLog;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::warn;

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Telemetry post pipeline: actuation, log append, status update.
#[derive(Clone)]
pub struct TelemetryIngest {
    registry: StatusRegistry,
    log: Arc<TelemetryLog>,
}

impl TelemetryIngest {
    pub fn new(registry: StatusRegistry, log: Arc<TelemetryLog>) -> Self {
        Self { registry, log }
    }

    pub async fn post(&self, domain: &str, payload: &[u8]) -> KernelResult<f64> {
        self.post_at(domain, payload, now_ms()).await
    }

    /// Decodes the report and returns the actuation value. A failed append is
    /// logged and does not fail the post.
    pub async fn post_at(&self, domain: &str, payload: &[u8], timestamp_ms: i64) -> KernelResult<f64> {
        let reading = Reading::from_le_bytes(payload)?;
        // Population lookup and status upsert share one registry lock; the
        // append runs after it so file I/O never holds that lock. The status
        // does not depend on whether the append succeeds.
        let (actuation, record) = self.registry.record_telemetry(domain, reading, timestamp_ms);

        if let Err(e) = self.log.append(domain, &record).await {
            warn!(domain, error = %e, "telemetry not persisted");
        }
        Ok(actuation)
    }
}
