use crate::registry::StatusRegistry;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub domains_tracked: u32,
    pub inactivity_timeout_secs: u64,
    pub memory_usage_mb: f32,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn get_health(&self, registry: &StatusRegistry) -> KernelHealth {
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            domains_tracked: registry.domains_tracked() as u32,
            inactivity_timeout_secs: registry.inactivity_timeout().as_secs(),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|l| l.starts_with("VmRSS:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return (kb as f32) / 1024.0;
            }
        }
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_counts_tracked_domains() {
        let registry = StatusRegistry::new(Duration::from_secs(10));
        registry.record_detections([("L".to_string(), 1.0), ("R".to_string(), 0.0)].into());

        let health = HealthTracker::new().get_health(&registry);
        assert_eq!(health.domains_tracked, 2);
        assert_eq!(health.inactivity_timeout_secs, 10);
        assert!(health.memory_usage_mb >= 0.0);
    }
}
