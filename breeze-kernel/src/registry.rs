/**
 * STATUS REGISTRY - Live occupancy and latest telemetry per domain
 *
 * ROLE:
 * Holds the population map fed by the vision reporter and the latest status
 * of every fan unit. This is the only shared mutable state of the kernel.
 *
 * BEHAVIOUR:
 * - Detections replace the population map wholesale; domains missing from the
 *   latest detections lose their status entry
 * - Telemetry computes the fan power from the current population (NaN when
 *   the domain is unknown) and overwrites the status of known domains
 * - Each detections post restarts the inactivity timer; when it expires both
 *   maps are cleared
 *
 * CONCURRENCY:
 * Every mutation happens under one mutex. The timer is reset while that lock
 * is held and each reset bumps an epoch; an expiring deadline only clears the
 * maps if its epoch is still current, so a fire that loses to a reset does
 * nothing.
 */

use crate::actuation::population_to_actuation;
use crate::models::{PopulationMap, Reading, StatusEntry, StatusMap, TelemetryRecord};
use crate::state::{new_state, Shared};
use crate::timer::InactivityTimer;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Default)]
struct RegistryState {
    population: PopulationMap,
    status: StatusMap,
    epoch: u64,
}

impl RegistryState {
    fn clear(&mut self) -> usize {
        let evicted = self.population.len();
        self.population.clear();
        self.status.clear();
        evicted
    }
}

#[derive(Clone)]
pub struct StatusRegistry {
    state: Shared<RegistryState>,
    timer: InactivityTimer,
}

impl StatusRegistry {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self {
            state: new_state(RegistryState::default()),
            timer: InactivityTimer::new(inactivity_timeout),
        }
    }

    /// Replaces the population map with `counts` and restarts the inactivity
    /// timer. Must be called from within a tokio runtime.
    pub fn record_detections(&self, counts: PopulationMap) {
        let mut st = self.state.lock();

        st.status.retain(|domain, _| counts.contains_key(domain));
        for (domain, entry) in st.status.iter_mut() {
            entry.population = counts[domain];
        }
        st.population = counts;
        st.epoch += 1;
        debug!(domains = st.population.len(), "detections recorded");

        let epoch = st.epoch;
        let state = self.state.clone();
        self.timer.reset(move || {
            let mut st = state.lock();
            if st.epoch != epoch {
                return;
            }
            let evicted = st.clear();
            info!(evicted, "inactivity timeout, occupancy cleared");
        });
    }

    /// Computes the fan power for `domain` and stores its latest status.
    /// Returns the actuation value with the record to persist.
    ///
    /// Domains without a population get no status entry: `snapshot` could
    /// never list it and nothing would prune it without a detections post.
    pub fn record_telemetry(
        &self,
        domain: &str,
        reading: Reading,
        timestamp_ms: i64,
    ) -> (f64, TelemetryRecord) {
        let mut st = self.state.lock();
        let known = st.population.get(domain).copied();
        let population = known.unwrap_or(f64::NAN);
        let actuation = population_to_actuation(population);
        let record = TelemetryRecord::new(timestamp_ms, reading, population);
        if known.is_some() {
            st.status
                .insert(domain.to_string(), StatusEntry::from_record(&record, actuation));
        }
        (actuation, record)
    }

    /// Status of every domain with a known population.
    pub fn snapshot(&self) -> BTreeMap<String, StatusEntry> {
        let st = self.state.lock();
        st.population
            .iter()
            .map(|(domain, &population)| {
                let entry = st
                    .status
                    .get(domain)
                    .copied()
                    .unwrap_or_else(|| StatusEntry::population_only(population));
                (domain.clone(), entry)
            })
            .collect()
    }

    /// Forgets all occupancy and status, cancelling any pending deadline.
    pub fn on_inactivity_timeout(&self) {
        let mut st = self.state.lock();
        st.epoch += 1;
        self.timer.cancel();
        let evicted = st.clear();
        info!(evicted, "occupancy cleared");
    }

    pub fn population(&self, domain: &str) -> Option<f64> {
        self.state.lock().population.get(domain).copied()
    }

    pub fn domains_tracked(&self) -> usize {
        self.state.lock().population.len()
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.timer.timeout()
    }
}
