/**
 * HISTORY QUERIES - Time-range filtering and downsampling of a domain log
 *
 * ROLE:
 * Serves the dashboard charts: reads the raw log lines of one domain, keeps
 * those inside `[start, end]` and thins them to roughly one point per `step`.
 *
 * RULES:
 * - Times are in seconds; log timestamps are milliseconds
 * - Unparseable lines are skipped silently
 * - A line is kept when at least `step` seconds passed since the last kept
 *   line (the first match always qualifies)
 * - The first and last matching lines are always returned, whatever `step`
 * - Output is the raw lines, newline-joined, in file order
 */

use crate::error::{KernelError, KernelResult};
use crate::storage::{line_timestamp_ms, TelemetryLog};
use std::sync::Arc;

/// Validated query window, all values in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryQuery {
    pub start: Option<f64>,
    pub end: f64,
    pub step: f64,
}

impl HistoryQuery {
    pub fn new(start: Option<f64>, end: f64, step: f64) -> KernelResult<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(KernelError::Validation(format!("step must be a positive number, got {step}")));
        }
        if let Some(s) = start {
            if !s.is_finite() {
                return Err(KernelError::Validation(format!("start must be a finite number, got {s}")));
            }
        }
        if !end.is_finite() {
            return Err(KernelError::Validation(format!("end must be a finite number, got {end}")));
        }
        Ok(Self { start, end, step })
    }

    /// Builds a query from raw query-string values. `end` defaults to
    /// `now_secs` and `step` to `default_step`.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
        step: Option<&str>,
        now_secs: f64,
        default_step: f64,
    ) -> KernelResult<Self> {
        let start = start.map(|v| parse_number("start", v)).transpose()?;
        let end = end.map(|v| parse_number("end", v)).transpose()?.unwrap_or(now_secs);
        let step = step.map(|v| parse_number("step", v)).transpose()?.unwrap_or(default_step);
        Self::new(start, end, step)
    }

    fn contains(&self, t: f64) -> bool {
        self.start.map_or(true, |s| t >= s) && t <= self.end
    }
}

fn parse_number(name: &str, raw: &str) -> KernelResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| KernelError::Validation(format!("{name} must be a number, got '{raw}'")))
}

/// Selects the lines to return for `query`, borrowing from `lines`.
pub fn downsample<'a, S: AsRef<str>>(lines: &'a [S], query: &HistoryQuery) -> Vec<&'a str> {
    let mut picked: Vec<usize> = Vec::new();
    let mut last_match: Option<usize> = None;
    let mut last_included = f64::NEG_INFINITY;

    for (i, line) in lines.iter().enumerate() {
        let Some(ms) = line_timestamp_ms(line.as_ref()) else { continue };
        let t = ms / 1000.0;
        if !query.contains(t) {
            continue;
        }
        if picked.is_empty() || t - last_included >= query.step {
            picked.push(i);
            last_included = t;
        }
        last_match = Some(i);
    }

    if let Some(last) = last_match {
        if picked.last() != Some(&last) {
            picked.push(last);
        }
    }

    picked.into_iter().map(|i| lines[i].as_ref()).collect()
}

/// Reads domain logs and answers history queries.
#[derive(Clone)]
pub struct HistoryEngine {
    log: Arc<TelemetryLog>,
}

impl HistoryEngine {
    pub fn new(log: Arc<TelemetryLog>) -> Self {
        Self { log }
    }

    /// Newline-joined raw lines; empty when the domain has no log or nothing
    /// matches.
    pub async fn query(&self, domain: &str, query: &HistoryQuery) -> KernelResult<String> {
        let lines = self.log.read(domain).await?;
        Ok(downsample(&lines, query).join("\n"))
    }
}
