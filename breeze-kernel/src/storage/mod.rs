/**
 * TELEMETRY LOG - Append-only per-domain storage of fan unit reports
 *
 * ROLE:
 * Every telemetry post ends up as one line in the log of its domain.
 * History queries read those lines back verbatim.
 *
 * FORMAT:
 * - One text file per domain: `<data_dir>/<sanitized-domain>.log`
 * - One record per line: `<timestamp_ms>,<json-object>`
 * - Lines are never rewritten; retention is handled outside the kernel
 *
 * DOMAIN NAMES:
 * Only `[A-Za-z0-9_-]` survive as-is, everything else becomes `_`, so a
 * domain can never escape the data directory.
 */

mod file;

pub use file::TelemetryLog;

use crate::models::TelemetryRecord;

pub const LOG_EXTENSION: &str = "log";

/// Maps a domain name onto the filesystem-safe alphabet.
pub fn sanitize_domain(domain: &str) -> String {
    domain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Renders a record as a log line, without the trailing newline.
pub fn format_line(record: &TelemetryRecord) -> Result<String, serde_json::Error> {
    Ok(format!("{},{}", record.timestamp_ms, serde_json::to_string(record)?))
}

/// Leading timestamp of a log line in milliseconds, `None` if unparseable.
pub fn line_timestamp_ms(line: &str) -> Option<f64> {
    let (ts, _) = line.split_once(',')?;
    ts.trim().parse::<f64>().ok().filter(|t| t.is_finite())
}
