use super::{format_line, sanitize_domain, LOG_EXTENSION};
use crate::error::{KernelError, KernelResult};
use crate::models::TelemetryRecord;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// File-backed telemetry log, one file per domain under `data_dir`.
///
/// Appends to the same file are serialized by a per-file async lock and each
/// record is written with a single `write_all` in append mode.
pub struct TelemetryLog {
    data_dir: PathBuf,
    /// One lock per log file, kept for the life of the process. Grows with
    /// the number of distinct log files, like the data directory itself.
    writers: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TelemetryLog {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            writers: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, domain: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", sanitize_domain(domain), LOG_EXTENSION))
    }

    fn writer_lock(&self, file_key: &str) -> Arc<Mutex<()>> {
        self.writers
            .lock()
            .entry(file_key.to_string())
            .or_default()
            .clone()
    }

    /// Appends one record, creating the directory and file on first use.
    pub async fn append(&self, domain: &str, record: &TelemetryRecord) -> KernelResult<()> {
        let mut line = format_line(record)
            .map_err(|e| KernelError::StorageWrite(std::io::Error::new(ErrorKind::InvalidData, e)))?;
        line.push('\n');

        let path = self.path_for(domain);
        let lock = self.writer_lock(&sanitize_domain(domain));
        let _guard = lock.lock().await;

        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(KernelError::StorageWrite)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(KernelError::StorageWrite)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(KernelError::StorageWrite)?;
        file.flush().await.map_err(KernelError::StorageWrite)?;

        debug!(domain, path = %path.display(), "telemetry appended");
        Ok(())
    }

    /// All non-empty lines of a domain log. A missing log reads as empty;
    /// lines that are not valid UTF-8 are dropped.
    pub async fn read(&self, domain: &str) -> KernelResult<Vec<String>> {
        let path = self.path_for(domain);
        match fs::read(&path).await {
            Ok(content) => Ok(content
                .split(|&b| b == b'\n')
                .filter_map(|raw| std::str::from_utf8(raw).ok())
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(KernelError::StorageRead(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use crate::storage::line_timestamp_ms;

    fn record(ts: i64) -> TelemetryRecord {
        let reading = Reading { temperature: 21.0, humidity: 40.0, fan_rpm: 1000.0 };
        TelemetryRecord::new(ts, reading, 1.0)
    }

    #[tokio::test]
    async fn test_read_missing_domain_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path());
        assert!(log.read("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_dir_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path().join("nested").join("data"));

        for ts in [1_000, 2_000, 3_000] {
            log.append("kitchen", &record(ts)).await.unwrap();
        }

        let lines = log.read("kitchen").await.unwrap();
        assert_eq!(lines.len(), 3);
        let stamps: Vec<f64> = lines.iter().filter_map(|l| line_timestamp_ms(l)).collect();
        assert_eq!(stamps, vec![1_000.0, 2_000.0, 3_000.0]);
        assert!(log.path_for("kitchen").ends_with("kitchen.log"));
    }

    #[tokio::test]
    async fn test_path_traversal_stays_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path());
        log.append("../../escape", &record(1)).await.unwrap();

        let path = log.path_for("../../escape");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.exists());
        assert_eq!(log.read("../../escape").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_log_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path());
        // a directory where the file should be
        std::fs::create_dir_all(log.path_for("broken")).unwrap();
        assert!(matches!(log.read("broken").await, Err(KernelError::StorageRead(_))));
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path());
        log.append("torn", &record(0)).await.unwrap();
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(log.path_for("torn"))
                .unwrap();
            file.write_all(b"5000,\xff\xfe garbage\n").unwrap();
        }
        log.append("torn", &record(10_000)).await.unwrap();

        let lines = log.read("torn").await.unwrap();
        let stamps: Vec<f64> = lines.iter().filter_map(|l| line_timestamp_ms(l)).collect();
        assert_eq!(stamps, vec![0.0, 10_000.0]);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let log = TelemetryLog::new(&blocker);
        assert!(matches!(log.append("a", &record(1)).await, Err(KernelError::StorageWrite(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_same_domain_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(TelemetryLog::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..64 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append("shared", &record(i)).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let lines = log.read("shared").await.unwrap();
        assert_eq!(lines.len(), 64);
        for line in &lines {
            let (_, json) = line.split_once(',').unwrap();
            let parsed: TelemetryRecord = serde_json::from_str(json).unwrap();
            assert_eq!(parsed.fan_rpm, 1000.0);
        }
        let mut stamps: Vec<i64> = lines
            .iter()
            .map(|l| line_timestamp_ms(l).unwrap() as i64)
            .collect();
        stamps.sort_unstable();
        assert_eq!(stamps, (0..64).collect::<Vec<_>>());
    }
}
