use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Size of the binary report sent by a fan unit: three little-endian f32.
pub const READING_LEN: usize = 12;

/// One sensor report as decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f32,
    pub humidity: f32,
    pub fan_rpm: f32,
}

impl Reading {
    /// Decodes `[temperature, humidity, fan_rpm]`. Any other length is rejected.
    pub fn from_le_bytes(payload: &[u8]) -> KernelResult<Self> {
        let bytes: &[u8; READING_LEN] = payload.try_into().map_err(|_| {
            KernelError::Validation(format!(
                "telemetry payload must be {READING_LEN} bytes, got {}",
                payload.len()
            ))
        })?;
        let field = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Ok(Self {
            temperature: field(0),
            humidity: field(4),
            fan_rpm: field(8),
        })
    }
}

/// A persisted telemetry line. Non-finite values are written as `null`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(skip)]
    pub timestamp_ms: i64,
    #[serde(deserialize_with = "nan_if_null")]
    pub temperature: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub humidity: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub fan_rpm: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub population: f64,
}

impl TelemetryRecord {
    pub fn new(timestamp_ms: i64, reading: Reading, population: f64) -> Self {
        Self {
            timestamp_ms,
            temperature: reading.temperature as f64,
            humidity: reading.humidity as f64,
            fan_rpm: reading.fan_rpm as f64,
            population,
        }
    }
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Latest known state of a domain, as served by `/status`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StatusEntry {
    pub population: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_rpm: Option<f64>,
}

impl StatusEntry {
    pub fn population_only(population: f64) -> Self {
        Self {
            population,
            fan_power: None,
            temperature: None,
            humidity: None,
            fan_rpm: None,
        }
    }

    pub fn from_record(record: &TelemetryRecord, fan_power: f64) -> Self {
        Self {
            population: record.population,
            fan_power: Some(fan_power),
            temperature: Some(record.temperature),
            humidity: Some(record.humidity),
            fan_rpm: Some(record.fan_rpm),
        }
    }
}

pub type PopulationMap = HashMap<String, f64>;
pub type StatusMap = HashMap<String, StatusEntry>;

/// Validates a detections payload. The whole batch is rejected on the first
/// entry that is not a finite, non-negative number.
pub fn parse_detections(payload: &serde_json::Value) -> KernelResult<PopulationMap> {
    let obj = payload
        .as_object()
        .ok_or_else(|| KernelError::Validation("detections must be a JSON object".into()))?;

    let mut counts = PopulationMap::with_capacity(obj.len());
    for (domain, value) in obj {
        match value.as_f64() {
            Some(n) if n.is_finite() && n >= 0.0 => {
                counts.insert(domain.clone(), n);
            }
            _ => {
                return Err(KernelError::Validation(format!(
                    "invalid count for domain '{domain}': {value}"
                )));
            }
        }
    }
    Ok(counts)
}
