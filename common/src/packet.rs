use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a feed message. A message is a JSON array holding one
/// record per sensor, all sampled at the same instant:
///
/// ```json
/// [{"type": "battery", "temperature": 30}, {"type": "gpuss-0-usr"}]
/// ```
///
/// The publisher names the sensor `type`. `temperature` may be missing or
/// `null` when the sensor could not be read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensorRecord {
    /// Sensor identifier, e.g. `battery` or `cpu-0-0-usr`.
    #[serde(rename = "type")]
    pub sensor: String,

    /// Degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Malformed feed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SensorRecord {
    pub fn new(sensor: impl Into<String>, temperature: Option<f32>) -> Self {
        Self {
            sensor: sensor.into(),
            temperature,
        }
    }
}

/// Decode a single feed message into its records.
/// Anything other than a JSON array of records is rejected as a whole.
pub fn decode_records(payload: &str) -> Result<Vec<SensorRecord>, PacketError> {
    Ok(serde_json::from_str::<Vec<SensorRecord>>(payload)?)
}

/// Encode records into a feed message.
pub fn encode_records(records: &[SensorRecord]) -> Result<String, PacketError> {
    Ok(serde_json::to_string(records)?)
}
