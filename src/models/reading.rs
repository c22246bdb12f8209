use std::fmt::Display;

use common::{
    packet::{decode_records, PacketError, SensorRecord},
    physical::{Temperature, TemperatureError},
};
use thiserror::Error;

/// Identifies a sensor across batches, e.g. `battery` or `cpu-1-7-usr`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From,
)]
pub struct SensorId(String);

impl SensorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A single sensor's temperature at the instant its batch was sampled.
/// `None` means the publisher had no value for the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub temperature: Option<Temperature>,
}

#[derive(Error, Debug)]
pub enum ReadingError {
    #[error("Invalid temperature for sensor '{sensor}'. Error: {source}")]
    InvalidTemperature {
        sensor: String,
        source: TemperatureError,
    },
}

impl Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.temperature {
            Some(temperature) => write!(f, "(Reading: {}={})", self.sensor_id, temperature),
            None => write!(f, "(Reading: {}=unknown)", self.sensor_id),
        }
    }
}

impl TryFrom<SensorRecord> for Reading {
    type Error = ReadingError;

    fn try_from(value: SensorRecord) -> Result<Self, Self::Error> {
        let temperature = match value.temperature {
            None => None,
            Some(raw) => match Temperature::try_from(raw) {
                Ok(t) => Some(t),
                Err(source) => {
                    return Err(ReadingError::InvalidTemperature {
                        sensor: value.sensor,
                        source,
                    })
                }
            },
        };
        Ok(Reading {
            sensor_id: SensorId(value.sensor),
            temperature,
        })
    }
}

/// All readings decoded from one feed message, in message order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorBatch {
    pub readings: Vec<Reading>,
}

#[derive(Error, Debug)]
pub enum SensorBatchError {
    #[error("Failed to decode batch. Error: {0}")]
    Packet(#[from] PacketError),

    #[error("Batch contained an invalid reading. Error: {0}")]
    Reading(#[from] ReadingError),
}

impl SensorBatch {
    /// Decode a feed message. A single bad record rejects the whole batch so
    /// that a batch is either applied entirely or not at all.
    pub fn decode(payload: &str) -> Result<Self, SensorBatchError> {
        let records = decode_records(payload)?;
        Self::try_from(records)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl TryFrom<Vec<SensorRecord>> for SensorBatch {
    type Error = SensorBatchError;

    fn try_from(value: Vec<SensorRecord>) -> Result<Self, Self::Error> {
        let readings = value
            .into_iter()
            .map(Reading::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { readings })
    }
}

impl FromIterator<Reading> for SensorBatch {
    fn from_iter<T: IntoIterator<Item = Reading>>(iter: T) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}

impl Display for SensorBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(SensorBatch: {} readings)", self.readings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_batch() {
        let batch = SensorBatch::decode(
            r#"[{"type":"battery","temperature":30},{"type":"gpuss-0-usr"}]"#,
        )
        .expect("Failed to decode batch.");

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.readings[0].sensor_id, SensorId::from("battery"));
        assert_eq!(
            batch.readings[0].temperature.map(|t| t.celsius()),
            Some(30f32)
        );
        assert_eq!(batch.readings[1].temperature, None);
    }

    #[test]
    fn test_decode_rejects_whole_batch_on_bad_record() {
        let result = SensorBatch::decode(r#"[{"type":"battery","temperature":30},{"temperature":1}]"#);
        assert!(matches!(result, Err(SensorBatchError::Packet(_))));
    }

    #[test]
    fn test_reading_rejects_overflowing_temperature() {
        // JSON numbers beyond f32 range saturate to infinity.
        let result = SensorBatch::decode(r#"[{"type":"battery","temperature":1e300}]"#);
        assert!(matches!(result, Err(SensorBatchError::Reading(_))));
    }

    #[test]
    fn test_display() {
        let reading = Reading {
            sensor_id: "battery".into(),
            temperature: Some(Temperature::try_from(30f32).unwrap()),
        };
        assert_eq!(reading.to_string(), "(Reading: battery=30°C)");
        assert_eq!(SensorId::from("battery").to_string(), "battery");
    }
}
