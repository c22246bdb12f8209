use std::collections::{BTreeMap, VecDeque};

use common::physical::Temperature;
use thiserror::Error;

use crate::models::reading::{SensorBatch, SensorId};

/// Number of readings kept per sensor unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// The most recent readings of every sensor seen so far, oldest first.
///
/// Each sensor keeps at most `capacity` values. Absent readings are kept as
/// `None` so they show up as gaps instead of shifting the series.
///
/// The buffer is a snapshot: `ingest` returns a new buffer and leaves the
/// previous one untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    capacity: usize,
    sensors: BTreeMap<SensorId, VecDeque<Option<Temperature>>>,
}

#[derive(Error, Debug, PartialEq)]
pub enum HistoryError {
    #[error("History capacity must be at least one reading.")]
    ZeroCapacity,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            sensors: BTreeMap::new(),
        }
    }
}

impl HistoryBuffer {
    /// Create an empty buffer keeping `capacity` readings per sensor.
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            sensors: BTreeMap::new(),
        })
    }

    /// Fold a batch into a copy of this buffer.
    /// Readings are appended in batch order; a sensor over capacity loses its
    /// oldest value. Sensors missing from the batch are left as they were.
    pub fn ingest(&self, batch: &SensorBatch) -> Self {
        let mut next = self.clone();
        for reading in batch.readings.iter() {
            let history = next
                .sensors
                .entry(reading.sensor_id.clone())
                .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));
            history.push_back(reading.temperature);
            while history.len() > self.capacity {
                history.pop_front();
            }
        }
        next
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained values for `sensor`, oldest first.
    pub fn history(&self, sensor: &SensorId) -> Option<&VecDeque<Option<Temperature>>> {
        self.sensors.get(sensor)
    }

    /// The most recently ingested value of `sensor`.
    /// `None` if the sensor is unknown or its last reading had no value.
    pub fn latest(&self, sensor: &SensorId) -> Option<Temperature> {
        self.sensors
            .get(sensor)
            .and_then(|history| history.back().copied().flatten())
    }

    /// Known sensors and their histories, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (&SensorId, &VecDeque<Option<Temperature>>)> {
        self.sensors.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
