use std::collections::BTreeSet;

use super::reading::SensorId;

/// The sensors the user opted into. An empty selection shows every sensor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSet {
    sensors: BTreeSet<SensorId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the selection changed.
    pub fn select(&mut self, sensor: SensorId) -> bool {
        self.sensors.insert(sensor)
    }

    /// Returns `true` if the selection changed.
    pub fn deselect(&mut self, sensor: &SensorId) -> bool {
        self.sensors.remove(sensor)
    }

    /// Returns `true` if the selection changed.
    pub fn clear(&mut self) -> bool {
        let changed = !self.sensors.is_empty();
        self.sensors.clear();
        changed
    }

    /// Whether `sensor` should be shown under this selection.
    pub fn admits(&self, sensor: &SensorId) -> bool {
        self.sensors.is_empty() || self.sensors.contains(sensor)
    }
}

impl FromIterator<SensorId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = SensorId>>(iter: T) -> Self {
        Self {
            sensors: iter.into_iter().collect(),
        }
    }
}
