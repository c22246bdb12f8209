use std::collections::HashMap;

use common::physical::Temperature;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use crate::{
    history::HistoryBuffer,
    models::{
        projection::{Projection, Rgb, Row, Series},
        reading::SensorId,
        selection::SelectionSet,
    },
};

/// Readings below this are treated as a disconnected probe on the sensors
/// subject to the plausibility check.
const MIN_PLAUSIBLE_TEMPERATURE: f32 = -10f32;

/// Prefixes of sensor ids that report bogus values when idle.
const UNRELIABLE_SENSOR_PREFIXES: [&str; 2] = ["modem-mmw", "pm8150l-bcl-lvl"];

/// Sensor ids that report bogus values when idle.
const UNRELIABLE_SENSORS: [&str; 1] = ["modem-streamer-usr"];

/// Assigns every sensor a display color the first time it is drawn and
/// keeps it for as long as the palette lives.
#[derive(Debug, Default)]
pub struct ColorPalette {
    colors: HashMap<SensorId, Rgb>,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the color of `sensor`, assigning one if it has none yet.
    pub fn color_for(&mut self, sensor: &SensorId) -> Rgb {
        *self
            .colors
            .entry(sensor.clone())
            .or_insert_with(|| generate_color(sensor))
    }
}

/// Random-looking but reproducible color, seeded from the sensor id.
fn generate_color(sensor: &SensorId) -> Rgb {
    let mut rng = StdRng::seed_from_u64(fnv1a(sensor.as_str().as_bytes()));
    let color = Rgb {
        r: rng.gen(),
        g: rng.gen(),
        b: rng.gen(),
    };
    trace!("Assigned {} to sensor '{}'.", color, sensor);
    color
}

/// 64 bit FNV-1a. Stable across builds, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Whether the plausibility check applies to `sensor`.
fn is_unreliable_sensor(sensor: &SensorId) -> bool {
    let id = sensor.as_str();
    UNRELIABLE_SENSOR_PREFIXES
        .iter()
        .any(|prefix| id.starts_with(prefix))
        || UNRELIABLE_SENSORS.contains(&id)
}

/// Check a sensor's latest value for plausibility.
/// Unknown values always pass; so does every sensor not known to misreport.
pub fn is_plausible(sensor: &SensorId, latest: Option<Temperature>) -> bool {
    if !is_unreliable_sensor(sensor) {
        return true;
    }
    match latest {
        None => true,
        Some(temperature) => temperature.celsius() >= MIN_PLAUSIBLE_TEMPERATURE,
    }
}

/// Derive the chart series and the list rows from a history snapshot.
///
/// The same filter applies to both: a non-empty selection keeps only the
/// selected sensors, then sensors with an implausible latest value are
/// dropped. Colors are taken from `palette`, assigning new ones as needed.
pub fn project(
    buffer: &HistoryBuffer,
    selection: &SelectionSet,
    palette: &mut ColorPalette,
) -> Projection {
    let mut series = vec![];
    let mut rows = vec![];

    for (sensor, history) in buffer.iter() {
        if !selection.admits(sensor) {
            continue;
        }
        let latest = buffer.latest(sensor);
        if !is_plausible(sensor, latest) {
            trace!("Dropping implausible sensor '{}'.", sensor);
            continue;
        }

        series.push(Series {
            label: sensor.clone(),
            color: palette.color_for(sensor),
            values: history.iter().copied().collect(),
        });
        rows.push(Row {
            label: sensor.clone(),
            temperature: latest,
        });
    }

    let y_range = y_range(&series);

    Projection {
        series,
        rows,
        x_axis: (1..=buffer.capacity()).collect(),
        y_range,
    }
}

/// Bounds of every plotted value. The axis follows the data instead of
/// starting at zero.
fn y_range(series: &[Series]) -> Option<(Temperature, Temperature)> {
    series
        .iter()
        .flat_map(|s| s.values.iter().flatten().copied())
        .fold(None, |range, value| match range {
            None => Some((value, value)),
            Some((low, high)) => Some((
                if value < low { value } else { low },
                if value > high { value } else { high },
            )),
        })
}
