use std::fmt::Display;

use common::physical::Temperature;

use super::reading::SensorId;

/// A display color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "rgb({}, {}, {})", r, g, b)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// One line of the chart: a sensor's whole retained history.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: SensorId,
    pub color: Rgb,
    /// Oldest first. `None` is plotted as a gap.
    pub values: Vec<Option<Temperature>>,
}

/// One entry of the list view: a sensor and its latest value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub label: SensorId,
    pub temperature: Option<Temperature>,
}

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.temperature {
            Some(temperature) => write!(f, "{}: {}", self.label, temperature),
            None => write!(f, "{}: --", self.label),
        }
    }
}

/// Everything a render surface needs for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub series: Vec<Series>,
    pub rows: Vec<Row>,
    /// Ordinal x labels, `1..=capacity`.
    pub x_axis: Vec<usize>,
    /// Lowest and highest plotted value, if anything is plotted.
    pub y_range: Option<(Temperature, Temperature)>,
}
