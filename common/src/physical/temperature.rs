use core::{fmt::Display, marker::PhantomData};

use thiserror::Error;

/// Store physical unit value of a temperature in degrees Celsius.
///
/// ```
/// use common::physical::Temperature;
/// let temperature = Temperature::try_from(31.5f32).expect("Failed to get Temperature representation.");
/// assert_eq!(temperature.celsius(), 31.5f32);
/// assert_eq!(temperature.to_string(), "31.5°C");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature {
    /// Degrees Celsius. Always finite.
    celsius: f32,

    /// Make sure this can't be constructed with struct literals.
    /// NaN and infinities would otherwise poison comparisons and chart bounds.
    _private: PhantomData<()>,
}

/// Represents errors in creating the `Temperature` type.
#[derive(Debug, Error, PartialEq)]
pub enum TemperatureError {
    /// The raw value was NaN or infinite.
    #[error("Temperature must be a finite number, got {0}.")]
    NotFinite(f32),
}

impl Temperature {
    /// Get the temperature in degrees Celsius.
    pub fn celsius(&self) -> f32 {
        self.celsius
    }
}

impl TryFrom<f32> for Temperature {
    type Error = TemperatureError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(TemperatureError::NotFinite(value));
        }
        Ok(Self {
            celsius: value,
            _private: PhantomData,
        })
    }
}

impl From<Temperature> for f32 {
    fn from(value: Temperature) -> Self {
        value.celsius
    }
}

impl Display for Temperature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}°C", self.celsius)
    }
}
