//! Pressure and time units known to a session, and conversions between them.
//!
//! Only the vertical coordinate and the time coordinate carry units that a
//! session cares about. Conversion rescales those coordinates and stamps the
//! matching attribute; field values are never touched.

use std::fmt;
use std::str::FromStr;

use crate::dataset::{AttributeValue, GcmDataset};
use crate::error::{GcmError, Result};
use crate::names;

/// Pascals per bar
pub const PA_PER_BAR: f64 = 1.0e5;
/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Allowed pressure unit spellings
pub const ALLOWED_PUNITS: [&str; 2] = ["bar", "Pa"];
/// Allowed time unit spellings
pub const ALLOWED_TIMEUNITS: [&str; 2] = ["day", "iter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    Bar,
    Pa,
}

impl PressureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureUnit::Bar => "bar",
            PressureUnit::Pa => "Pa",
        }
    }

    /// Multiplicative factor that turns a value in `self` into pascals
    fn to_pa(self) -> f64 {
        match self {
            PressureUnit::Bar => PA_PER_BAR,
            PressureUnit::Pa => 1.0,
        }
    }
}

impl FromStr for PressureUnit {
    type Err = GcmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bar" => Ok(PressureUnit::Bar),
            "Pa" => Ok(PressureUnit::Pa),
            other => Err(GcmError::Config {
                message: format!(
                    "Invalid pressure unit: {}. Please use a pressure unit from {:?}",
                    other, ALLOWED_PUNITS
                ),
            }),
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Iter,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Iter => "iter",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = GcmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeUnit::Day),
            "iter" => Ok(TimeUnit::Iter),
            other => Err(GcmError::Config {
                message: format!(
                    "Invalid time unit: {}. Please use a time unit from {:?}",
                    other, ALLOWED_TIMEUNITS
                ),
            }),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rescale the vertical coordinate from `from` to `to` and stamp `p_unit`.
pub fn convert_pressure(ds: &mut GcmDataset, from: PressureUnit, to: PressureUnit) -> Result<()> {
    if from != to {
        let factor = from.to_pa() / to.to_pa();
        if let Some(z) = ds.coordinate_mut(names::Z) {
            z.mapv_inplace(|p| p * factor);
        }
    }
    ds.set_attribute(names::P_UNIT, AttributeValue::Text(to.as_str().to_string()));
    Ok(())
}

/// Rescale the time coordinate from `from` to `to` and stamp `time_unit`.
///
/// Switching between iterations and days needs the `dt` attribute (seconds
/// per model iteration).
pub fn convert_time(ds: &mut GcmDataset, from: TimeUnit, to: TimeUnit) -> Result<()> {
    if from != to {
        let dt = ds.number_attribute(names::DT).ok_or_else(|| GcmError::DataNotFound {
            message: format!(
                "Attribute '{}' is required to convert time from {} to {}",
                names::DT,
                from,
                to
            ),
        })?;
        let factor = match (from, to) {
            (TimeUnit::Iter, TimeUnit::Day) => dt / SECONDS_PER_DAY,
            (TimeUnit::Day, TimeUnit::Iter) => SECONDS_PER_DAY / dt,
            _ => 1.0,
        };
        if let Some(time) = ds.coordinate_mut(names::TIME) {
            time.mapv_inplace(|t| t * factor);
        }
    }
    ds.set_attribute(names::TIME_UNIT, AttributeValue::Text(to.as_str().to_string()));
    Ok(())
}
