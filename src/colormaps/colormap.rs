//! Colormap trait and lookup by name.

use colorgrad::Gradient;

use crate::error::{GcmError, Result};

/// Trait for color mapping implementations
pub trait Colormap {
    /// Map a normalized value (0.0 to 1.0) to an RGBA color
    fn map_normalized(&self, value: f64) -> [u8; 4];

    /// Map a value to an RGBA color given the data range.
    /// Non-finite values are transparent.
    fn map(&self, value: f64, min: f64, max: f64) -> [u8; 4] {
        if !value.is_finite() {
            return [0, 0, 0, 0];
        }
        let normalized = if max > min {
            ((value - min) / (max - min)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.map_normalized(normalized)
    }

    /// Get the name of this colormap
    fn name(&self) -> &str;

    /// Whether the map has a neutral centre and should be used with a range
    /// symmetric about zero
    fn is_diverging(&self) -> bool {
        false
    }
}

/// A colormap backed by a `colorgrad` gradient
pub struct GradientColormap {
    name: &'static str,
    gradient: Gradient,
    diverging: bool,
}

impl GradientColormap {
    pub fn new(name: &'static str, gradient: Gradient, diverging: bool) -> Self {
        Self {
            name,
            gradient,
            diverging,
        }
    }
}

impl Colormap for GradientColormap {
    fn map_normalized(&self, value: f64) -> [u8; 4] {
        self.gradient.at(value.clamp(0.0, 1.0)).to_rgba8()
    }

    fn name(&self) -> &str {
        self.name
    }

    fn is_diverging(&self) -> bool {
        self.diverging
    }
}

/// Names accepted by [`get_colormap`]
pub const COLORMAP_NAMES: [&str; 10] = [
    "viridis", "plasma", "inferno", "magma", "cividis", "turbo", "coolwarm", "rdbu", "seismic",
    "spectral",
];

/// Get a colormap by name (case-insensitive)
pub fn get_colormap(name: &str) -> Result<Box<dyn Colormap>> {
    use super::{diverging, sequential};

    let map = match name.to_lowercase().as_str() {
        "viridis" => sequential::viridis(),
        "plasma" => sequential::plasma(),
        "inferno" => sequential::inferno(),
        "magma" => sequential::magma(),
        "cividis" => sequential::cividis(),
        "turbo" => sequential::turbo(),
        "coolwarm" => diverging::coolwarm()?,
        "rdbu" => diverging::rdbu(),
        "seismic" => diverging::seismic()?,
        "spectral" => diverging::spectral(),
        _ => {
            return Err(GcmError::InvalidParameter {
                param: "colormap".to_string(),
                message: format!(
                    "Unknown colormap: {}. Available: {}",
                    name,
                    COLORMAP_NAMES.join(", ")
                ),
            })
        }
    };
    Ok(Box::new(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in COLORMAP_NAMES {
            let map = get_colormap(name).unwrap();
            assert_eq!(map.name(), name);
        }
        assert!(get_colormap("Viridis").is_ok());
        assert!(matches!(
            get_colormap("jet"),
            Err(GcmError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_map_range() {
        let map = get_colormap("viridis").unwrap();
        assert_eq!(map.map(-5.0, 0.0, 1.0), map.map_normalized(0.0));
        assert_eq!(map.map(5.0, 0.0, 1.0), map.map_normalized(1.0));
        assert_eq!(map.map(3.0, 3.0, 3.0), map.map_normalized(0.5));
        assert_eq!(map.map(f64::NAN, 0.0, 1.0)[3], 0);
    }
}
