//! Diverging colormaps (two hues around a neutral centre).
//!
//! Used for signed quantities such as the overturning streamfunction or
//! zonal wind, with the data range made symmetric about zero.

use colorgrad::{Color, CustomGradient};

use super::colormap::GradientColormap;
use crate::error::{GcmError, Result};

fn custom(name: &'static str, stops: &[[u8; 3]]) -> Result<GradientColormap> {
    let colors: Vec<Color> = stops
        .iter()
        .map(|c| Color::from_rgba8(c[0], c[1], c[2], 255))
        .collect();
    let gradient = CustomGradient::new()
        .colors(&colors)
        .build()
        .map_err(|e| GcmError::ImageGeneration {
            message: format!("Cannot build colormap {}: {}", name, e),
        })?;
    Ok(GradientColormap::new(name, gradient, true))
}

/// Blue to red through light grey
pub fn coolwarm() -> Result<GradientColormap> {
    custom(
        "coolwarm",
        &[
            [59, 76, 192],
            [141, 176, 254],
            [221, 221, 221],
            [244, 154, 123],
            [180, 4, 38],
        ],
    )
}

/// Red to blue through white
pub fn rdbu() -> GradientColormap {
    GradientColormap::new("rdbu", colorgrad::rd_bu(), true)
}

/// Dark blue to dark red through white
pub fn seismic() -> Result<GradientColormap> {
    custom(
        "seismic",
        &[
            [0, 0, 76],
            [0, 0, 255],
            [255, 255, 255],
            [255, 0, 0],
            [128, 0, 0],
        ],
    )
}

pub fn spectral() -> GradientColormap {
    GradientColormap::new("spectral", colorgrad::spectral(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormaps::Colormap;

    #[test]
    fn test_coolwarm_bounds() {
        let map = coolwarm().unwrap();
        let low = map.map_normalized(0.0);
        let high = map.map_normalized(1.0);
        assert!(low[2] > low[0], "low end should be blue: {:?}", low);
        assert!(high[0] > high[2], "high end should be red: {:?}", high);
        assert!(map.is_diverging());
    }

    #[test]
    fn test_seismic_middle_is_white() {
        let mid = seismic().unwrap().map_normalized(0.5);
        assert_eq!(mid, [255, 255, 255, 255]);
    }
}
