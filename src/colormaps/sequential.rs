//! Sequential colormaps (single progression from low to high).

use super::colormap::GradientColormap;

/// Viridis - perceptually uniform, colorblind-friendly
pub fn viridis() -> GradientColormap {
    GradientColormap::new("viridis", colorgrad::viridis(), false)
}

pub fn plasma() -> GradientColormap {
    GradientColormap::new("plasma", colorgrad::plasma(), false)
}

pub fn inferno() -> GradientColormap {
    GradientColormap::new("inferno", colorgrad::inferno(), false)
}

pub fn magma() -> GradientColormap {
    GradientColormap::new("magma", colorgrad::magma(), false)
}

/// Cividis - colorblind-friendly alternative to viridis
pub fn cividis() -> GradientColormap {
    GradientColormap::new("cividis", colorgrad::cividis(), false)
}

pub fn turbo() -> GradientColormap {
    GradientColormap::new("turbo", colorgrad::turbo(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormaps::Colormap;

    #[test]
    fn test_viridis_endpoints() {
        let map = viridis();
        let low = map.map_normalized(0.0);
        let high = map.map_normalized(1.0);
        // dark purple to yellow
        assert!(low[2] > low[1]);
        assert!(high[0] > 200 && high[1] > 200 && high[2] < 100);
        assert_eq!(low[3], 255);
        assert!(!map.is_diverging());
    }
}
