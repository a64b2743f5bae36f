//! Colormaps for plot rendering, built on `colorgrad` gradients.

pub mod colormap;
pub mod diverging;
pub mod sequential;

pub use colormap::{get_colormap, Colormap, GradientColormap, COLORMAP_NAMES};

/// Colormap used for zonal means when none is configured
pub const DEFAULT_DIVERGING: &str = "rdbu";
