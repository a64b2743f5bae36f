//! PNG rendering of GCM fields.
//!
//! Heat maps sample the nearest grid cell for every pixel. Rows are ordered
//! by their coordinate so that north is up for horizontal slices and
//! pressure grows downward for vertical sections.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use ndarray::{Array1, Array2, ArrayView2, Axis, Ix2};
use tracing::{debug, info};

use crate::colormaps::{self, Colormap};
use crate::dataset::{DataArray, GcmDataset};
use crate::error::{GcmError, Result};
use crate::names;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;
const DEFAULT_COLORMAP: &str = "viridis";

/// Margin around the axes of line plots, in pixels
const MARGIN: u32 = 40;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Rendering options shared by all plots
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// Colormap name; each plot kind has its own default
    pub colormap: Option<String>,
    /// Time step to show (defaults to the last one)
    pub time_index: Option<usize>,
    /// Write the PNG here when set
    pub output: Option<PathBuf>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            colormap: None,
            time_index: None,
            output: None,
        }
    }
}

impl PlotOptions {
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    fn colormap_or(&self, default: &str) -> Result<Box<dyn Colormap>> {
        colormaps::get_colormap(self.colormap.as_deref().unwrap_or(default))
    }

    fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(GcmError::InvalidParameter {
                param: "size".to_string(),
                message: format!(
                    "Plot size must be at least 2x2, got {}x{}",
                    self.width, self.height
                ),
            });
        }
        Ok(())
    }
}

/// Resolve the requested time index against the dataset, defaulting to the
/// last step. Returns `None` for fields without a time axis.
fn time_index(
    ds: &GcmDataset,
    var: &DataArray,
    requested: Option<usize>,
) -> Result<Option<usize>> {
    if !var.has_dim(names::TIME) {
        return Ok(None);
    }
    let n = ds.dim_size(names::TIME).unwrap_or(0);
    if n == 0 {
        return Err(GcmError::DataNotFound {
            message: "The dataset has no time steps".to_string(),
        });
    }
    match requested {
        Some(i) if i >= n => Err(GcmError::InvalidParameter {
            param: "time_index".to_string(),
            message: format!("Time index {} out of range (0-{})", i, n - 1),
        }),
        Some(i) => Ok(Some(i)),
        None => Ok(Some(n - 1)),
    }
}

/// Fix some dimensions of `var` and return the remaining plane as `[y, x]`
fn slice_2d(
    var: &DataArray,
    fixed: &[(&str, usize)],
    y_dim: &str,
    x_dim: &str,
) -> Result<Array2<f64>> {
    let mut values = var.values.clone();
    let mut dims = var.dims.clone();

    let mut axes: Vec<(usize, usize)> = fixed
        .iter()
        .filter_map(|(dim, idx)| var.axis_of(dim).map(|axis| (axis, *idx)))
        .collect();
    axes.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    for (axis, idx) in axes {
        if idx >= values.len_of(Axis(axis)) {
            return Err(GcmError::InvalidParameter {
                param: dims[axis].clone(),
                message: format!("Index {} out of range", idx),
            });
        }
        values = values.index_axis(Axis(axis), idx).to_owned();
        dims.remove(axis);
    }

    let (Some(y), Some(_)) = (
        dims.iter().position(|d| d == y_dim),
        dims.iter().position(|d| d == x_dim),
    ) else {
        return Err(GcmError::Shape {
            message: format!("Expected dimensions ({}, {}), found {:?}", y_dim, x_dim, dims),
        });
    };
    if dims.len() != 2 {
        return Err(GcmError::Shape {
            message: format!(
                "Expected a 2-D field in ({}, {}), found {:?}",
                y_dim, x_dim, dims
            ),
        });
    }

    let plane = values.into_dimensionality::<Ix2>()?;
    Ok(if y == 0 { plane } else { plane.reversed_axes() })
}

/// Indices that sort `coord` ascending
fn ascending_order(coord: &Array1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..coord.len()).collect();
    order.sort_by(|&a, &b| coord[a].total_cmp(&coord[b]));
    order
}

/// Finite value range; symmetric about zero for diverging maps
fn value_range(data: ArrayView2<f64>, symmetric: bool) -> (f64, f64) {
    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;
    for &val in data.iter() {
        if val.is_finite() {
            min_val = min_val.min(val);
            max_val = max_val.max(val);
        }
    }
    if symmetric {
        let bound = min_val.abs().max(max_val.abs());
        (-bound, bound)
    } else {
        (min_val, max_val)
    }
}

/// Render `data[row, col]` to an image. Row 0 is drawn at the top when
/// `first_row_on_top`, otherwise at the bottom.
fn render_field(
    data: ArrayView2<f64>,
    width: u32,
    height: u32,
    colormap: &dyn Colormap,
    first_row_on_top: bool,
) -> RgbaImage {
    let (rows, cols) = data.dim();
    let (min_val, max_val) = value_range(data, colormap.is_diverging());
    debug!("Rendering {}x{} cells, range [{}, {}]", rows, cols, min_val, max_val);

    let mut img = ImageBuffer::new(width, height);
    for y in 0..height {
        let band = (y as usize * rows / height as usize).min(rows.saturating_sub(1));
        let row = if first_row_on_top { band } else { rows - 1 - band };
        for x in 0..width {
            let col = (x as usize * cols / width as usize).min(cols.saturating_sub(1));
            let color = colormap.map(data[[row, col]], min_val, max_val);
            img.put_pixel(x, y, Rgba(color));
        }
    }
    img
}

fn finish(img: RgbaImage, output: Option<&Path>) -> Result<RgbaImage> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        img.save(path)?;
        info!("Wrote plot: {}", path.display());
    }
    Ok(img)
}

fn require_non_empty(rows: usize, cols: usize, what: &str) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(GcmError::ImageGeneration {
            message: format!("Nothing to draw for {}: {}x{} cells", what, rows, cols),
        });
    }
    Ok(())
}

/// Horizontal map of `var` on the level closest to `pressure`
pub fn isobaric_slice(
    ds: &GcmDataset,
    var: &str,
    pressure: f64,
    options: &PlotOptions,
) -> Result<RgbaImage> {
    options.validate()?;
    let field = ds.variable_checked(var)?;
    let level = ds.nearest_index(names::Z, pressure)?;
    let t = time_index(ds, field, options.time_index)?;
    debug!(
        "Isobaric slice of {} at level {} (requested p = {}), time index {:?}",
        var, level, pressure, t
    );

    let mut fixed = vec![(names::Z, level)];
    if let Some(t) = t {
        fixed.push((names::TIME, t));
    }
    let plane = slice_2d(field, &fixed, names::LAT, names::LON)?;
    require_non_empty(plane.nrows(), plane.ncols(), var)?;

    let lat_order = ascending_order(ds.coordinate_checked(names::LAT)?);
    let lon_order = ascending_order(ds.coordinate_checked(names::LON)?);
    let plane = plane.select(Axis(0), &lat_order).select(Axis(1), &lon_order);

    let colormap = options.colormap_or(DEFAULT_COLORMAP)?;
    let img = render_field(
        plane.view(),
        options.width,
        options.height,
        colormap.as_ref(),
        false,
    );
    finish(img, options.output.as_deref())
}

/// Zonal mean of `var` as a latitude / pressure section
pub fn zonal_mean(ds: &GcmDataset, var: &str, options: &PlotOptions) -> Result<RgbaImage> {
    options.validate()?;
    let field = ds.variable_checked(var)?;
    let lon_axis = field.axis_of(names::LON).ok_or_else(|| GcmError::Shape {
        message: format!("Variable {} has no '{}' dimension", var, names::LON),
    })?;
    let t = time_index(ds, field, options.time_index)?;

    let mean_values = field
        .values
        .mean_axis(Axis(lon_axis))
        .ok_or_else(|| GcmError::ImageGeneration {
            message: format!("Variable {} has an empty longitude axis", var),
        })?;
    let mut mean_dims = field.dims.clone();
    mean_dims.remove(lon_axis);
    let mean = DataArray::new(&mean_dims, mean_values)?;

    let fixed: Vec<(&str, usize)> = t.map(|t| (names::TIME, t)).into_iter().collect();
    let plane = slice_2d(&mean, &fixed, names::Z, names::LAT)?;
    require_non_empty(plane.nrows(), plane.ncols(), var)?;

    let z_order = ascending_order(ds.coordinate_checked(names::Z)?);
    let lat_order = ascending_order(ds.coordinate_checked(names::LAT)?);
    let plane = plane.select(Axis(0), &z_order).select(Axis(1), &lat_order);

    let colormap = options.colormap_or(colormaps::DEFAULT_DIVERGING)?;
    let img = render_field(
        plane.view(),
        options.width,
        options.height,
        colormap.as_ref(),
        true,
    );
    finish(img, options.output.as_deref())
}

/// Vertical profiles of a (time, Z) field, one line per time step coloured
/// by time. Pressure is on a log axis growing downward.
pub fn time_evol(ds: &GcmDataset, var: &str, options: &PlotOptions) -> Result<RgbaImage> {
    options.validate()?;
    let field = ds.variable_checked(var)?;
    let profiles = slice_2d(field, &[], names::TIME, names::Z).map_err(|_| GcmError::Shape {
        message: format!(
            "time_evol needs a field in ({}, {}), {} has {:?}",
            names::TIME,
            names::Z,
            var,
            field.dims
        ),
    })?;
    require_non_empty(profiles.nrows(), profiles.ncols(), var)?;

    let z = ds.coordinate_checked(names::Z)?;
    if z.iter().any(|&p| p <= 0.0 || !p.is_finite()) {
        return Err(GcmError::InvalidParameter {
            param: names::Z.to_string(),
            message: "Pressure levels must be positive for a log axis".to_string(),
        });
    }
    let log_p = z.mapv(f64::log10);
    let (p_top, p_bottom) = log_p
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let (v_min, v_max) = value_range(profiles.view(), false);

    let width = options.width;
    let height = options.height;
    let left = MARGIN.min(width / 4) as f32;
    let top = MARGIN.min(height / 4) as f32;
    let plot_w = (width as f32 - 2.0 * left).max(1.0);
    let plot_h = (height as f32 - 2.0 * top).max(1.0);

    let to_x = |v: f64| -> f32 {
        let frac = if v_max > v_min { (v - v_min) / (v_max - v_min) } else { 0.5 };
        left + frac as f32 * plot_w
    };
    let to_y = |lp: f64| -> f32 {
        let frac = if p_bottom > p_top { (lp - p_top) / (p_bottom - p_top) } else { 0.5 };
        top + frac as f32 * plot_h
    };

    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, WHITE);
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(left as i32, top as i32).of_size(plot_w as u32, plot_h as u32),
        BLACK,
    );

    let colormap = options.colormap_or(DEFAULT_COLORMAP)?;
    let n_time = profiles.nrows();
    let order = ascending_order(&log_p);
    for (t, profile) in profiles.axis_iter(Axis(0)).enumerate() {
        let frac = if n_time > 1 { t as f64 / (n_time - 1) as f64 } else { 1.0 };
        let color = Rgba(colormap.map_normalized(frac));
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !(profile[a].is_finite() && profile[b].is_finite()) {
                continue;
            }
            draw_line_segment_mut(
                &mut img,
                (to_x(profile[a]), to_y(log_p[a])),
                (to_x(profile[b]), to_y(log_p[b])),
                color,
            );
        }
    }

    finish(img, options.output.as_deref())
}
