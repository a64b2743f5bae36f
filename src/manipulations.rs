//! Physical reductions over GCM datasets.

use std::f64::consts::PI;

use ndarray::{ArrayD, Axis};

use crate::dataset::{DataArray, GcmDataset};
use crate::error::{GcmError, Result};
use crate::names;

/// Pressure unit of the vertical axis that needs the SI correction
const NON_SI_PRESSURE_UNIT: &str = "bar";
const BAR_CORRECTION: f64 = 1.0e5;

/// Area-weighted horizontal average of `var_key`:
///
/// ```text
/// avg = sum(area * q over lon, lat) / sum(area over lon, lat)
/// ```
///
/// The result keeps the remaining dimensions of the field in their original
/// order (typically `time, Z`).
pub fn horizontal_average(ds: &GcmDataset, var_key: &str, area_key: &str) -> Result<DataArray> {
    let field = ds.variable_checked(var_key)?;
    let area = ds.variable_checked(area_key)?;

    for dim in names::HORIZONTAL_DIMS {
        if !field.has_dim(dim) {
            return Err(GcmError::Shape {
                message: format!(
                    "Variable {} has no '{}' dimension to average over",
                    var_key, dim
                ),
            });
        }
    }

    let weights = area.broadcast_to(&field.dims, field.shape())?;
    let weighted = DataArray {
        dims: field.dims.clone(),
        values: &weights * &field.values,
        attributes: Default::default(),
    };
    let total_area = DataArray {
        dims: field.dims.clone(),
        values: weights,
        attributes: Default::default(),
    };

    let numerator = weighted.sum_over(&names::HORIZONTAL_DIMS);
    let denominator = total_area.sum_over(&names::HORIZONTAL_DIMS);

    let mut avg = numerator;
    avg.values = &avg.values / &denominator.values;
    if let Some(units) = field.attributes.get("units") {
        avg.attributes.insert("units".to_string(), units.clone());
    }
    Ok(avg)
}

/// Trapezoidal cumulative integral along `axis` against `coord`, starting at 0.
pub fn cumulative_trapezoid(
    values: &ArrayD<f64>,
    coord: &[f64],
    axis: Axis,
) -> Result<ArrayD<f64>> {
    let n = values.len_of(axis);
    if coord.len() != n {
        return Err(GcmError::Shape {
            message: format!(
                "Integration axis has {} points but the coordinate has {}",
                n,
                coord.len()
            ),
        });
    }

    let mut out = ArrayD::<f64>::zeros(values.raw_dim());
    for k in 1..n {
        let step = 0.5 * (coord[k] - coord[k - 1]);
        let segment = (&values.index_axis(axis, k) + &values.index_axis(axis, k - 1)) * step;
        let running = &out.index_axis(axis, k - 1) + &segment;
        out.index_axis_mut(axis, k).assign(&running);
    }
    Ok(out)
}

/// Meridional overturning streamfunction
///
/// ```text
/// psi = 2 pi cos(lat) R_p / g * int V dp
/// ```
///
/// The integral runs along the vertical coordinate `Z`. When the dataset's
/// pressure unit is bar the integral is divided by 1e5. `R_p` and `g` come
/// from the dataset attributes.
pub fn meridional_overturning(ds: &GcmDataset, v_key: &str) -> Result<DataArray> {
    let v = ds.variable_checked(v_key)?;
    let z_axis = v.axis_of(names::Z).ok_or_else(|| GcmError::Shape {
        message: format!("Variable {} has no '{}' dimension", v_key, names::Z),
    })?;
    if !v.has_dim(names::LAT) {
        return Err(GcmError::Shape {
            message: format!("Variable {} has no '{}' dimension", v_key, names::LAT),
        });
    }

    let z = ds.coordinate_checked(names::Z)?;
    let mut integral = cumulative_trapezoid(&v.values, &z.to_vec(), Axis(z_axis))?;

    if ds.text_attribute(names::P_UNIT) == Some(NON_SI_PRESSURE_UNIT) {
        integral.mapv_inplace(|x| x / BAR_CORRECTION);
    }

    let radius = ds.number_attribute_checked(names::R_P)?;
    let gravity = ds.number_attribute_checked(names::GRAVITY)?;
    if gravity == 0.0 {
        return Err(GcmError::InvalidParameter {
            param: names::GRAVITY.to_string(),
            message: "surface gravity must be non-zero".to_string(),
        });
    }

    let lat = ds.coordinate_checked(names::LAT)?;
    let cos_lat = DataArray::new(
        &[names::LAT],
        lat.mapv(|l| (l / 180.0 * PI).cos()).into_dyn(),
    )?
    .broadcast_to(&v.dims, v.shape())?;

    let factor = 2.0 * PI * radius / gravity;
    Ok(DataArray {
        dims: v.dims.clone(),
        values: integral * &cos_lat * factor,
        attributes: Default::default(),
    })
}
