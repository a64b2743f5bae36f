//! In-memory representation of one GCM simulation run.
//!
//! A [`GcmDataset`] is a labeled collection of multi-dimensional arrays:
//! 1-D coordinate axes, data variables that refer to those axes by name, and
//! scalar global attributes (planet parameters, units, the tag).

use indexmap::IndexMap;
use ndarray::{stack, Array1, ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GcmError, Result};
use crate::names;

/// Possible attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

/// A named-dimension array
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    /// Dimension names, one per axis
    pub dims: Vec<String>,
    /// Values
    pub values: ArrayD<f64>,
    /// Variable attributes
    pub attributes: IndexMap<String, AttributeValue>,
}

impl DataArray {
    /// Create a new DataArray, checking that there is one name per axis
    pub fn new<S: AsRef<str>>(dims: &[S], values: ArrayD<f64>) -> Result<Self> {
        if dims.len() != values.ndim() {
            return Err(GcmError::Shape {
                message: format!(
                    "{} dimension names given for an array of rank {}",
                    dims.len(),
                    values.ndim()
                ),
            });
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            values,
            attributes: IndexMap::new(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Axis index of a named dimension
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    /// Attach an attribute, builder style
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Sum over the named dimensions. Dimensions the array lacks are ignored.
    pub fn sum_over(&self, dims: &[&str]) -> DataArray {
        let mut axes: Vec<usize> = dims.iter().filter_map(|d| self.axis_of(d)).collect();
        axes.sort_unstable_by(|a, b| b.cmp(a));

        let mut values = self.values.clone();
        let mut kept = self.dims.clone();
        for axis in axes {
            values = values.sum_axis(Axis(axis));
            kept.remove(axis);
        }

        DataArray {
            dims: kept,
            values,
            attributes: IndexMap::new(),
        }
    }

    /// Broadcast this array against a target layout given by dimension names
    /// and sizes. Every dimension of `self` must appear in the target with the
    /// same size.
    pub fn broadcast_to(&self, dims: &[String], shape: &[usize]) -> Result<ArrayD<f64>> {
        let mut positions = Vec::with_capacity(self.dims.len());
        for (axis, dim) in self.dims.iter().enumerate() {
            let pos = dims.iter().position(|d| d == dim).ok_or_else(|| GcmError::Shape {
                message: format!("Dimension '{}' is not part of the target layout {:?}", dim, dims),
            })?;
            if shape[pos] != self.values.shape()[axis] {
                return Err(GcmError::Shape {
                    message: format!(
                        "Dimension '{}' has size {} but the target expects {}",
                        dim,
                        self.values.shape()[axis],
                        shape[pos]
                    ),
                });
            }
            positions.push(pos);
        }

        // Reorder our axes to follow the target order, then pad with length-1 axes.
        let mut axes: Vec<usize> = (0..self.dims.len()).collect();
        axes.sort_by_key(|&a| positions[a]);
        let permuted = self.values.view().permuted_axes(axes.as_slice());

        let padded: Vec<usize> = dims
            .iter()
            .zip(shape)
            .map(|(d, &n)| if self.dims.contains(d) { n } else { 1 })
            .collect();
        let reshaped = ArrayD::from_shape_vec(IxDyn(&padded), permuted.iter().cloned().collect())?;

        let broadcast = reshaped.broadcast(IxDyn(shape)).ok_or_else(|| GcmError::Shape {
            message: format!("Cannot broadcast {:?} to {:?}", padded, shape),
        })?;
        Ok(broadcast.to_owned())
    }
}

/// One GCM simulation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcmDataset {
    /// Coordinate axes, in insertion order
    pub coordinates: IndexMap<String, Array1<f64>>,
    /// Data variables, in insertion order
    pub variables: IndexMap<String, DataArray>,
    /// Global attributes
    pub attributes: IndexMap<String, AttributeValue>,
}

impl GcmDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a coordinate axis
    pub fn add_coordinate(&mut self, name: &str, values: Array1<f64>) {
        self.coordinates.insert(name.to_string(), values);
    }

    /// Add or replace a data variable. All of its dimensions must already
    /// exist as coordinates with matching lengths.
    pub fn add_variable(&mut self, name: &str, var: DataArray) -> Result<()> {
        for (axis, dim) in var.dims.iter().enumerate() {
            let size = self.dim_size(dim).ok_or_else(|| GcmError::Shape {
                message: format!(
                    "Variable {} references non-existent dimension {}",
                    name, dim
                ),
            })?;
            if size != var.shape()[axis] {
                return Err(GcmError::Shape {
                    message: format!(
                        "Variable {} dimension {} has inconsistent size: expected {}, got {}",
                        name,
                        dim,
                        size,
                        var.shape()[axis]
                    ),
                });
            }
        }
        self.variables.insert(name.to_string(), var);
        Ok(())
    }

    pub fn coordinate(&self, name: &str) -> Option<&Array1<f64>> {
        self.coordinates.get(name)
    }

    pub fn coordinate_mut(&mut self, name: &str) -> Option<&mut Array1<f64>> {
        self.coordinates.get_mut(name)
    }

    /// Get coordinate values with error handling
    pub fn coordinate_checked(&self, name: &str) -> Result<&Array1<f64>> {
        self.coordinates.get(name).ok_or_else(|| GcmError::DataNotFound {
            message: format!("Coordinate not found: {}", name),
        })
    }

    pub fn variable(&self, name: &str) -> Option<&DataArray> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.variables.get_mut(name)
    }

    /// Get a variable with error handling
    pub fn variable_checked(&self, name: &str) -> Result<&DataArray> {
        self.variables.get(name).ok_or_else(|| GcmError::DataNotFound {
            message: format!("Variable not found: {}", name),
        })
    }

    pub fn has_coordinate(&self, name: &str) -> bool {
        self.coordinates.contains_key(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn number_attribute(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name) {
            Some(AttributeValue::Number(v)) => Some(*v),
            Some(AttributeValue::NumberArray(v)) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Numeric attribute with error handling
    pub fn number_attribute_checked(&self, name: &str) -> Result<f64> {
        self.number_attribute(name).ok_or_else(|| GcmError::DataNotFound {
            message: format!("Numeric attribute not found: {}", name),
        })
    }

    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(AttributeValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The tag stamped on insertion, if any
    pub fn tag(&self) -> Option<&str> {
        self.text_attribute(names::TAG)
    }

    /// Length of a dimension, taken from its coordinate axis
    pub fn dim_size(&self, name: &str) -> Option<usize> {
        self.coordinates.get(name).map(|c| c.len())
    }

    /// Index of the coordinate value closest to `value`
    pub fn nearest_index(&self, dim: &str, value: f64) -> Result<usize> {
        let coords = self.coordinate_checked(dim)?;
        if coords.is_empty() {
            return Err(GcmError::DataNotFound {
                message: format!("Coordinate {} is empty", dim),
            });
        }

        let mut closest_idx = 0;
        let mut min_diff = f64::MAX;
        for (i, &coord) in coords.iter().enumerate() {
            let diff = (coord - value).abs();
            if diff < min_diff {
                min_diff = diff;
                closest_idx = i;
            }
        }
        Ok(closest_idx)
    }

    /// Append the time steps of `other` that are not yet present here and
    /// sort the result by time. Returns the number of appended steps.
    ///
    /// Variables are merged by name. For a time step held by both datasets
    /// the values already stored here win. A time-dependent variable that
    /// only one side carries keeps its data and is filled with NaN for the
    /// steps the other side contributes. Coordinates and static variables
    /// missing here are taken from `other`.
    pub fn merge_along_time(&mut self, other: &GcmDataset) -> Result<usize> {
        let own_time = self.coordinate_checked(names::TIME)?.clone();
        let other_time = other.coordinate_checked(names::TIME)?;

        let new_steps: Vec<f64> = other_time
            .iter()
            .copied()
            .filter(|t| time_position(&own_time, *t).is_none())
            .collect();
        let mut time: Vec<f64> = own_time
            .iter()
            .copied()
            .chain(new_steps.iter().copied())
            .collect();
        time.sort_by(|a, b| a.total_cmp(b));

        for (name, coord) in &other.coordinates {
            if !self.coordinates.contains_key(name) {
                self.coordinates.insert(name.clone(), coord.clone());
            }
        }

        let var_names: Vec<String> = self
            .variables
            .keys()
            .chain(other.variables.keys().filter(|k| !self.variables.contains_key(*k)))
            .cloned()
            .collect();

        let mut merged = IndexMap::new();
        for name in var_names {
            let own = self.variables.get(&name);
            let incoming = other.variables.get(&name);
            let Some(template) = own.or(incoming) else {
                continue;
            };
            if let (Some(a), Some(b)) = (own, incoming) {
                if a.dims != b.dims {
                    return Err(GcmError::Shape {
                        message: format!(
                            "Variable {} has dimensions {:?} but the merged dataset has {:?}",
                            name, a.dims, b.dims
                        ),
                    });
                }
            }
            let axis = match template.axis_of(names::TIME) {
                Some(axis) if !time.is_empty() => axis,
                _ => {
                    merged.insert(name, template.clone());
                    continue;
                }
            };

            let mut slice_shape = template.shape().to_vec();
            slice_shape.remove(axis);
            let gap = ArrayD::from_elem(IxDyn(&slice_shape), f64::NAN);

            let mut slices = Vec::with_capacity(time.len());
            let mut padded = 0;
            for &t in &time {
                let step = own
                    .zip(time_position(&own_time, t))
                    .or_else(|| incoming.zip(time_position(other_time, t)))
                    .map(|(var, i)| var.values.index_axis(Axis(axis), i));
                match step {
                    Some(view) => slices.push(view),
                    None => {
                        padded += 1;
                        slices.push(gap.view());
                    }
                }
            }
            if padded > 0 {
                warn!(
                    "Variable {} has no data for {} time step(s), filled with NaN",
                    name, padded
                );
            }

            let values = stack(Axis(axis), &slices)?;
            merged.insert(
                name,
                DataArray {
                    dims: template.dims.clone(),
                    values,
                    attributes: template.attributes.clone(),
                },
            );
        }

        self.coordinates
            .insert(names::TIME.to_string(), Array1::from_vec(time));
        self.variables = merged;
        Ok(new_steps.len())
    }

    /// Validate that the dataset is internally consistent
    pub fn validate(&self) -> Result<()> {
        for (name, var) in &self.variables {
            if var.dims.len() != var.values.ndim() {
                return Err(GcmError::Shape {
                    message: format!(
                        "Variable {} has {} dimension names for rank {}",
                        name,
                        var.dims.len(),
                        var.values.ndim()
                    ),
                });
            }
            for (axis, dim) in var.dims.iter().enumerate() {
                match self.dim_size(dim) {
                    None => {
                        return Err(GcmError::Shape {
                            message: format!(
                                "Variable {} references non-existent dimension {}",
                                name, dim
                            ),
                        })
                    }
                    Some(size) if size != var.shape()[axis] => {
                        return Err(GcmError::Shape {
                            message: format!(
                                "Variable {} has inconsistent dimension size at index {}: coordinate={}, data={}",
                                name, axis, size, var.shape()[axis]
                            ),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Index of the time step equal to `t`
fn time_position(time: &Array1<f64>, t: f64) -> Option<usize> {
    time.iter().position(|&v| v == t)
}
