//! Zarr V3 reading and writing.
//!
//! A dataset is stored as one group. Each coordinate and each variable is an
//! array below the root, with its dimension names in `_ARRAY_DIMENSIONS`.
//! The group attributes hold the dataset attributes plus the ordered lists of
//! coordinate and variable names.

use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, ArrayD, IxDyn};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs_filesystem::FilesystemStore;

use crate::dataset::{AttributeValue, DataArray, GcmDataset};
use crate::error::{GcmError, Result};

const DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";
const COORDINATES_ATTR: &str = "_gcmtools_coordinates";
const VARIABLES_ATTR: &str = "_gcmtools_variables";

/// Write a dataset to the store at `path`, replacing any existing store
pub fn write_dataset(ds: &GcmDataset, path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path).map_err(GcmError::zarr)?);

    let mut group_attrs = Map::new();
    for (name, value) in &ds.attributes {
        group_attrs.insert(name.clone(), attribute_to_json(value));
    }
    group_attrs.insert(
        COORDINATES_ATTR.to_string(),
        json!(ds.coordinates.keys().collect::<Vec<_>>()),
    );
    group_attrs.insert(
        VARIABLES_ATTR.to_string(),
        json!(ds.variables.keys().collect::<Vec<_>>()),
    );

    let group = GroupBuilder::new()
        .attributes(group_attrs)
        .build(store.clone(), "/")
        .map_err(GcmError::zarr)?;
    group.store_metadata().map_err(GcmError::zarr)?;

    for (name, values) in &ds.coordinates {
        let mut attrs = Map::new();
        attrs.insert(DIMENSIONS_ATTR.to_string(), json!([name]));
        write_array(&store, name, &[values.len()], values.to_vec(), attrs)?;
    }

    for (name, array) in &ds.variables {
        let mut attrs = Map::new();
        attrs.insert(DIMENSIONS_ATTR.to_string(), json!(array.dims));
        for (attr_name, value) in &array.attributes {
            attrs.insert(attr_name.clone(), attribute_to_json(value));
        }
        let flat: Vec<f64> = array.values.iter().copied().collect();
        write_array(&store, name, array.shape(), flat, attrs)?;
    }

    info!("Wrote Zarr store: {}", path.display());
    Ok(())
}

fn write_array(
    store: &Arc<FilesystemStore>,
    name: &str,
    shape: &[usize],
    data: Vec<f64>,
    attrs: Map<String, Value>,
) -> Result<()> {
    let shape: Vec<u64> = shape.iter().map(|&n| n as u64).collect();
    let chunk_shape: Vec<u64> = shape.iter().map(|&n| n.max(1)).collect();
    let chunk_grid: zarrs::array::ChunkGrid = chunk_shape.try_into().map_err(GcmError::zarr)?;

    let array = ArrayBuilder::new(
        shape.clone(),
        DataType::Float64,
        chunk_grid,
        FillValue::from(f64::NAN),
    )
    .attributes(attrs)
    .build(store.clone(), &format!("/{}", name))
    .map_err(GcmError::zarr)?;

    array.store_metadata().map_err(GcmError::zarr)?;
    let subset = ArraySubset::new_with_shape(shape);
    array
        .store_array_subset_elements(&subset, &data)
        .map_err(GcmError::zarr)?;
    debug!("Stored Zarr array {} with {} values", name, data.len());
    Ok(())
}

/// Load the store at `path` into a dataset
pub fn read_dataset(path: &Path) -> Result<GcmDataset> {
    if !path.is_dir() {
        return Err(GcmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Zarr store not found: {}", path.display()),
        )));
    }
    let store = Arc::new(FilesystemStore::new(path).map_err(GcmError::zarr)?);
    let group = Group::open(store.clone(), "/").map_err(GcmError::zarr)?;

    let mut ds = GcmDataset::new();
    let mut coordinate_names = Vec::new();
    let mut variable_names = Vec::new();
    for (name, value) in group.attributes() {
        match name.as_str() {
            COORDINATES_ATTR => coordinate_names = json_names(value)?,
            VARIABLES_ATTR => variable_names = json_names(value)?,
            _ => {
                ds.attributes.insert(name.clone(), json_to_attribute(value)?);
            }
        }
    }

    for name in &coordinate_names {
        let (_, values, _) = read_array(&store, name)?;
        ds.add_coordinate(name, Array1::from_vec(values));
    }

    for name in &variable_names {
        let (shape, values, mut attrs) = read_array(&store, name)?;
        let dims = match attrs.shift_remove(DIMENSIONS_ATTR) {
            Some(value) => json_names(&value)?,
            None => {
                return Err(GcmError::zarr(format!(
                    "Array {} has no {} attribute",
                    name, DIMENSIONS_ATTR
                )))
            }
        };
        let values = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        let mut array = DataArray::new(&dims, values)?;
        for (attr_name, value) in attrs {
            array.attributes.insert(attr_name, json_to_attribute(&value)?);
        }
        ds.add_variable(name, array)?;
    }

    info!("Opened Zarr store: {}", path.display());
    Ok(ds)
}

type RawArray = (Vec<usize>, Vec<f64>, indexmap::IndexMap<String, Value>);

fn read_array(store: &Arc<FilesystemStore>, name: &str) -> Result<RawArray> {
    let array = Array::open(store.clone(), &format!("/{}", name)).map_err(GcmError::zarr)?;
    let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();
    let subset = ArraySubset::new_with_shape(array.shape().to_vec());
    let values: Vec<f64> = array
        .retrieve_array_subset_elements(&subset)
        .map_err(GcmError::zarr)?;
    let attrs = array
        .attributes()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok((shape, values, attrs))
}

/// Append the time steps of `ds` that the store at `path` does not hold yet.
/// Variables the store lacks are added with the values `ds` has for them.
/// A missing store is created. Returns the number of appended steps.
pub fn append_along_time(ds: &GcmDataset, path: &Path) -> Result<usize> {
    if !path.exists() {
        write_dataset(ds, path)?;
        return Ok(ds.coordinate(crate::names::TIME).map_or(0, |t| t.len()));
    }

    let mut stored = read_dataset(path)?;
    let new_variables: Vec<String> = ds
        .variables
        .keys()
        .filter(|name| !stored.has_variable(name))
        .cloned()
        .collect();
    let added = stored.merge_along_time(ds)?;
    for (name, value) in &ds.attributes {
        stored.attributes.insert(name.clone(), value.clone());
    }
    if added > 0 || !new_variables.is_empty() {
        if !new_variables.is_empty() {
            info!("Adding variables {:?} to {}", new_variables, path.display());
        }
        write_dataset(&stored, path)?;
    } else {
        debug!("No new time steps for {}", path.display());
    }
    Ok(added)
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Text(s) => json!(s),
        AttributeValue::Number(v) => json!(v),
        AttributeValue::NumberArray(v) => json!(v),
    }
}

fn json_to_attribute(value: &Value) -> Result<AttributeValue> {
    match value {
        Value::String(s) => Ok(AttributeValue::Text(s.clone())),
        Value::Number(n) => Ok(AttributeValue::Number(n.as_f64().unwrap_or(f64::NAN))),
        Value::Null => Ok(AttributeValue::Number(f64::NAN)),
        Value::Array(items) if items.iter().all(|v| v.is_number() || v.is_null()) => {
            Ok(AttributeValue::NumberArray(
                items.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect(),
            ))
        }
        other => Ok(AttributeValue::Text(other.to_string())),
    }
}

fn json_names(value: &Value) -> Result<Vec<String>> {
    serde_json::from_value(value.clone()).map_err(GcmError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;
    use crate::test_utils::basic_dataset;
    use ndarray::{array, concatenate, Axis};
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run1.zarr");

        let mut ds = basic_dataset();
        ds.set_attribute(names::TAG, "run1");
        write_dataset(&ds, &path).unwrap();

        let back = read_dataset(&path).unwrap();
        assert_eq!(back, ds);
        assert_eq!(back.tag(), Some("run1"));
    }

    #[test]
    fn test_missing_store() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_dataset(&dir.path().join("nope.zarr")),
            Err(GcmError::Io(_))
        ));
    }

    #[test]
    fn test_append_along_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run1.zarr");

        let ds = basic_dataset();
        assert_eq!(append_along_time(&ds, &path).unwrap(), 2);

        let mut later = basic_dataset();
        later.add_coordinate(names::TIME, array![20.0, 30.0]);
        assert_eq!(append_along_time(&later, &path).unwrap(), 1);

        let back = read_dataset(&path).unwrap();
        assert_eq!(back.coordinate(names::TIME).unwrap(), &array![10.0, 20.0, 30.0]);
        assert_eq!(back.variable(names::T).unwrap().shape()[0], 3);
        // area has no time axis and is left alone
        assert_eq!(back.variable(names::AREA_C).unwrap().shape(), &[4, 5]);

        assert_eq!(append_along_time(&later, &path).unwrap(), 0);
    }

    #[test]
    fn test_append_adds_new_variables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run1.zarr");
        write_dataset(&basic_dataset(), &path).unwrap();

        let mut extended = basic_dataset();
        extended.add_coordinate(names::TIME, array![10.0, 20.0, 30.0]);
        for var in extended.variables.values_mut() {
            if let Some(axis) = var.axis_of(names::TIME) {
                let last = var.values.index_axis(Axis(axis), 1).insert_axis(Axis(axis));
                var.values = concatenate(Axis(axis), &[var.values.view(), last]).unwrap();
            }
        }
        let derived = extended.variable(names::T).unwrap().clone();
        extended.add_variable("T_copy", derived).unwrap();

        assert_eq!(append_along_time(&extended, &path).unwrap(), 1);
        let back = read_dataset(&path).unwrap();
        assert_eq!(back.dim_size(names::TIME), Some(3));
        assert_eq!(
            back.variable("T_copy").unwrap().values,
            extended.variable(names::T).unwrap().values
        );

        // no new steps, but a new variable still reaches the store
        let mut more = back.clone();
        let area = more.variable(names::AREA_C).unwrap().clone();
        more.add_variable("area_copy", area).unwrap();
        assert_eq!(append_along_time(&more, &path).unwrap(), 0);
        assert!(read_dataset(&path).unwrap().has_variable("area_copy"));
    }

    #[test]
    fn test_json_attributes() {
        assert_eq!(
            json_to_attribute(&json!(3)).unwrap(),
            AttributeValue::Number(3.0)
        );
        assert_eq!(
            json_to_attribute(&json!([1, 2.5])).unwrap(),
            AttributeValue::NumberArray(vec![1.0, 2.5])
        );
        assert_eq!(
            json_to_attribute(&json!({"a": 1})).unwrap(),
            AttributeValue::Text(r#"{"a":1}"#.to_string())
        );
    }
}
