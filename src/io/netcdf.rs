//! NetCDF reading and writing.
//!
//! Layout: one dimension plus coordinate variable per coordinate axis, one
//! variable per data field, and the dataset attributes as global attributes.
//! All numeric data is stored as double precision. NetCDF has no way to tell
//! a one-element attribute array from a scalar, so a one-element
//! [`AttributeValue::NumberArray`] reads back as [`AttributeValue::Number`].

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD, IxDyn};
use netcdf::{self, Attribute, Variable as NetCDFVariable};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::{AttributeValue, DataArray, GcmDataset};
use crate::error::{GcmError, Result};

/// Load a NetCDF file into a dataset
pub fn read_dataset(path: &Path) -> Result<GcmDataset> {
    if !path.exists() {
        return Err(GcmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let file = netcdf::open(path)?;
    info!("Opened NetCDF file: {}", path.display());
    debug!("File has {} variables", file.variables().count());
    debug!("File has {} dimensions", file.dimensions().count());

    let mut ds = GcmDataset::new();
    for attr in file.attributes() {
        let value = convert_attribute(&attr)?;
        ds.attributes.insert(attr.name().to_string(), value);
    }

    let dimensions: IndexMap<String, usize> = file
        .dimensions()
        .map(|dim| (dim.name().to_string(), dim.len()))
        .collect();

    // Coordinates first, so that data variables can be checked against them.
    let mut data_vars = Vec::new();
    for var in file.variables() {
        let name = var.name().to_string();
        let var_dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        if var_dims.len() == 1 && var_dims[0] == name {
            ds.add_coordinate(&name, Array1::from_vec(read_values(&var)?));
        } else {
            data_vars.push((name, var_dims));
        }
    }

    for (dim_name, &size) in &dimensions {
        if !ds.has_coordinate(dim_name) {
            ds.add_coordinate(dim_name, Array1::from_iter((0..size).map(|i| i as f64)));
            warn!("Created default coordinates for dimension: {}", dim_name);
        }
    }

    for (name, var_dims) in data_vars {
        let Some(var) = file.variable(&name) else {
            continue;
        };
        let shape: Vec<usize> = var_dims.iter().map(|d| dimensions[d.as_str()]).collect();
        let values = ArrayD::from_shape_vec(IxDyn(&shape), read_values(&var)?)?;
        let mut array = DataArray::new(&var_dims, values)?;
        for attr in var.attributes() {
            let value = convert_attribute(&attr)?;
            array.attributes.insert(attr.name().to_string(), value);
        }
        ds.add_variable(&name, array)?;
    }

    Ok(ds)
}

/// Read a whole variable as f64, falling back to single precision storage
fn read_values(var: &NetCDFVariable) -> Result<Vec<f64>> {
    match var.get_values::<f64, _>(..) {
        Ok(values) => Ok(values),
        Err(_) => {
            let values: Vec<f32> = var.get_values::<f32, _>(..)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
    }
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;
    match value {
        NcAttributeValue::Str(s) => Ok(AttributeValue::Text(s)),

        NcAttributeValue::Uchar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Schar(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Short(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Int(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Longlong(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Float(v) => Ok(AttributeValue::Number(v as f64)),
        NcAttributeValue::Double(v) => Ok(AttributeValue::Number(v)),

        NcAttributeValue::Ints(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Floats(v) => Ok(AttributeValue::NumberArray(
            v.into_iter().map(|x| x as f64).collect(),
        )),
        NcAttributeValue::Doubles(v) => Ok(AttributeValue::NumberArray(v)),

        other => Ok(AttributeValue::Text(format!("{:?}", other))),
    }
}

/// Write a dataset to `path`, replacing an existing file
pub fn write_dataset(ds: &GcmDataset, path: &Path) -> Result<()> {
    if path.is_file() {
        std::fs::remove_file(path)?;
    }

    let mut file = netcdf::create(path)?;

    for (name, value) in &ds.attributes {
        match value {
            AttributeValue::Text(s) => file.add_attribute(name, s.as_str())?,
            AttributeValue::Number(v) => file.add_attribute(name, *v)?,
            AttributeValue::NumberArray(v) => file.add_attribute(name, v.clone())?,
        };
    }

    for (name, values) in &ds.coordinates {
        file.add_dimension(name, values.len())?;
    }

    for (name, values) in &ds.coordinates {
        let mut var = file.add_variable::<f64>(name, &[name.as_str()])?;
        var.put_values(&values.to_vec(), ..)?;
    }

    for (name, array) in &ds.variables {
        let dims: Vec<&str> = array.dims.iter().map(|d| d.as_str()).collect();
        let mut var = file.add_variable::<f64>(name, &dims)?;
        for (attr_name, value) in &array.attributes {
            match value {
                AttributeValue::Text(s) => var.put_attribute(attr_name, s.as_str())?,
                AttributeValue::Number(v) => var.put_attribute(attr_name, *v)?,
                AttributeValue::NumberArray(v) => var.put_attribute(attr_name, v.clone())?,
            };
        }
        let flat: Vec<f64> = array.values.iter().copied().collect();
        var.put_values(&flat, ..)?;
    }

    info!("Wrote NetCDF file: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;
    use crate::test_utils::basic_dataset;
    use tempfile::tempdir;

    #[test]
    fn test_file_not_found() {
        let result = read_dataset(Path::new("/nonexistent/file.nc"));
        match result.unwrap_err() {
            GcmError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.nc");

        let mut ds = basic_dataset();
        ds.set_attribute("levels", AttributeValue::NumberArray(vec![1.0, 2.0]));
        if let Some(t) = ds.variable_mut(names::T) {
            t.attributes
                .insert("units".to_string(), AttributeValue::Text("K".to_string()));
        }

        write_dataset(&ds, &path)?;
        let back = read_dataset(&path)?;
        assert_eq!(back, ds);

        // writing again replaces the file
        write_dataset(&ds, &path)?;
        assert_eq!(read_dataset(&path)?.variables.len(), ds.variables.len());
        Ok(())
    }

    #[test]
    fn test_single_element_array_reads_back_as_number() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.nc");

        let mut ds = basic_dataset();
        ds.set_attribute("one", AttributeValue::NumberArray(vec![3.5]));
        write_dataset(&ds, &path)?;

        let back = read_dataset(&path)?;
        assert_eq!(back.attribute("one"), Some(&AttributeValue::Number(3.5)));
        assert_eq!(back.number_attribute("one"), ds.number_attribute("one"));
        Ok(())
    }
}
