//! Test data generation utilities.
//!
//! Builds basic GCM datasets with known patterns and writes raw MITgcm MDS
//! output to disk.

use gcmtools::names;
use gcmtools::{DataArray, GcmDataset};
use ndarray::{Array, Array1, Dimension, IxDyn};
use std::path::Path;

pub const N_Z: usize = 4;
pub const N_LAT: usize = 6;
pub const N_LON: usize = 8;

/// Pressure levels in bar, surface first
pub fn levels_bar() -> Vec<f64> {
    vec![1.0, 0.1, 0.01, 0.001]
}

/// A basic dataset in the given units.
///
/// Temperature falls with height and varies with longitude, the winds are
/// simple analytic patterns and the cell area is uniform, so horizontal
/// averages and overturning have closed forms.
pub fn create_basic_dataset(times: &[f64], p_unit: &str, time_unit: &str) -> GcmDataset {
    let n_time = times.len();
    let mut ds = GcmDataset::new();
    ds.add_coordinate(names::TIME, Array1::from_vec(times.to_vec()));
    let z: Vec<f64> = match p_unit {
        "Pa" => levels_bar().iter().map(|p| p * 1.0e5).collect(),
        _ => levels_bar(),
    };
    ds.add_coordinate(names::Z, Array1::from_vec(z));
    ds.add_coordinate(
        names::LAT,
        Array1::from_iter((0..N_LAT).map(|j| -75.0 + j as f64 * 30.0)),
    );
    ds.add_coordinate(
        names::LON,
        Array1::from_iter((0..N_LON).map(|i| i as f64 * 360.0 / N_LON as f64)),
    );

    let dims = [names::TIME, names::Z, names::LAT, names::LON];
    let shape = [n_time, N_Z, N_LAT, N_LON];
    let patterns: [(&str, fn(&[usize]) -> f64); 4] = [
        (names::T, |ix| 1500.0 - 100.0 * ix[1] as f64 + ix[3] as f64 + ix[0] as f64),
        (names::U, |ix| 100.0 * ix[2] as f64),
        (names::V, |ix| 2.0 + ix[1] as f64),
        (names::W, |_| 0.0),
    ];
    for (name, pattern) in patterns {
        let values = Array::from_shape_fn(IxDyn(&shape), |ix| pattern(ix.slice()));
        ds.add_variable(name, DataArray::new(&dims, values).unwrap())
            .unwrap();
    }

    let area = Array::from_elem(IxDyn(&[N_LAT, N_LON]), 1.0e12);
    ds.add_variable(
        names::AREA_C,
        DataArray::new(&[names::LAT, names::LON], area).unwrap(),
    )
    .unwrap();

    ds.set_attribute(names::GRAVITY, 24.79);
    ds.set_attribute(names::P_ROT, 2.0);
    ds.set_attribute(names::P_ORB, 2.0);
    ds.set_attribute(names::R_P, 7.0e7);
    ds.set_attribute(names::DT, 86.4);
    ds.set_attribute(names::P_UNIT, p_unit);
    ds.set_attribute(names::TIME_UNIT, time_unit);
    ds
}

/// Write an MDS pair; `dims` are in Fortran order (x fastest)
fn write_mds(dir: &Path, stem: &str, dims: &[usize], values: &[f64]) {
    let dim_list: Vec<String> = dims
        .iter()
        .map(|d| format!("{:5},{:5},{:5}", d, 1, d))
        .collect();
    let meta = format!(
        " nDims = [ {} ];\n dimList = [\n{}\n ];\n dataprec = [ 'float64' ];\n nrecords = [ 1 ];\n",
        dims.len(),
        dim_list.join(",\n")
    );
    std::fs::write(dir.join(format!("{}.meta", stem)), meta).unwrap();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    std::fs::write(dir.join(format!("{}.data", stem)), bytes).unwrap();
}

/// Raw MITgcm output on an `N_LON` x `N_LAT` x `N_Z` grid with pressure
/// levels in Pa and one snapshot per iteration. Temperature at an iteration
/// is `iter` everywhere, so the time axis can be traced through conversions.
pub fn write_mitgcm_run(dir: &Path, iters: &[u64], delta_t: f64) {
    let n2 = N_LON * N_LAT;
    let xc: Vec<f64> = (0..n2)
        .map(|k| (k % N_LON) as f64 * 360.0 / N_LON as f64)
        .collect();
    let yc: Vec<f64> = (0..n2)
        .map(|k| -75.0 + (k / N_LON) as f64 * 30.0)
        .collect();
    write_mds(dir, "XC", &[N_LON, N_LAT], &xc);
    write_mds(dir, "YC", &[N_LON, N_LAT], &yc);
    write_mds(dir, "RAC", &[N_LON, N_LAT], &vec![1.0e12; n2]);
    let rc: Vec<f64> = levels_bar().iter().map(|p| p * 1.0e5).collect();
    write_mds(dir, "RC", &[1, 1, N_Z], &rc);

    let n3 = n2 * N_Z;
    for &iter in iters {
        let stem = |name: &str| format!("{}.{:010}", name, iter);
        write_mds(dir, &stem("T"), &[N_LON, N_LAT, N_Z], &vec![iter as f64; n3]);
        write_mds(dir, &stem("U"), &[N_LON, N_LAT, N_Z], &vec![10.0; n3]);
        write_mds(dir, &stem("V"), &[N_LON, N_LAT, N_Z], &vec![0.0; n3]);
        write_mds(dir, &stem("W"), &[N_LON, N_LAT, N_Z], &vec![0.0; n3]);
    }

    std::fs::write(
        dir.join("data"),
        format!(
            " &PARM01\n gravity=24.79,\n rSphere=7.0E7,\n rotationPeriod=172800.,\n &\n &PARM03\n deltaT={},\n &\n",
            delta_t
        ),
    )
    .unwrap();
}
