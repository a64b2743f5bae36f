//! Synthetic datasets shared by the unit tests.

use ndarray::{Array, Array1, ArrayD, IxDyn};

use crate::dataset::{DataArray, GcmDataset};
use crate::names;

pub(crate) const N_TIME: usize = 2;
pub(crate) const N_Z: usize = 3;
pub(crate) const N_LAT: usize = 4;
pub(crate) const N_LON: usize = 5;

pub(crate) fn field_dims() -> [&'static str; 4] {
    [names::TIME, names::Z, names::LAT, names::LON]
}

/// Field over (time, Z, lat, lon) filled by `f(t, z, lat, lon)`
pub(crate) fn field(f: impl Fn(usize, usize, usize, usize) -> f64) -> DataArray {
    let values = Array::from_shape_fn(IxDyn(&[N_TIME, N_Z, N_LAT, N_LON]), |ix| {
        f(ix[0], ix[1], ix[2], ix[3])
    });
    DataArray::new(&field_dims(), values).expect("rank matches")
}

/// A basic dataset with units bar/day.
pub(crate) fn basic_dataset() -> GcmDataset {
    let mut ds = GcmDataset::new();
    ds.add_coordinate(names::TIME, Array1::from_vec(vec![10.0, 20.0]));
    ds.add_coordinate(names::Z, Array1::from_vec(vec![1.0, 0.1, 0.01]));
    ds.add_coordinate(names::LAT, Array1::from_vec(vec![-67.5, -22.5, 22.5, 67.5]));
    ds.add_coordinate(names::LON, Array1::linspace(0.0, 288.0, N_LON));

    let fields: [(&str, fn(usize, usize, usize, usize) -> f64); 4] = [
        (names::T, |t, z, la, lo| 1000.0 + (t + z + la + lo) as f64),
        (names::U, |_, z, la, _| (z * la) as f64),
        (names::V, |_, z, la, lo| (z + 1) as f64 * (la as f64 - 1.5) + lo as f64),
        (names::W, |_, _, _, _| 0.0),
    ];
    for (name, f) in fields {
        ds.add_variable(name, field(f)).expect("consistent dims");
    }

    let area: ArrayD<f64> =
        Array::from_shape_fn(IxDyn(&[N_LAT, N_LON]), |ix| 1.0 + ix[0] as f64 * 2.0 + ix[1] as f64);
    ds.add_variable(
        names::AREA_C,
        DataArray::new(&[names::LAT, names::LON], area).expect("rank matches"),
    )
    .expect("consistent dims");

    ds.set_attribute(names::GRAVITY, 9.81);
    ds.set_attribute(names::P_ROT, 1.0);
    ds.set_attribute(names::P_ORB, 1.0);
    ds.set_attribute(names::R_P, 7.0e7);
    ds.set_attribute(names::DT, 25.0);
    ds.set_attribute(names::P_UNIT, "bar");
    ds.set_attribute(names::TIME_UNIT, "day");
    ds
}
