//! Assertion utilities for testing.
//!
//! Floating-point comparisons for dataset values.

use gcmtools::GcmDataset;

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal,
/// relative to the larger magnitude when that exceeds one.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON) * expected.abs().max(1.0);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Element-wise [`assert_approx_eq`] over two sequences of the same length
pub fn assert_all_approx_eq<'a>(
    actual: impl IntoIterator<Item = &'a f64>,
    expected: impl IntoIterator<Item = &'a f64>,
    epsilon: Option<f64>,
) {
    let actual: Vec<f64> = actual.into_iter().copied().collect();
    let expected: Vec<f64> = expected.into_iter().copied().collect();
    assert_eq!(
        actual.len(),
        expected.len(),
        "Sequences have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_approx_eq(*a, *e, epsilon);
    }
}

/// Assert that two datasets hold the same variables with approximately the
/// same values, and the same attributes
pub fn assert_datasets_approx_eq(actual: &GcmDataset, expected: &GcmDataset) {
    assert_eq!(
        actual.coordinates.keys().collect::<Vec<_>>(),
        expected.coordinates.keys().collect::<Vec<_>>()
    );
    for (name, coord) in &expected.coordinates {
        assert_all_approx_eq(actual.coordinates[name].iter(), coord.iter(), None);
    }
    assert_eq!(
        actual.variables.keys().collect::<Vec<_>>(),
        expected.variables.keys().collect::<Vec<_>>()
    );
    for (name, var) in &expected.variables {
        let got = &actual.variables[name];
        assert_eq!(got.dims, var.dims, "dims of {}", name);
        assert_all_approx_eq(got.values.iter(), var.values.iter(), None);
    }
    assert_eq!(actual.attributes, expected.attributes);
}
