//! Dataset classification ("passport") checks.
//!
//! [`check_basic`] lists every requirement a dataset misses to qualify as a
//! basic GCM dataset. [`is_the_data_basic`] logs those findings but always
//! answers `true`, so insertion is never blocked by it; callers that want a
//! hard failure use the report's [`SchemaReport::is_complete`] instead.

use std::fmt;

use crate::dataset::GcmDataset;
use crate::logging::{write_status, Status};
use crate::names;

/// Kind of element a requirement refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    Coordinate,
    Variable,
    Attribute,
}

/// One missing element of a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub name: &'static str,
    pub description: &'static str,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.description)
    }
}

const BASIC_COORDINATES: [(&str, &str); 4] = [
    (names::LON, "longitude"),
    (names::LAT, "latitude"),
    (names::Z, "vertical level"),
    (names::TIME, "time"),
];

const BASIC_VARIABLES: [(&str, &str); 4] = [
    (names::T, "temperature"),
    (names::U, "equatorial wind"),
    (names::V, "polar wind"),
    (names::W, "vertical wind"),
];

const BASIC_ATTRIBUTES: [(&str, &str); 4] = [
    (names::GRAVITY, "average gravity"),
    (names::P_ROT, "rotational period"),
    (names::P_ORB, "orbital period"),
    (names::R_P, "planet radius"),
];

const CLOUD_VARIABLES: [(&str, &str); 4] = [
    (names::CLOUD_ABUNDANCE, "cloud abundance"),
    (names::CLOUD_RADIUS, "cloud particle radius"),
    (names::CLOUD_SCATTERING, "cloud scattering opacity"),
    (names::CLOUD_ABSORPTION, "cloud absorption opacity"),
];

/// Outcome of a schema check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub missing: Vec<Requirement>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Comma separated list of the missing names
    pub fn summary(&self) -> String {
        self.missing
            .iter()
            .map(|r| r.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn collect(
    report: &mut SchemaReport,
    kind: RequirementKind,
    wanted: &[(&'static str, &'static str)],
    present: impl Fn(&str) -> bool,
) {
    for &(name, description) in wanted {
        if !present(name) {
            report.missing.push(Requirement {
                kind,
                name,
                description,
            });
        }
    }
}

/// List every requirement of a basic GCM dataset that `ds` does not meet.
pub fn check_basic(ds: &GcmDataset) -> SchemaReport {
    let mut report = SchemaReport::default();
    collect(&mut report, RequirementKind::Coordinate, &BASIC_COORDINATES, |n| {
        ds.has_coordinate(n)
    });
    collect(&mut report, RequirementKind::Variable, &BASIC_VARIABLES, |n| {
        ds.has_variable(n)
    });
    collect(&mut report, RequirementKind::Attribute, &BASIC_ATTRIBUTES, |n| {
        ds.has_attribute(n)
    });
    report
}

/// List the cloud fields `ds` lacks (basic requirements not included).
pub fn check_clouds(ds: &GcmDataset) -> SchemaReport {
    let mut report = SchemaReport::default();
    collect(&mut report, RequirementKind::Variable, &CLOUD_VARIABLES, |n| {
        ds.has_variable(n)
    });
    report
}

/// Log whether `ds` qualifies as a basic GCM dataset.
///
/// Every missing element is reported individually. The return value is
/// always `true`: this check is informational only.
pub fn is_the_data_basic(ds: &GcmDataset) -> bool {
    let report = check_basic(ds);
    let tag = ds.tag().unwrap_or("<untagged>");

    for requirement in &report.missing {
        let what = match requirement.kind {
            RequirementKind::Coordinate => "information",
            RequirementKind::Variable | RequirementKind::Attribute => "data",
        };
        write_status(
            Status::ErrorInfo,
            &format!(
                "The dataset \"{}\" does not contain {} {} and therefore does not qualify as a basic GCM dataset.",
                tag, requirement, what
            ),
        );
    }

    if !report.is_complete() {
        write_status(
            Status::Error,
            "The data does not fulfill the requirements for a basic dataset.",
        );
    }

    true
}

/// Check the cloud fields on top of the basic requirements.
///
/// Returns `false` if any of the four cloud fields is missing.
pub fn is_the_data_cloudy(ds: &GcmDataset) -> bool {
    is_the_data_basic(ds);

    let tag = ds.tag().unwrap_or("<untagged>");
    let report = check_clouds(ds);
    for requirement in &report.missing {
        write_status(
            Status::Warn,
            &format!("{} is missing from the dataset {}", requirement, tag),
        );
    }
    report.is_complete()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_empty_dataset_reports_everything() {
        let ds = GcmDataset::new();
        let report = check_basic(&ds);
        assert_eq!(report.missing.len(), 12);
        assert!(!report.is_complete());
        assert!(report.summary().starts_with("lon, lat, Z, time, T"));
    }

    #[test]
    fn test_basic_check_is_lenient() {
        let mut ds = GcmDataset::new();
        ds.add_coordinate(names::LON, array![0.0]);
        ds.set_attribute(names::GRAVITY, 9.81);

        let report = check_basic(&ds);
        assert_eq!(report.missing.len(), 10);
        assert!(report.missing.iter().all(|r| r.name != names::LON));
        // failures are logged, never returned
        assert!(is_the_data_basic(&ds));
    }

    #[test]
    fn test_cloudy_check_fails_without_cloud_fields() {
        let ds = GcmDataset::new();
        assert!(!is_the_data_cloudy(&ds));
        assert_eq!(check_clouds(&ds).missing.len(), 4);
    }
}
