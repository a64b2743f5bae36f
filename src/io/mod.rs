//! Readers and writers that move datasets between disk and a session.
//!
//! Two container formats are supported for reduced datasets (NetCDF and
//! Zarr V3). Raw model output is read by a per-GCM reader.

pub mod mitgcm;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod zarr;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::GcmDataset;
use crate::error::{GcmError, Result};

pub use mitgcm::RawReadOptions;

/// On-disk container format of a reduced dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMethod {
    /// One NetCDF file per tag
    Nc,
    /// One Zarr V3 store (directory) per tag
    Zarr,
}

impl SaveMethod {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveMethod::Nc => "nc",
            SaveMethod::Zarr => "zarr",
        }
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| GcmError::InvalidParameter {
                param: "path".to_string(),
                message: format!("Cannot infer the container format of {}", path.display()),
            })?;
        ext.parse()
    }

    /// Location of the container for `tag` inside `dir`
    pub fn container_path(&self, dir: &Path, tag: &str) -> PathBuf {
        dir.join(format!("{}.{}", tag, self.extension()))
    }
}

impl FromStr for SaveMethod {
    type Err = GcmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim_start_matches('.') {
            "nc" => Ok(SaveMethod::Nc),
            "zarr" => Ok(SaveMethod::Zarr),
            other => Err(GcmError::InvalidParameter {
                param: "method".to_string(),
                message: format!("Unknown save method '{}', please use zarr or nc", other),
            }),
        }
    }
}

impl fmt::Display for SaveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// GCM families with a raw reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcmKind {
    MitGcm,
}

impl FromStr for GcmKind {
    type Err = GcmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("mitgcm") {
            Ok(GcmKind::MitGcm)
        } else {
            Err(GcmError::UnsupportedGcm { gcm: s.to_string() })
        }
    }
}

impl fmt::Display for GcmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcmKind::MitGcm => f.write_str("MITgcm"),
        }
    }
}

/// Which iterations of the raw output to read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IterSelection {
    /// Read no iteration (grid only)
    None,
    /// Only the most recent iteration
    #[default]
    Last,
    /// Every available iteration
    All,
    /// An explicit list of iterations
    List(Vec<u64>),
}

impl IterSelection {
    /// Resolve against the iterations available on disk (sorted ascending).
    /// The result is ascending and free of duplicates.
    pub fn resolve(&self, available: &[u64]) -> Result<Vec<u64>> {
        match self {
            IterSelection::None => Ok(Vec::new()),
            IterSelection::Last => Ok(available.last().copied().into_iter().collect()),
            IterSelection::All => Ok(available.to_vec()),
            IterSelection::List(wanted) => {
                if let Some(missing) = wanted.iter().find(|&w| !available.contains(w)) {
                    return Err(GcmError::DataNotFound {
                        message: format!("Iteration {} is not available", missing),
                    });
                }
                let mut selected = wanted.clone();
                selected.sort_unstable();
                selected.dedup();
                Ok(selected)
            }
        }
    }
}

impl FromStr for IterSelection {
    type Err = GcmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(IterSelection::None),
            "last" => Ok(IterSelection::Last),
            "all" => Ok(IterSelection::All),
            list => list
                .split(',')
                .map(|part| {
                    part.trim().parse::<u64>().map_err(|_| GcmError::InvalidParameter {
                        param: "iters".to_string(),
                        message: format!("'{}' is not an iteration number", part),
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(IterSelection::List),
        }
    }
}

/// Read one reduced container, choosing the reader from `method`
pub fn read_container(path: &Path, method: SaveMethod) -> Result<GcmDataset> {
    match method {
        #[cfg(feature = "netcdf")]
        SaveMethod::Nc => netcdf::read_dataset(path),
        #[cfg(not(feature = "netcdf"))]
        SaveMethod::Nc => Err(netcdf_disabled()),
        SaveMethod::Zarr => zarr::read_dataset(path),
    }
}

/// Write one reduced container, replacing what was there
pub fn write_container(ds: &GcmDataset, path: &Path, method: SaveMethod) -> Result<()> {
    match method {
        #[cfg(feature = "netcdf")]
        SaveMethod::Nc => netcdf::write_dataset(ds, path),
        #[cfg(not(feature = "netcdf"))]
        SaveMethod::Nc => Err(netcdf_disabled()),
        SaveMethod::Zarr => zarr::write_dataset(ds, path),
    }
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_disabled() -> GcmError {
    GcmError::Config {
        message: "gcmtools was built without NetCDF support".to_string(),
    }
}

/// Containers of the given format in `dir`, optionally for one tag only.
/// Returns `(tag, path)` pairs sorted by path.
pub fn find_containers(
    dir: &Path,
    method: SaveMethod,
    tag: Option<&str>,
) -> Result<Vec<(String, PathBuf)>> {
    let stem = tag.map_or_else(|| "*".to_string(), glob::Pattern::escape);
    let dir = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&dir).join(format!("{}.{}", stem, method.extension()));
    let pattern = pattern.to_string_lossy();

    let paths = glob::glob(&pattern).map_err(|e| GcmError::InvalidParameter {
        param: "dir".to_string(),
        message: e.to_string(),
    })?;

    let mut found = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| GcmError::Io(e.into()))?;
        let Some(tag) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        found.push((tag.to_string(), path.clone()));
    }
    found.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_method_parsing() {
        assert_eq!("nc".parse::<SaveMethod>().unwrap(), SaveMethod::Nc);
        assert_eq!(".zarr".parse::<SaveMethod>().unwrap(), SaveMethod::Zarr);
        assert!("h5".parse::<SaveMethod>().is_err());
        assert_eq!(
            SaveMethod::from_path(Path::new("/tmp/run1.zarr")).unwrap(),
            SaveMethod::Zarr
        );
        assert_eq!(
            SaveMethod::Nc.container_path(Path::new("out"), "run1"),
            PathBuf::from("out/run1.nc")
        );
    }

    #[test]
    fn test_gcm_kind() {
        assert_eq!("MITgcm".parse::<GcmKind>().unwrap(), GcmKind::MitGcm);
        assert!(matches!(
            "ExoRad".parse::<GcmKind>(),
            Err(GcmError::UnsupportedGcm { .. })
        ));
    }

    #[test]
    fn test_iter_selection() {
        let available = [10, 20, 30];
        assert_eq!("last".parse::<IterSelection>().unwrap(), IterSelection::Last);
        assert_eq!(IterSelection::Last.resolve(&available).unwrap(), vec![30]);
        assert_eq!(IterSelection::All.resolve(&available).unwrap(), vec![10, 20, 30]);
        assert!(IterSelection::None.resolve(&available).unwrap().is_empty());

        let list: IterSelection = "30, 10, 30".parse().unwrap();
        assert_eq!(list, IterSelection::List(vec![30, 10, 30]));
        assert_eq!(list.resolve(&available).unwrap(), vec![10, 30]);
        assert!(IterSelection::List(vec![40]).resolve(&available).is_err());
        assert!("ten".parse::<IterSelection>().is_err());
    }

    #[test]
    fn test_find_containers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.nc"), b"").unwrap();
        std::fs::write(dir.path().join("a.nc"), b"").unwrap();
        std::fs::write(dir.path().join("c.txt"), b"").unwrap();

        let found = find_containers(dir.path(), SaveMethod::Nc, None).unwrap();
        let tags: Vec<&str> = found.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);

        let one = find_containers(dir.path(), SaveMethod::Nc, Some("b")).unwrap();
        assert_eq!(one.len(), 1);
        assert!(find_containers(dir.path(), SaveMethod::Zarr, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_find_containers_with_glob_characters() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("runs[2024]");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("run[1].nc"), b"").unwrap();
        std::fs::write(dir.join("run1.nc"), b"").unwrap();
        std::fs::write(dir.join("run?.nc"), b"").unwrap();

        let one = find_containers(&dir, SaveMethod::Nc, Some("run[1]")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].0, "run[1]");

        let one = find_containers(&dir, SaveMethod::Nc, Some("run?")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].0, "run?");

        assert_eq!(find_containers(&dir, SaveMethod::Nc, None).unwrap().len(), 3);
    }
}
