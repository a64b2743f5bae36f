//! Reader for raw MITgcm output in MDS format.
//!
//! Every array is a `<name>.meta` text header next to a `<name>.data` binary
//! file of big-endian floats in Fortran order. Grid arrays (`XC`, `YC`,
//! `RC`, `RAC`) carry no iteration number; fields are written per iteration
//! as `<name>.<iter:010>.{meta,data}`. Run parameters come from the `data`
//! namelist.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ndarray::{Array1, Array2, ArrayD, Axis, IxDyn};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::dataset::{DataArray, GcmDataset};
use crate::error::{GcmError, Result};
use crate::io::IterSelection;
use crate::names;
use crate::units::SECONDS_PER_DAY;

/// Fields read for every selected iteration
const FIELDS: [&str; 4] = [names::T, names::U, names::V, names::W];

/// Run parameters that override whatever the namelist says
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReadOptions {
    /// Surface gravity in m/s^2
    pub gravity: Option<f64>,
    /// Planet radius in m
    pub radius: Option<f64>,
    /// Rotation period in days
    pub rotation_period: Option<f64>,
    /// Orbital period in days, defaults to the rotation period
    pub orbital_period: Option<f64>,
    /// Model time step in seconds
    pub dt: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    Float32,
    Float64,
}

impl Precision {
    fn bytes(self) -> usize {
        match self {
            Precision::Float32 => 4,
            Precision::Float64 => 8,
        }
    }
}

/// Parsed `.meta` header
#[derive(Debug, Clone, PartialEq)]
struct MdsMeta {
    /// Shape in C order (slowest axis first)
    shape: Vec<usize>,
    precision: Precision,
    records: usize,
}

fn meta_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\w+)\s*=\s*\[(.*?)\];").expect("valid regex"))
}

fn iteration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"T\.(\d{10})\.meta$").expect("valid regex"))
}

fn parse_meta(text: &str) -> Result<MdsMeta> {
    let mut dim_list: Option<Vec<usize>> = None;
    let mut precision = None;
    let mut records = 1;

    for cap in meta_regex().captures_iter(text) {
        let body = cap[2].trim();
        match &cap[1] {
            "dimList" => {
                let values = body
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<usize>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| GcmError::RawFormat {
                        message: format!("Bad dimList entry: {}", e),
                    })?;
                dim_list = Some(values);
            }
            "dataprec" => {
                precision = Some(match body.trim_matches(|c| c == '\'' || c == ' ') {
                    "float32" => Precision::Float32,
                    "float64" => Precision::Float64,
                    other => {
                        return Err(GcmError::RawFormat {
                            message: format!("Unsupported data precision '{}'", other),
                        })
                    }
                });
            }
            "nrecords" => {
                records = body.parse().map_err(|_| GcmError::RawFormat {
                    message: format!("Bad nrecords value '{}'", body),
                })?;
            }
            _ => {}
        }
    }

    let dim_list = dim_list.ok_or_else(|| GcmError::RawFormat {
        message: "Missing dimList".to_string(),
    })?;
    if dim_list.is_empty() || dim_list.len() % 3 != 0 {
        return Err(GcmError::RawFormat {
            message: format!("dimList must hold triples, got {} values", dim_list.len()),
        });
    }

    // Each triple is (global size, start, end); the file holds end - start + 1.
    let mut shape: Vec<usize> = dim_list
        .chunks_exact(3)
        .map(|t| t[2].saturating_sub(t[1]) + 1)
        .collect();
    shape.reverse();

    Ok(MdsMeta {
        shape,
        precision: precision.ok_or_else(|| GcmError::RawFormat {
            message: "Missing dataprec".to_string(),
        })?,
        records,
    })
}

/// Read the first record of `<stem>.meta` / `<stem>.data` in C order
fn read_mds(dir: &Path, stem: &str) -> Result<ArrayD<f64>> {
    let meta_path = dir.join(format!("{}.meta", stem));
    let data_path = dir.join(format!("{}.data", stem));
    if !meta_path.is_file() || !data_path.is_file() {
        return Err(GcmError::DataNotFound {
            message: format!("MDS files for {} not found in {}", stem, dir.display()),
        });
    }

    let meta = parse_meta(&std::fs::read_to_string(&meta_path)?)?;
    let bytes = std::fs::read(&data_path)?;

    let count: usize = meta.shape.iter().product();
    let needed = count * meta.precision.bytes();
    if bytes.len() < needed {
        return Err(GcmError::RawFormat {
            message: format!(
                "{} holds {} bytes, expected at least {}",
                data_path.display(),
                bytes.len(),
                needed
            ),
        });
    }
    if meta.records > 1 {
        debug!("{} has {} records, reading the first", stem, meta.records);
    }

    let values: Vec<f64> = match meta.precision {
        Precision::Float32 => bytes[..needed]
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        Precision::Float64 => bytes[..needed]
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    };

    Ok(ArrayD::from_shape_vec(IxDyn(&meta.shape), values)?)
}

/// Read a 2-D horizontal grid array as (lat, lon)
fn read_horizontal(dir: &Path, stem: &str) -> Result<Array2<f64>> {
    let values = read_mds(dir, stem)?;
    let shape = values.shape().to_vec();
    let (ny, nx) = match shape.as_slice() {
        [ny, nx] => (*ny, *nx),
        [1, ny, nx] => (*ny, *nx),
        other => {
            return Err(GcmError::RawFormat {
                message: format!("{} should be horizontal, got shape {:?}", stem, other),
            })
        }
    };
    Ok(values.into_shape((ny, nx))?)
}

/// Iterations for which a temperature snapshot exists, ascending
pub fn available_iterations(dir: &Path) -> Result<Vec<u64>> {
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("T.*.meta");
    let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| GcmError::InvalidParameter {
        param: "data_path".to_string(),
        message: e.to_string(),
    })?;

    let mut iters = Vec::new();
    for entry in entries {
        let path: PathBuf = entry.map_err(|e| GcmError::Io(e.into()))?;
        let name = path.to_string_lossy();
        if let Some(cap) = iteration_regex().captures(&name) {
            if let Ok(iter) = cap[1].parse::<u64>() {
                iters.push(iter);
            }
        }
    }
    iters.sort_unstable();
    Ok(iters)
}

/// Run parameters found in the `data` namelist
#[derive(Debug, Clone, Default, PartialEq)]
struct Namelist {
    delta_t: Option<f64>,
    gravity: Option<f64>,
    r_sphere: Option<f64>,
    rotation_period: Option<f64>,
}

fn namelist_value(text: &str, key: &str) -> Option<f64> {
    let re = Regex::new(&format!(r"(?im)^\s*{}\s*=\s*([-+0-9.eEdD]+)", key)).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str().replace(['d', 'D'], "e");
    raw.trim_end_matches(',').parse().ok()
}

fn read_namelist(dir: &Path) -> Result<Namelist> {
    let path = dir.join("data");
    if !path.is_file() {
        warn!("No 'data' namelist in {}", dir.display());
        return Ok(Namelist::default());
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(Namelist {
        delta_t: namelist_value(&text, "deltaT"),
        gravity: namelist_value(&text, "gravity"),
        r_sphere: namelist_value(&text, "rSphere"),
        rotation_period: namelist_value(&text, "rotationPeriod"),
    })
}

/// Move a C-grid field onto cell centres along `axis`.
/// Zonal faces are periodic; the last meridional face is the closed pole.
fn to_cell_centres(values: &ArrayD<f64>, axis: Axis, periodic: bool) -> ArrayD<f64> {
    let n = values.len_of(axis);
    let mut out = values.clone();
    for i in 0..n {
        let here = values.index_axis(axis, i);
        let centred = if i + 1 < n {
            (&here + &values.index_axis(axis, i + 1)) * 0.5
        } else if periodic {
            (&here + &values.index_axis(axis, 0)) * 0.5
        } else {
            &here * 0.5
        };
        out.index_axis_mut(axis, i).assign(&centred);
    }
    out
}

/// Read a raw MITgcm run into a dataset in its native units (Pa, iter)
pub fn read_dataset(
    dir: &Path,
    iters: &IterSelection,
    options: &RawReadOptions,
) -> Result<GcmDataset> {
    if !dir.is_dir() {
        return Err(GcmError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", dir.display()),
        )));
    }

    let xc = read_horizontal(dir, "XC")?;
    let yc = read_horizontal(dir, "YC")?;
    let rac = read_horizontal(dir, "RAC")?;
    let rc = read_mds(dir, "RC")?;

    let lon: Array1<f64> = xc.row(0).to_owned();
    let lat: Array1<f64> = yc.column(0).to_owned();
    let z = Array1::from_iter(rc.iter().copied());

    let mut ds = GcmDataset::new();
    ds.add_coordinate(names::LON, lon);
    ds.add_coordinate(names::LAT, lat);
    ds.add_coordinate(names::Z, z.clone());
    ds.add_variable(
        names::AREA_C,
        DataArray::new(&[names::LAT, names::LON], rac.into_dyn())?.with_attribute("units", "m^2"),
    )?;

    let selected = iters.resolve(&available_iterations(dir)?)?;
    info!(
        "Reading {} iteration(s) of MITgcm output from {}",
        selected.len(),
        dir.display()
    );

    let (ny, nx) = (ds.dim_size(names::LAT), ds.dim_size(names::LON));
    let shape = [z.len(), ny.unwrap_or(0), nx.unwrap_or(0)];

    if !selected.is_empty() {
        ds.add_coordinate(
            names::TIME,
            Array1::from_iter(selected.iter().map(|&i| i as f64)),
        );
        for name in FIELDS {
            let mut steps = Vec::with_capacity(selected.len());
            for iter in &selected {
                let stem = format!("{}.{:010}", name, iter);
                let mut values = read_mds(dir, &stem)?;
                if values.shape() != shape {
                    return Err(GcmError::Shape {
                        message: format!(
                            "{} has shape {:?}, grid is {:?}",
                            stem,
                            values.shape(),
                            shape
                        ),
                    });
                }
                match name {
                    names::U => values = to_cell_centres(&values, Axis(2), true),
                    names::V => values = to_cell_centres(&values, Axis(1), false),
                    _ => {}
                }
                steps.push(values.insert_axis(Axis(0)));
            }
            let views: Vec<_> = steps.iter().map(|s| s.view()).collect();
            let stacked = ndarray::concatenate(Axis(0), &views)?;
            ds.add_variable(
                name,
                DataArray::new(&[names::TIME, names::Z, names::LAT, names::LON], stacked)?,
            )?;
        }
    } else {
        ds.add_coordinate(names::TIME, Array1::from_vec(Vec::new()));
    }

    let namelist = read_namelist(dir)?;
    let gravity = options.gravity.or(namelist.gravity);
    let radius = options.radius.or(namelist.r_sphere);
    let rotation = options
        .rotation_period
        .or(namelist.rotation_period.map(|s| s / SECONDS_PER_DAY));
    let orbit = options.orbital_period.or(rotation);
    let dt = options.dt.or(namelist.delta_t);

    for (key, value) in [
        (names::GRAVITY, gravity),
        (names::R_P, radius),
        (names::P_ROT, rotation),
        (names::P_ORB, orbit),
        (names::DT, dt),
    ] {
        match value {
            Some(v) => ds.set_attribute(key, v),
            None => warn!("Run parameter {} is unknown", key),
        }
    }
    ds.set_attribute(names::P_UNIT, "Pa");
    ds.set_attribute(names::TIME_UNIT, "iter");

    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    const NX: usize = 4;
    const NY: usize = 3;
    const NR: usize = 2;

    /// Write an MDS pair with `dims` in Fortran order
    fn write_mds(dir: &Path, stem: &str, dims: &[usize], values: &[f32]) {
        let dim_list: Vec<String> = dims.iter().map(|d| format!("{:5},{:5},{:5}", d, 1, d)).collect();
        let meta = format!(
            " nDims = [ {} ];\n dimList = [\n{}\n ];\n dataprec = [ 'float32' ];\n nrecords = [ 1 ];\n",
            dims.len(),
            dim_list.join(",\n")
        );
        std::fs::write(dir.join(format!("{}.meta", stem)), meta).unwrap();
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        std::fs::write(dir.join(format!("{}.data", stem)), bytes).unwrap();
    }

    fn write_run(dir: &Path, iters: &[u64]) {
        // Fortran order: x fastest, so C order rows are y
        let xc: Vec<f32> = (0..NY).flat_map(|_| (0..NX).map(|i| i as f32 * 90.0)).collect();
        let yc: Vec<f32> = (0..NY).flat_map(|j| (0..NX).map(move |_| -60.0 + j as f32 * 60.0)).collect();
        let rac: Vec<f32> = vec![2.0; NX * NY];
        write_mds(dir, "XC", &[NX, NY], &xc);
        write_mds(dir, "YC", &[NX, NY], &yc);
        write_mds(dir, "RAC", &[NX, NY], &rac);
        write_mds(dir, "RC", &[1, 1, NR], &[1.0e5, 1.0e4]);

        for &iter in iters {
            let n = NX * NY * NR;
            let t: Vec<f32> = (0..n).map(|k| 1000.0 + k as f32 + iter as f32).collect();
            let u: Vec<f32> = (0..n).map(|k| (k % NX) as f32).collect();
            let v: Vec<f32> = vec![2.0; n];
            let w: Vec<f32> = vec![0.0; n];
            for (name, values) in [("T", &t), ("U", &u), ("V", &v), ("W", &w)] {
                write_mds(dir, &format!("{}.{:010}", name, iter), &[NX, NY, NR], values);
            }
        }

        std::fs::write(
            dir.join("data"),
            " &PARM01\n gravity=9.81,\n rSphere=6.4D6,\n rotationPeriod=86400.,\n &\n &PARM03\n deltaT=25.,\n &\n",
        )
        .unwrap();
    }

    #[test]
    fn test_parse_meta() {
        let meta = parse_meta(
            " nDims = [   3 ];\n dimList = [\n   128,    1,  128,\n    64,    1,   64,\n    20,    1,   20\n ];\n dataprec = [ 'float64' ];\n nrecords = [     5 ];\n",
        )
        .unwrap();
        assert_eq!(meta.shape, vec![20, 64, 128]);
        assert_eq!(meta.precision, Precision::Float64);
        assert_eq!(meta.records, 5);

        assert!(parse_meta(" dataprec = [ 'float32' ];").is_err());
        assert!(parse_meta(" dimList = [ 1, 1, 1 ];\n dataprec = [ 'int8' ];").is_err());
    }

    #[test]
    fn test_namelist_value() {
        let text = " gravity=24.79,\n rSphere = 6.9911D7,\n deltaTClock=1.,\n deltaT = 25.,\n";
        assert_eq!(namelist_value(text, "gravity"), Some(24.79));
        assert_eq!(namelist_value(text, "rSphere"), Some(6.9911e7));
        assert_eq!(namelist_value(text, "deltaT"), Some(25.0));
        assert_eq!(namelist_value(text, "rotationPeriod"), None);
    }

    #[test]
    fn test_read_last_iteration() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), &[100, 200]);

        assert_eq!(available_iterations(dir.path()).unwrap(), vec![100, 200]);

        let ds = read_dataset(dir.path(), &IterSelection::Last, &RawReadOptions::default()).unwrap();
        assert_eq!(ds.coordinate(names::TIME).unwrap().to_vec(), vec![200.0]);
        assert_eq!(ds.coordinate(names::LON).unwrap().to_vec(), vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(ds.coordinate(names::LAT).unwrap().to_vec(), vec![-60.0, 0.0, 60.0]);
        assert_eq!(ds.coordinate(names::Z).unwrap().to_vec(), vec![1.0e5, 1.0e4]);

        let t = ds.variable(names::T).unwrap();
        assert_eq!(t.shape(), &[1, NR, NY, NX]);
        assert_eq!(t.values[[0, 0, 0, 1]], 1201.0);
        assert_eq!(t.values[[0, 1, 0, 0]], 1200.0 + (NX * NY) as f64);

        // U centred periodically in x: (3 + 0) / 2 at the last column
        let u = ds.variable(names::U).unwrap();
        assert_eq!(u.values[[0, 0, 0, 0]], 0.5);
        assert_eq!(u.values[[0, 0, 0, NX - 1]], 1.5);

        // V halved at the northern edge
        let v = ds.variable(names::V).unwrap();
        assert_eq!(v.values[[0, 0, 0, 0]], 2.0);
        assert_eq!(v.values[[0, 0, NY - 1, 0]], 1.0);

        assert_eq!(ds.text_attribute(names::P_UNIT), Some("Pa"));
        assert_eq!(ds.text_attribute(names::TIME_UNIT), Some("iter"));
        assert_abs_diff_eq!(ds.number_attribute(names::R_P).unwrap(), 6.4e6);
        assert_abs_diff_eq!(ds.number_attribute(names::P_ROT).unwrap(), 1.0);
        assert_abs_diff_eq!(ds.number_attribute(names::P_ORB).unwrap(), 1.0);
        assert_abs_diff_eq!(ds.number_attribute(names::DT).unwrap(), 25.0);
    }

    #[test]
    fn test_run_directory_with_glob_characters() {
        let root = tempdir().unwrap();
        let dir = root.path().join("run[a]");
        std::fs::create_dir(&dir).unwrap();
        write_run(&dir, &[5, 7]);

        assert_eq!(available_iterations(&dir).unwrap(), vec![5, 7]);
        let ds = read_dataset(&dir, &IterSelection::All, &RawReadOptions::default()).unwrap();
        assert_eq!(ds.coordinate(names::TIME).unwrap().to_vec(), vec![5.0, 7.0]);
    }

    #[test]
    fn test_options_override_namelist() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), &[100]);
        let options = RawReadOptions {
            gravity: Some(24.79),
            orbital_period: Some(3.0),
            ..Default::default()
        };
        let ds = read_dataset(dir.path(), &IterSelection::All, &options).unwrap();
        assert_eq!(ds.number_attribute(names::GRAVITY), Some(24.79));
        assert_eq!(ds.number_attribute(names::P_ORB), Some(3.0));
    }

    #[test]
    fn test_grid_only_and_missing_iteration() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), &[100]);

        let ds = read_dataset(dir.path(), &IterSelection::None, &RawReadOptions::default()).unwrap();
        assert!(!ds.has_variable(names::T));
        assert!(ds.has_variable(names::AREA_C));

        assert!(read_dataset(
            dir.path(),
            &IterSelection::List(vec![300]),
            &RawReadOptions::default()
        )
        .is_err());
    }
}
