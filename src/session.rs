//! The user-facing session: a dataset registry with fixed units.
//!
//! [`GcmTools`] owns a [`GcmDatasetCollection`] and routes reductions, I/O
//! and plotting through it. The pressure and time units are chosen once at
//! construction; every stored dataset carries exactly those units.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::collection::{validate_tag, GcmDatasetCollection, Selection};
use crate::config::Config;
use crate::dataset::{DataArray, GcmDataset};
use crate::error::{GcmError, Result};
use crate::io::{self, mitgcm, GcmKind, IterSelection, RawReadOptions, SaveMethod};
use crate::logging::{
    log_data_load_stats, log_error, log_operation_end, log_operation_start, log_timed_operation,
    write_banner, write_status, Status,
};
use crate::manipulations;
use crate::names;
use crate::passport;
use crate::plotting::{self, PlotOptions};
use crate::units::{self, PressureUnit, TimeUnit};

/// A GCMtools session
#[derive(Debug, Clone)]
pub struct GcmTools {
    config: Config,
    p_unit: PressureUnit,
    time_unit: TimeUnit,
    models: GcmDatasetCollection,
}

impl GcmTools {
    /// Set up a session. Units outside the allowed sets are a configuration
    /// error.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let p_unit = config.pressure_unit()?;
        let time_unit = config.time_unit()?;

        write_banner("Welcome to GCMtools");
        write_status(Status::Stat, "Set up GCMtools");
        write_status(Status::Info, &format!("pressure units: {}", p_unit));
        write_status(Status::Info, &format!("time units: {}", time_unit));

        Ok(Self {
            config,
            p_unit,
            time_unit,
            models: GcmDatasetCollection::new(),
        })
    }

    /// Session with default settings apart from the units
    pub fn with_units(p_unit: &str, time_unit: &str) -> Result<Self> {
        let mut config = Config::default();
        config.units.p_unit = p_unit.to_string();
        config.units.time_unit = time_unit.to_string();
        Self::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pressure_unit(&self) -> PressureUnit {
        self.p_unit
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn collection(&self) -> &GcmDatasetCollection {
        &self.models
    }

    // ------------------------------------------------------------------
    // Data handling
    // ------------------------------------------------------------------

    /// Add or replace the dataset under `tag`.
    ///
    /// Checks run in order: tag, array consistency, schema, units. Schema gaps are only logged
    /// unless `data.strict_schema` is set. Nothing is stored if a check
    /// fails.
    pub fn insert(&mut self, tag: &str, ds: GcmDataset) -> Result<()> {
        validate_tag(tag)?;
        ds.validate()?;

        // logs every gap; only strict mode rejects
        passport::is_the_data_basic(&ds);
        if self.config.data.strict_schema {
            let report = passport::check_basic(&ds);
            if !report.is_complete() {
                return Err(GcmError::SchemaViolation {
                    tag: tag.to_string(),
                    missing: report.summary(),
                });
            }
        }

        self.check_unit(&ds, names::P_UNIT, "pressure", self.p_unit.as_str())?;
        self.check_unit(&ds, names::TIME_UNIT, "time", self.time_unit.as_str())?;

        self.models.insert(tag, ds)
    }

    fn check_unit(&self, ds: &GcmDataset, key: &str, quantity: &str, expected: &str) -> Result<()> {
        match ds.text_attribute(key) {
            Some(found) if found == expected => Ok(()),
            found => Err(GcmError::UnitConversionNotImplemented {
                quantity: quantity.to_string(),
                found: found.unwrap_or("<missing>").to_string(),
                expected: expected.to_string(),
            }),
        }
    }

    /// Dataset under `tag`, or `None` when the tag is unknown
    pub fn get(&self, tag: &str) -> Option<&GcmDataset> {
        self.models.get(tag)
    }

    /// Exactly one dataset: the tagged one, or the only one stored
    pub fn get_one_model(&self, tag: Option<&str>) -> Result<&GcmDataset> {
        self.models.select(tag)
    }

    pub fn get_one_model_mut(&mut self, tag: Option<&str>) -> Result<&mut GcmDataset> {
        self.models.select_mut(tag)
    }

    /// One dataset or the whole collection, see
    /// [`GcmDatasetCollection::select_all`]
    pub fn get_models(&self, tag: Option<&str>, always_collection: bool) -> Result<Selection<'_>> {
        self.models.select_all(tag, always_collection)
    }

    /// `(tag, dataset)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GcmDataset)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Insert under `tag`, or under the current number of datasets when no
    /// tag is given. Returns the tag used.
    pub fn store_with_tag(&mut self, ds: GcmDataset, tag: Option<&str>) -> Result<String> {
        let tag = match tag {
            Some(tag) => tag.to_string(),
            None => {
                let tag = self.models.len().to_string();
                write_status(
                    Status::Warn,
                    &format!("No tag provided. This model is stored with tag: {}", tag),
                );
                tag
            }
        };
        self.insert(&tag, ds)?;
        Ok(tag)
    }

    /// Bring a dataset from `p_unit_in` / `time_unit_in` to the session units
    fn convert_units(
        &self,
        ds: &mut GcmDataset,
        p_unit_in: PressureUnit,
        time_unit_in: TimeUnit,
    ) -> Result<()> {
        units::convert_time(ds, time_unit_in, self.time_unit)?;
        units::convert_pressure(ds, p_unit_in, self.p_unit)
    }

    // ------------------------------------------------------------------
    // Data manipulation
    // ------------------------------------------------------------------

    /// Area-weighted horizontal average of `var`. With `out` the result is
    /// also stored in the dataset under that name.
    pub fn add_horizontal_average(
        &mut self,
        var: &str,
        out: Option<&str>,
        area_key: Option<&str>,
        tag: Option<&str>,
    ) -> Result<DataArray> {
        let area_key = area_key.unwrap_or(&self.config.data.area_key).to_string();
        write_status(Status::Stat, "Calculate horizontal average");
        write_status(Status::Info, &format!("Variable to be averaged: {}", var));
        write_status(Status::Info, &format!("Area variable: {}", area_key));
        match out {
            Some(out) => write_status(Status::Info, &format!("Output variable: {}", out)),
            None => write_status(Status::Info, "Output variable: not stored"),
        }

        let avg = manipulations::horizontal_average(self.models.select(tag)?, var, &area_key)?;
        if let Some(out) = out {
            self.models.select_mut(tag)?.add_variable(out, avg.clone())?;
        }
        Ok(avg)
    }

    /// Meridional overturning streamfunction of `v` (defaults to `V`). With
    /// `out` the result is also stored in the dataset under that name.
    pub fn add_meridional_overturning(
        &mut self,
        v: Option<&str>,
        out: Option<&str>,
        tag: Option<&str>,
    ) -> Result<DataArray> {
        let v = v.unwrap_or(names::V);
        write_status(Status::Stat, "Calculate meridional overturning streamfunction");
        write_status(Status::Info, &format!("Meridional wind variable: {}", v));
        match out {
            Some(out) => write_status(Status::Info, &format!("Output variable: {}", out)),
            None => write_status(Status::Info, "Output variable: not stored"),
        }

        let psi = manipulations::meridional_overturning(self.models.select(tag)?, v)?;
        if let Some(out) = out {
            self.models.select_mut(tag)?.add_variable(out, psi.clone())?;
        }
        Ok(psi)
    }

    // ------------------------------------------------------------------
    // Reading and writing
    // ------------------------------------------------------------------

    /// Read raw GCM output and store it. With `load_existing` the new time
    /// steps are merged into the dataset already stored under `tag`.
    pub fn read_raw(
        &mut self,
        gcm: &str,
        data_path: &Path,
        iters: &IterSelection,
        load_existing: bool,
        tag: Option<&str>,
        options: &RawReadOptions,
    ) -> Result<String> {
        let start = Instant::now();
        let kind: GcmKind = gcm.parse().map_err(|e| {
            write_status(
                Status::Error,
                &format!("The selected GCM type \"{}\" is not supported", gcm),
            );
            e
        })?;

        write_status(Status::Stat, &format!("Read in raw {} data", kind));
        write_status(Status::Info, &format!("Tag: {}", tag.unwrap_or("<none>")));
        write_status(Status::Info, &format!("File path: {}", data_path.display()));
        log_operation_start("read_raw", Some(&data_path.to_string_lossy()));

        let mut ds = match kind {
            GcmKind::MitGcm => mitgcm::read_dataset(data_path, iters, options).map_err(|e| {
                log_error(&e, "read_raw");
                log_operation_end("read_raw", start, false);
                e
            })?,
        };
        self.convert_units(&mut ds, PressureUnit::Pa, TimeUnit::Iter)?;

        if load_existing {
            if let Some(existing) = tag.and_then(|t| self.models.get(t)) {
                let mut merged = existing.clone();
                let added = merged.merge_along_time(&ds)?;
                for (name, value) in &ds.attributes {
                    merged.attributes.insert(name.clone(), value.clone());
                }
                write_status(
                    Status::Info,
                    &format!("Appended {} new time step(s) to the loaded data", added),
                );
                ds = merged;
            }
        }

        let tag = self.store_with_tag(ds, tag)?;
        self.log_stored(&tag, &data_path.to_string_lossy());
        log_operation_end("read_raw", start, true);
        Ok(tag)
    }

    /// Read one saved container whose units are `p_unit_in` / `time_unit_in`
    pub fn read_reduced(
        &mut self,
        data_path: &Path,
        tag: Option<&str>,
        time_unit_in: TimeUnit,
        p_unit_in: PressureUnit,
    ) -> Result<String> {
        write_status(Status::Stat, "Read in reduced data");
        write_status(Status::Info, &format!("File path: {}", data_path.display()));
        write_status(Status::Info, &format!("Tag: {}", tag.unwrap_or("<none>")));
        write_status(Status::Info, &format!("Time unit of data: {}", time_unit_in));
        write_status(Status::Info, &format!("pressure unit of data: {}", p_unit_in));

        let method = SaveMethod::from_path(data_path)?;
        let mut ds = io::read_container(data_path, method)?;
        self.convert_units(&mut ds, p_unit_in, time_unit_in)?;

        let tag = self.store_with_tag(ds, tag)?;
        self.log_stored(&tag, &data_path.to_string_lossy());
        Ok(tag)
    }

    /// Save every dataset (or only `tag`) to `dir/<tag>.<method>`.
    /// Returns the written paths.
    pub fn save(
        &self,
        dir: &Path,
        method: SaveMethod,
        update_along_time: bool,
        tag: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        write_status(Status::Stat, "Save current GCMs within GCMtools");
        write_status(Status::Info, &format!("File path: {}", dir.display()));
        match tag {
            Some(tag) => write_status(Status::Info, &format!("Tag: {}", tag)),
            None => write_status(Status::Info, "Tag: All tags were stored"),
        }
        write_status(Status::Info, &format!("method: {}", method));
        write_status(Status::Info, &format!("Update old data?: {}", update_along_time));

        if update_along_time && method != SaveMethod::Zarr {
            return Err(GcmError::InvalidParameter {
                param: "update_along_time".to_string(),
                message: "Updating along time only works with zarr".to_string(),
            });
        }
        if let Some(tag) = tag {
            if !self.models.contains(tag) {
                return Err(GcmError::NotFound {
                    tag: tag.to_string(),
                });
            }
        }

        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (key, model) in self.models.iter() {
            if tag.is_some_and(|t| t != key) {
                continue;
            }
            let path = method.container_path(dir, key);
            if update_along_time && path.is_dir() {
                let added = io::zarr::append_along_time(model, &path)?;
                write_status(
                    Status::Info,
                    &format!("{}: appended {} new time step(s)", key, added),
                );
            } else {
                io::write_container(model, &path, method)?;
            }
            debug!("Saved {} to {}", key, path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Load saved datasets from `dir`, converting their stored units to the
    /// session units. Returns the loaded tags.
    pub fn load(
        &mut self,
        dir: &Path,
        method: SaveMethod,
        tag: Option<&str>,
    ) -> Result<Vec<String>> {
        write_status(Status::Stat, "Load saved GCMs to GCMtools");
        write_status(Status::Info, &format!("File path: {}", dir.display()));
        match tag {
            Some(tag) => write_status(Status::Info, &format!("Tag: {}", tag)),
            None => write_status(Status::Info, "Tag: All stored tags are loaded"),
        }
        write_status(Status::Info, &format!("method: {}", method));

        let available = io::find_containers(dir, method, tag)?;
        if available.is_empty() {
            write_status(
                Status::Info,
                &format!("No data available to load for method {}", method),
            );
        }

        let mut loaded = Vec::with_capacity(available.len());
        for (file_tag, path) in available {
            let mut ds =
                log_timed_operation("read_container", || io::read_container(&path, method))?;
            let time_unit_in = self.stored_unit(&ds, names::TIME_UNIT, self.time_unit)?;
            let p_unit_in = self.stored_unit(&ds, names::P_UNIT, self.p_unit)?;
            self.convert_units(&mut ds, p_unit_in, time_unit_in)?;
            self.insert(&file_tag, ds)?;
            self.log_stored(&file_tag, &path.to_string_lossy());
            loaded.push(file_tag);
        }
        Ok(loaded)
    }

    /// Unit recorded in a saved dataset; the session unit when absent
    fn stored_unit<U>(&self, ds: &GcmDataset, key: &str, session: U) -> Result<U>
    where
        U: std::str::FromStr<Err = GcmError> + std::fmt::Display,
    {
        match ds.text_attribute(key) {
            Some(unit) => unit.parse(),
            None => {
                warn!(
                    "Dataset {} has no '{}' attribute, assuming {}",
                    ds.tag().unwrap_or("<untagged>"),
                    key,
                    session
                );
                Ok(session)
            }
        }
    }

    fn log_stored(&self, tag: &str, source: &str) {
        let Some(ds) = self.models.get(tag) else {
            return;
        };
        let var_names: Vec<&str> = ds.variables.keys().map(|k| k.as_str()).collect();
        let dim_details = ds
            .coordinates
            .iter()
            .map(|(name, c)| format!("{}={}", name, c.len()))
            .collect::<Vec<_>>()
            .join(", ");
        log_data_load_stats(
            tag,
            source,
            &var_names,
            &dim_details,
            ds.dim_size(names::TIME).unwrap_or(0),
        );
    }

    // ------------------------------------------------------------------
    // Plotting
    // ------------------------------------------------------------------

    /// Plot options seeded from the session configuration
    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions {
            width: self.config.plot.width,
            height: self.config.plot.height,
            colormap: self.config.plot.colormap.clone(),
            ..Default::default()
        }
    }

    /// Horizontal map of `var` on the level nearest `p` (session units)
    pub fn isobaric_slice(
        &self,
        var: &str,
        p: f64,
        tag: Option<&str>,
        options: &PlotOptions,
    ) -> Result<RgbaImage> {
        write_status(
            Status::Stat,
            &format!("Isobaric slice of {} at p = {} {}", var, p, self.p_unit),
        );
        plotting::isobaric_slice(self.models.select(tag)?, var, p, options)
    }

    /// Profiles over time of a (time, Z) field
    pub fn time_evol(
        &self,
        var: &str,
        tag: Option<&str>,
        options: &PlotOptions,
    ) -> Result<RgbaImage> {
        write_status(Status::Stat, &format!("Time evolution of {}", var));
        plotting::time_evol(self.models.select(tag)?, var, options)
    }

    /// Zonal mean section of `var`
    pub fn zonal_mean(
        &self,
        var: &str,
        tag: Option<&str>,
        options: &PlotOptions,
    ) -> Result<RgbaImage> {
        write_status(Status::Stat, &format!("Zonal mean of {}", var));
        plotting::zonal_mean(self.models.select(tag)?, var, options)
    }
}

impl<'a> IntoIterator for &'a GcmTools {
    type Item = (&'a str, &'a GcmDataset);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a GcmDataset)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.models.iter())
    }
}
