//! Configuration management for gcmtools.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)
//!
//! The session units are fixed once a [`crate::GcmTools`] is built from a
//! validated `Config`.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GcmError, Result};
use crate::io::SaveMethod;
use crate::units::{PressureUnit, TimeUnit};

/// Command-line arguments for gcmt
#[derive(Parser, Debug)]
#[command(name = "gcmt")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pressure unit used inside the session (bar or Pa)
    #[arg(short = 'p', long, env = "GCMT_P_UNIT")]
    pub p_unit: Option<String>,

    /// Time unit used inside the session (day or iter)
    #[arg(short = 't', long, env = "GCMT_TIME_UNIT")]
    pub time_unit: Option<String>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "GCMT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GCMT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Reject datasets that are not basic GCM datasets instead of only logging
    #[arg(long)]
    pub strict_schema: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Kind of plot to render
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// Horizontal slice at a pressure level
    Isobaric,
    /// Profiles over time
    TimeEvol,
    /// Zonal mean over latitude and pressure
    ZonalMean,
}

/// gcmt subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the datasets saved in a directory and check their schema
    Info {
        /// Directory with saved datasets
        dir: PathBuf,
        /// Container format (nc or zarr)
        #[arg(long)]
        method: Option<String>,
        /// Only inspect this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Read raw GCM output and save it in the reduced format
    Convert {
        /// GCM family of the raw output (MITgcm)
        gcm: String,
        /// Directory with the raw output
        data_path: PathBuf,
        /// Directory to save to
        out_dir: PathBuf,
        /// Iterations to read: none, last, all or a comma separated list
        #[arg(long, default_value = "last")]
        iters: String,
        /// Tag of the simulation
        #[arg(long)]
        tag: Option<String>,
        /// Container format (nc or zarr)
        #[arg(long)]
        method: Option<String>,
        /// Append new time steps to an existing zarr store
        #[arg(long)]
        update_along_time: bool,
    },
    /// Horizontal, area weighted average of a variable
    Average {
        /// Directory with saved datasets
        dir: PathBuf,
        /// Variable to average
        var: String,
        /// Store the result under this name and save the dataset back
        #[arg(long)]
        out: Option<String>,
        /// Grid cell area variable
        #[arg(long)]
        area_key: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
    /// Meridional overturning streamfunction
    Overturning {
        /// Directory with saved datasets
        dir: PathBuf,
        /// Meridional wind variable
        #[arg(long, default_value = "V")]
        var: String,
        /// Store the result under this name and save the dataset back
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
    /// Render a plot to a PNG file
    Plot {
        /// Directory with saved datasets
        dir: PathBuf,
        #[arg(value_enum)]
        kind: PlotKind,
        /// Variable to plot
        var: String,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
        /// Pressure level for isobaric slices, in session units
        #[arg(long)]
        pressure: Option<f64>,
        /// Time index (defaults to the last step)
        #[arg(long)]
        time_index: Option<usize>,
        #[arg(long)]
        colormap: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
}

/// Unit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Pressure unit used inside the session
    #[serde(default = "default_p_unit")]
    pub p_unit: String,

    /// Time unit used inside the session
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
}

/// Data handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Container format used by save/load when none is given
    #[serde(default = "default_save_method")]
    pub save_method: String,

    /// Variable holding the grid cell areas
    #[serde(default = "default_area_key")]
    pub area_key: String,

    /// Reject incomplete datasets on insert
    #[serde(default)]
    pub strict_schema: bool,
}

/// Plot defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Colormap for every plot; each plot kind has its own default when unset
    #[serde(default)]
    pub colormap: Option<String>,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub units: UnitConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub plot: PlotConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        let args = Args::parse();

        let mut config = Config::default();

        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        if let Some(p_unit) = args.p_unit {
            config.units.p_unit = p_unit;
        }
        if let Some(time_unit) = args.time_unit {
            config.units.time_unit = time_unit;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }
        if args.strict_schema {
            config.data.strict_schema = true;
        }

        Ok((config, args.command))
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.units = other.units;
        self.data = other.data;
        self.plot = other.plot;
        self.log_level = other.log_level;
    }

    pub fn pressure_unit(&self) -> Result<PressureUnit> {
        self.units.p_unit.parse()
    }

    pub fn time_unit(&self) -> Result<TimeUnit> {
        self.units.time_unit.parse()
    }

    pub fn save_method(&self) -> Result<SaveMethod> {
        self.data.save_method.parse()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.pressure_unit()?;
        self.time_unit()?;
        self.save_method()?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(GcmError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.data.area_key.is_empty() {
            return Err(GcmError::Config {
                message: "Area variable name cannot be empty".to_string(),
            });
        }

        if self.plot.width < 2 || self.plot.height < 2 {
            return Err(GcmError::Config {
                message: format!(
                    "Plot size must be at least 2x2 pixels, got {}x{}",
                    self.plot.width, self.plot.height
                ),
            });
        }

        if let Some(name) = &self.plot.colormap {
            crate::colormaps::get_colormap(name).map_err(|_| GcmError::Config {
                message: format!("Unknown colormap: {}", name),
            })?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            units: UnitConfig::default(),
            data: DataConfig::default(),
            plot: PlotConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            p_unit: default_p_unit(),
            time_unit: default_time_unit(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            save_method: default_save_method(),
            area_key: default_area_key(),
            strict_schema: false,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            colormap: None,
        }
    }
}

// Default value functions for serde
fn default_p_unit() -> String {
    "bar".to_string()
}

fn default_time_unit() -> String {
    "day".to_string()
}

fn default_save_method() -> String {
    "nc".to_string()
}

fn default_area_key() -> String {
    crate::names::AREA_C.to_string()
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}
