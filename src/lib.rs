//! # gcmtools
//!
//! Load, tag, validate, reduce and plot 3D general circulation model (GCM)
//! output.
//!
//! A [`GcmTools`] session keeps an in-memory collection of simulation runs,
//! each a [`GcmDataset`] keyed by a tag. Datasets entering the session are
//! checked against the basic GCM schema and must carry the session's
//! pressure and time units.
//!
//! ## Key Features
//!
//! - **Registry**: tag-keyed collection with single/all selection semantics
//! - **Schema checks**: is this a basic GCM dataset, does it carry clouds
//! - **Reductions**: area-weighted horizontal average, meridional
//!   overturning streamfunction
//! - **I/O**: raw MITgcm output, reduced datasets in NetCDF or Zarr
//! - **Plots**: isobaric slices, zonal means and time evolution as PNG

pub mod collection;
pub mod colormaps;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod logging;
pub mod manipulations;
pub mod names;
pub mod passport;
pub mod plotting;
pub mod session;
pub mod units;

#[cfg(test)]
mod test_utils;

pub use collection::{GcmDatasetCollection, Selection};
pub use config::Config;
pub use dataset::{AttributeValue, DataArray, GcmDataset};
pub use error::{GcmError, Result};
pub use io::{GcmKind, IterSelection, RawReadOptions, SaveMethod};
pub use logging::{
    init_tracing, log_data_load_stats, log_error, log_operation_end, log_operation_start,
    log_timed_operation,
};
pub use passport::{is_the_data_basic, is_the_data_cloudy};
pub use plotting::PlotOptions;
pub use session::GcmTools;
pub use units::{PressureUnit, TimeUnit};
