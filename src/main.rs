//! gcmt - command-line front end for gcmtools
//!
//! Converts raw GCM output to the reduced format, inspects saved datasets,
//! runs reductions and renders plots.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use tracing::{error, info};

use gcmtools::config::{Command, PlotKind};
use gcmtools::passport::{check_basic, is_the_data_cloudy};
use gcmtools::{
    init_tracing, log_operation_end, log_operation_start, Config, GcmTools, IterSelection,
    RawReadOptions, SaveMethod,
};

fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, command) = Config::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_tracing(&config.log_level);
    info!("Starting gcmt v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let default_method = config.save_method()?;
    let mut gcmt = GcmTools::new(config)?;

    let start = Instant::now();
    let result = run(&mut gcmt, command, default_method);
    log_operation_end("gcmt", start, result.is_ok());
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn method_or(method: Option<String>, default: SaveMethod) -> anyhow::Result<SaveMethod> {
    match method {
        Some(m) => Ok(m.parse()?),
        None => Ok(default),
    }
}

fn load_dir(
    gcmt: &mut GcmTools,
    dir: &Path,
    method: SaveMethod,
    tag: Option<&str>,
) -> anyhow::Result<()> {
    let loaded = gcmt
        .load(dir, method, tag)
        .with_context(|| format!("loading datasets from {}", dir.display()))?;
    if loaded.is_empty() {
        bail!("No {} datasets found in {}", method, dir.display());
    }
    Ok(())
}

fn run(gcmt: &mut GcmTools, command: Command, default_method: SaveMethod) -> anyhow::Result<()> {
    match command {
        Command::Info { dir, method, tag } => {
            let method = method_or(method, default_method)?;
            log_operation_start("info", Some(&dir.to_string_lossy()));
            load_dir(gcmt, &dir, method, tag.as_deref())?;
            for (tag, ds) in gcmt.iter() {
                let dims = ds
                    .coordinates
                    .iter()
                    .map(|(name, c)| format!("{}={}", name, c.len()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let report = check_basic(ds);
                println!("{}", tag);
                println!("  dimensions: {}", dims);
                println!(
                    "  variables:  {}",
                    ds.variables.keys().cloned().collect::<Vec<_>>().join(", ")
                );
                println!("  basic:      {}", report.summary());
                println!("  clouds:     {}", is_the_data_cloudy(ds));
            }
        }

        Command::Convert {
            gcm,
            data_path,
            out_dir,
            iters,
            tag,
            method,
            update_along_time,
        } => {
            let method = method_or(method, default_method)?;
            let iters: IterSelection = iters.parse()?;
            log_operation_start("convert", Some(&data_path.to_string_lossy()));
            let tag = gcmt.read_raw(
                &gcm,
                &data_path,
                &iters,
                false,
                tag.as_deref(),
                &RawReadOptions::default(),
            )?;
            let written = gcmt.save(&out_dir, method, update_along_time, Some(&tag))?;
            for path in written {
                println!("{}", path.display());
            }
        }

        Command::Average {
            dir,
            var,
            out,
            area_key,
            tag,
            method,
        } => {
            let method = method_or(method, default_method)?;
            load_dir(gcmt, &dir, method, tag.as_deref())?;
            let avg = gcmt.add_horizontal_average(
                &var,
                out.as_deref(),
                area_key.as_deref(),
                tag.as_deref(),
            )?;
            println!("{} over {:?}:", var, avg.dims);
            println!("{}", avg.values);
            if out.is_some() {
                let tag = single_tag(gcmt, tag.as_deref())?;
                gcmt.save(&dir, method, false, Some(&tag))?;
            }
        }

        Command::Overturning {
            dir,
            var,
            out,
            tag,
            method,
        } => {
            let method = method_or(method, default_method)?;
            load_dir(gcmt, &dir, method, tag.as_deref())?;
            let psi = gcmt.add_meridional_overturning(Some(&var), out.as_deref(), tag.as_deref())?;
            let (min, max) = psi
                .values
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            println!("streamfunction of {}: min {:e}, max {:e}", var, min, max);
            if out.is_some() {
                let tag = single_tag(gcmt, tag.as_deref())?;
                gcmt.save(&dir, method, false, Some(&tag))?;
            }
        }

        Command::Plot {
            dir,
            kind,
            var,
            output,
            pressure,
            time_index,
            colormap,
            tag,
            method,
        } => {
            let method = method_or(method, default_method)?;
            load_dir(gcmt, &dir, method, tag.as_deref())?;

            let mut options = gcmt.plot_options().with_output(&output);
            options.time_index = time_index;
            if colormap.is_some() {
                options.colormap = colormap;
            }

            match kind {
                PlotKind::Isobaric => {
                    let Some(p) = pressure else {
                        bail!("--pressure is required for isobaric slices");
                    };
                    gcmt.isobaric_slice(&var, p, tag.as_deref(), &options)?;
                }
                PlotKind::TimeEvol => {
                    gcmt.time_evol(&var, tag.as_deref(), &options)?;
                }
                PlotKind::ZonalMean => {
                    gcmt.zonal_mean(&var, tag.as_deref(), &options)?;
                }
            }
            println!("{}", output.display());
        }
    }
    Ok(())
}

/// Tag of the dataset a reduction ran on
fn single_tag(gcmt: &GcmTools, tag: Option<&str>) -> anyhow::Result<String> {
    let ds = gcmt.get_one_model(tag)?;
    ds.tag()
        .map(str::to_string)
        .context("stored dataset has no tag attribute")
}
