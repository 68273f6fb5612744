use std::path::PathBuf;
use std::time::Instant;

use cumulus_core::{CloudError, FieldKey, Resolution};
use cumulus_noise::{CpuWorley, GpuWorley, NoiseField, NoiseFieldGenerator, WorleyCompute};
use cumulus_volume::settings::{default_preset, load_settings};
use cumulus_volume::{CloudSettings, CloudVolumeParameters, ParameterBlock, SettingsError};
use thiserror::Error;

use crate::report::{load_field, load_report, save_field, save_report, FieldReport};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Noise generation failed: {0}")]
    Cloud(#[from] CloudError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one invocation of the tool should do.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// RON settings file; the built-in preset when absent.
    pub settings_path: Option<PathBuf>,
    /// Regenerate even if the saved field is current ("Force Update").
    pub force: bool,
    /// Skip GPU acquisition and use the CPU backend.
    pub cpu_only: bool,
    pub seed: Option<u32>,
    /// Keep the raw jitter instead of snapping points to voxel centres.
    pub continuous_points: bool,
    /// Raw f32 field file. Read back on Apply, replaced after regeneration.
    pub output_path: Option<PathBuf>,
    /// JSON report describing the field in `output_path`.
    pub report_path: Option<PathBuf>,
}

/// Result of a run: the current field, the render snapshot built from it
/// and a summary report.
#[derive(Debug)]
pub struct RunOutcome {
    pub field: NoiseField,
    pub block: Option<ParameterBlock>,
    pub report: FieldReport,
    /// False when the saved field was still current and no dispatch ran.
    pub regenerated: bool,
}

/// Pick the compute backend: the GPU when one is available, otherwise the
/// CPU reference implementation.
pub fn select_backend(cpu_only: bool) -> Box<dyn WorleyCompute> {
    if cpu_only {
        log::info!("Using CPU Worley backend");
        return Box::new(CpuWorley::new());
    }
    match GpuWorley::request_headless() {
        Ok(gpu) => Box::new(gpu),
        Err(e) => {
            log::warn!("{e}; falling back to CPU Worley backend");
            Box::new(CpuWorley::new())
        }
    }
}

pub fn load_run_settings(config: &RunConfig) -> Result<CloudSettings, SettingsError> {
    match &config.settings_path {
        Some(path) => {
            log::info!("Loading cloud settings from {}", path.display());
            load_settings(path)
        }
        None => default_preset(),
    }
}

/// Field saved by a previous run, paired with its report.
fn load_saved_field(config: &RunConfig, report: &FieldReport) -> Option<NoiseField> {
    let path = config.output_path.as_deref()?;
    let resolution = match Resolution::try_from(report.resolution) {
        Ok(resolution) => resolution,
        Err(e) => {
            log::warn!("Ignoring saved report: {e}");
            return None;
        }
    };
    let values = match load_field(path) {
        Ok(values) => values,
        Err(e) => {
            log::info!("No saved field at {} ({e})", path.display());
            return None;
        }
    };
    let key = FieldKey {
        resolution,
        cell_count: report.cell_count,
        epoch: report.epoch,
    };
    match NoiseField::from_values(key, values) {
        Ok(field) => Some(field),
        Err(e) => {
            log::warn!("Ignoring saved field at {}: {e}", path.display());
            None
        }
    }
}

/// Load settings, apply them against the given backend and package the
/// result for rendering.
///
/// Apply reuses the field saved at `output_path` when its report matches the
/// settings' resolution and cell count; Force Update always regenerates.
/// A regenerated field and its report replace the saved ones.
pub fn run_with_backend(
    config: &RunConfig,
    compute: Box<dyn WorleyCompute>,
) -> Result<RunOutcome, ToolError> {
    let settings = load_run_settings(config)?;
    let previous = config.report_path.as_deref().and_then(load_report);

    let mut generator = match config.seed {
        Some(seed) => NoiseFieldGenerator::with_seed(compute, seed),
        None => match &previous {
            Some(report) => NoiseFieldGenerator::with_seed(compute, report.seed),
            None => NoiseFieldGenerator::new(compute),
        },
    };
    if let Some(report) = previous.as_ref().filter(|r| r.seed == generator.seed()) {
        generator.resume_at_epoch(report.epoch + 1);
    }
    generator.set_voxel_snapping(!config.continuous_points);

    let mut params = CloudVolumeParameters::new(settings, generator);
    if let Some(report) = &previous {
        if let Some(saved) = load_saved_field(config, report) {
            params.restore_field(saved);
        }
    }

    let epoch_before = params.generator().epoch();
    let start = Instant::now();
    let field = params.apply_settings(config.force)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let regenerated = params.generator().epoch() != epoch_before;

    let block = params.package_for_render();

    let report = match previous {
        Some(report) if !regenerated => {
            log::info!(
                "Saved {0}^3 field (epoch {1}) is current; skipping generation",
                field.side(),
                report.epoch
            );
            report
        }
        _ => {
            let report = FieldReport::new(&field, params.generator(), elapsed_ms);
            log::info!(
                "Generated {0}^3 field in {1:.1} ms (min {2:.3}, max {3:.3}, mean {4:.3})",
                field.side(),
                elapsed_ms,
                report.min,
                report.max,
                report.mean
            );
            if let Some(path) = &config.output_path {
                save_field(path, &field)?;
                log::info!("Saved field to {}", path.display());
            }
            if let Some(path) = &config.report_path {
                save_report(path, &report)?;
                log::info!("Saved report to {}", path.display());
            }
            report
        }
    };

    Ok(RunOutcome {
        field,
        block,
        report,
        regenerated,
    })
}

pub fn run(config: &RunConfig) -> Result<RunOutcome, ToolError> {
    run_with_backend(config, select_backend(config.cpu_only))
}
