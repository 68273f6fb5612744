use std::path::Path;

use cumulus_noise::{NoiseField, NoiseFieldGenerator};

/// Summary of one generated field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldReport {
    pub resolution: u32,
    pub cell_count: u32,
    pub epoch: u64,
    pub seed: u32,
    pub backend: String,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub elapsed_ms: f64,
}

impl FieldReport {
    pub fn new(field: &NoiseField, generator: &NoiseFieldGenerator, elapsed_ms: f64) -> Self {
        let key = field.key();
        let stats = field.stats();
        Self {
            resolution: key.resolution.side(),
            cell_count: key.cell_count,
            epoch: key.epoch,
            seed: generator.seed(),
            backend: generator.backend_label().to_string(),
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            elapsed_ms,
        }
    }
}

/// Load a report from a JSON file. Returns None if the file doesn't exist
/// or doesn't parse.
pub fn load_report(path: &Path) -> Option<FieldReport> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save a report to a JSON file.
pub fn save_report(path: &Path, report: &FieldReport) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Write the field as raw little-endian f32 voxels, x-fastest.
///
/// Any previously saved field at `path` is replaced. The new data is written
/// beside it first and renamed over it, so a failed write leaves the old file
/// intact.
pub fn save_field(path: &Path, field: &NoiseField) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes: Vec<u8> = field.values().iter().flat_map(|v| v.to_le_bytes()).collect();
    let staging = path.with_extension("partial");
    std::fs::write(&staging, bytes)?;
    std::fs::rename(&staging, path)
}

/// Read a field written by [`save_field`].
pub fn load_field(path: &Path) -> std::io::Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("field file is {} bytes, not a whole number of f32s", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Format a report as a markdown summary table.
pub fn format_markdown(report: &FieldReport) -> String {
    let mut out = String::new();
    out.push_str("| Resolution | Cells | Epoch | Seed | Backend | Min | Max | Mean | Time (ms) |\n");
    out.push_str("|------------|-------|-------|------|---------|-----|-----|------|-----------|\n");
    out.push_str(&format!(
        "| {0}^3 | {1}^3 | {2} | {3} | {4} | {5:.3} | {6:.3} | {7:.3} | {8:.2} |\n",
        report.resolution,
        report.cell_count,
        report.epoch,
        report.seed,
        report.backend,
        report.min,
        report.max,
        report.mean,
        report.elapsed_ms,
    ));
    out
}
