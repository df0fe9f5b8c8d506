use std::fs;
use std::path::Path;
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::banding::{format_bands, Band};
use crate::errors::Result;
use crate::pipeline::{BandingSummary, ExtractionFailure, ExtractionResult};

/// Per-image outcome written as the JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub file_name: String,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BandingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExtractionFailure>,
}

impl ExtractionReport {
    pub fn from_result(file_name: &str, result: &ExtractionResult) -> Self {
        Self {
            file_name: file_name.to_string(),
            error: !result.is_success(),
            summary: result.summary(),
            failure: result.failure().cloned(),
        }
    }
}

/// Length statistics over a set of banding patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLengthStatistics {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl BandLengthStatistics {
    /// `None` when there are no lengths
    pub fn from_lengths(lengths: &[usize]) -> Option<Self> {
        let min = *lengths.iter().min()?;
        let max = *lengths.iter().max()?;
        let mean = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;

        Some(Self {
            count: lengths.len(),
            min,
            max,
            mean,
        })
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write banding patterns as `file_name,banding_pattern` rows with space separated tags
pub fn write_banding_patterns_csv<P: AsRef<Path>>(
    patterns: &[(String, Vec<Band>)],
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["file_name", "banding_pattern"])?;

    for (file_name, bands) in patterns {
        writer.write_record([file_name.as_str(), format_bands(bands).as_str()])?;
    }

    writer.flush()?;

    log::info!(
        "Wrote {} banding patterns to {}",
        patterns.len(),
        output_path.display()
    );
    Ok(())
}

/// Write length statistics as a single-row CSV
pub fn write_statistics_csv<P: AsRef<Path>>(
    statistics: &BandLengthStatistics,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let mut writer = Writer::from_path(output_path)?;
    writer.write_record(["Count", "Min_Length", "Max_Length", "Mean_Length"])?;
    writer.write_record(&[
        statistics.count.to_string(),
        statistics.min.to_string(),
        statistics.max.to_string(),
        format!("{:.6}", statistics.mean),
    ])?;
    writer.flush()?;

    Ok(())
}

/// Write a pretty-printed JSON report
pub fn write_json_report<P: AsRef<Path>>(report: &ExtractionReport, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    create_parent_dir(output_path)?;

    let content = serde_json::to_string_pretty(report)?;
    fs::write(output_path, content)?;

    Ok(())
}
