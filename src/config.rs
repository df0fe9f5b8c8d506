use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{BandingError, Result};

/// Smallest distance between consecutive cross-sections
pub const MIN_STEP_RESOLUTION: f64 = 0.01;

/// Parameters of a single banding pattern extraction
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Keep every n-th pixel of the medial axis before sampling cross-sections
    #[serde(default = "default_pixel_sampling")]
    pub pixel_sampling: usize,

    /// Sigma of the Gaussian applied to the density profile
    #[serde(default = "default_density_sigma")]
    pub density_sigma: f64,

    /// Distance between two consecutive cross-sections along the medial axis
    #[serde(default = "default_step_resolution")]
    pub step_resolution: f64,

    /// Length of each of the two rays cast per cross-section
    #[serde(default = "default_ray_max_length")]
    pub ray_max_length: u32,

    /// Pixels darker than this are foreground
    #[serde(default = "default_chromosome_threshold")]
    pub chromosome_threshold: ThresholdChoice,

    /// Resize the binarized pattern to this length
    #[serde(default)]
    pub output_size: Option<usize>,

    #[serde(default)]
    pub reject_multiple_blobs: bool,

    /// Only keep the band sequence and blob count in results
    #[serde(default)]
    pub reduced_results: bool,
}

/// Foreground/background threshold choice
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdChoice {
    /// Fixed grayscale level
    Fixed(f64),
    /// Median intensity of the image
    Median,
}

/// Configuration of the command line tool
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    #[serde(default)]
    pub resize_dimensions: Option<[u32; 2]>,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Worker threads for folder mode, rayon's default when unset
    #[serde(default)]
    pub workers: Option<usize>,

    /// Only process files whose name contains this substring
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default = "default_csv_name")]
    pub csv_name: String,

    #[serde(default)]
    pub save_debug_images: bool,

    #[serde(default)]
    pub save_segmentation: bool,

    #[serde(default)]
    pub extraction: ExtractionConfig,
}

fn default_pixel_sampling() -> usize {
    8
}

fn default_density_sigma() -> f64 {
    2.0
}

fn default_step_resolution() -> f64 {
    1.0
}

fn default_ray_max_length() -> u32 {
    50
}

fn default_chromosome_threshold() -> ThresholdChoice {
    ThresholdChoice::Fixed(254.0)
}

fn default_parallel() -> bool {
    true
}

fn default_csv_name() -> String {
    "banding_patterns.csv".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pixel_sampling: default_pixel_sampling(),
            density_sigma: default_density_sigma(),
            step_resolution: default_step_resolution(),
            ray_max_length: default_ray_max_length(),
            chromosome_threshold: default_chromosome_threshold(),
            output_size: None,
            reject_multiple_blobs: false,
            reduced_results: false,
        }
    }
}

impl ExtractionConfig {
    /// Validate extraction parameters
    pub fn validate(&self) -> Result<()> {
        if self.pixel_sampling == 0 {
            return Err(BandingError::Config(
                "pixel_sampling must be >= 1".to_string(),
            ));
        }

        if !self.density_sigma.is_finite() || self.density_sigma < 0.0 {
            return Err(BandingError::Config(
                "density_sigma must be finite and >= 0.0".to_string(),
            ));
        }

        if !self.step_resolution.is_finite() || self.step_resolution < MIN_STEP_RESOLUTION {
            return Err(BandingError::Config(format!(
                "step_resolution must be finite and >= {}",
                MIN_STEP_RESOLUTION
            )));
        }

        if self.ray_max_length == 0 {
            return Err(BandingError::Config(
                "ray_max_length must be >= 1".to_string(),
            ));
        }

        if let ThresholdChoice::Fixed(threshold) = self.chromosome_threshold {
            if !threshold.is_finite() {
                return Err(BandingError::Config(
                    "chromosome_threshold must be finite".to_string(),
                ));
            }
        }

        if self.output_size == Some(0) {
            return Err(BandingError::Config(
                "output_size must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            resize_dimensions: None,
            use_parallel: true,
            workers: None,
            identifier: None,
            csv_name: default_csv_name(),
            save_debug_images: false,
            save_segmentation: false,
            extraction: ExtractionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BandingError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| BandingError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Load the configuration file if it exists, defaults otherwise
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!("Config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(BandingError::InvalidPath(input_path));
        }

        if let Some([width, height]) = self.resize_dimensions {
            if width == 0 || height == 0 {
                return Err(BandingError::Config(
                    "resize_dimensions must be > 0".to_string(),
                ));
            }
        }

        if self.workers == Some(0) {
            return Err(BandingError::Config(
                "workers must be >= 1".to_string(),
            ));
        }

        if self.csv_name.is_empty() {
            return Err(BandingError::Config(
                "csv_name must not be empty".to_string(),
            ));
        }

        self.extraction.validate()
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BandingError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
