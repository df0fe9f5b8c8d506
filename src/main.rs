use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::Parser;
use rayon::prelude::*;

use chromosome_banding_lib::banding::format_bands;
use chromosome_banding_lib::config::{Config, ThresholdChoice};
use chromosome_banding_lib::errors::{BandingError, Result};
use chromosome_banding_lib::image_io::{get_image_files_in_dir, load_image, save_image, InputImage};
use chromosome_banding_lib::image_utils::resize_image;
use chromosome_banding_lib::output::{
    write_banding_patterns_csv, write_json_report, write_statistics_csv, BandLengthStatistics,
    ExtractionReport,
};
use chromosome_banding_lib::pipeline::{
    get_banding_pattern, get_banding_patterns_parallel, ExtractionResult,
};
use chromosome_banding_lib::reconstruction::reconstruct_segmentation;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Chromosome banding pattern extraction")]
struct Args {
    /// Path to input image or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Resize every banding pattern to this length
    #[clap(short, long)]
    size: Option<usize>,

    /// Fixed grayscale segmentation threshold
    #[clap(short, long, conflicts_with = "auto_threshold")]
    threshold: Option<f64>,

    /// Use the image median as segmentation threshold
    #[clap(long)]
    auto_threshold: bool,

    /// Keep every n-th medial axis pixel
    #[clap(short, long)]
    pixel_sampling: Option<usize>,

    /// Fail images whose skeleton has more than one cluster
    #[clap(long)]
    reject_multiple_blobs: bool,

    /// Worker threads for folder mode
    #[clap(short, long)]
    workers: Option<usize>,

    /// Enable debug logging and save intermediate masks
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_base_dir = output.clone();
        }
        if let Some(size) = self.size {
            config.extraction.output_size = Some(size);
        }
        if let Some(threshold) = self.threshold {
            config.extraction.chromosome_threshold = ThresholdChoice::Fixed(threshold);
        }
        if self.auto_threshold {
            config.extraction.chromosome_threshold = ThresholdChoice::Median;
        }
        if let Some(pixel_sampling) = self.pixel_sampling {
            config.extraction.pixel_sampling = pixel_sampling;
        }
        if self.reject_multiple_blobs {
            config.extraction.reject_multiple_blobs = true;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if self.debug {
            config.save_debug_images = true;
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Resize if configured
fn prepare_image(input: InputImage, config: &Config) -> InputImage {
    match config.resize_dimensions {
        Some(dimensions) => InputImage {
            image: resize_image(&input.image, dimensions),
            ..input
        },
        None => input,
    }
}

fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Save reconstruction and intermediate masks of a successful extraction
fn save_images(filename: &str, result: &ExtractionResult, config: &Config) -> Result<()> {
    let ExtractionResult::Full(extraction) = result else {
        return Ok(());
    };

    let output_base = PathBuf::from(&config.output_base_dir);
    let stem = file_stem(filename);

    if config.save_segmentation {
        let segmentation = reconstruct_segmentation(extraction);
        let dir = output_base.join("segmentation");
        fs::create_dir_all(&dir)?;
        save_image(&segmentation, dir.join(format!("{}.png", stem)))?;
    }

    if config.save_debug_images {
        let dir = output_base.join("debug");
        fs::create_dir_all(&dir)?;
        save_image(&extraction.blobs, dir.join(format!("{}_blobs.png", stem)))?;
        save_image(&extraction.skeleton, dir.join(format!("{}_skeleton.png", stem)))?;
    }

    Ok(())
}

fn process_single_image(path: &Path, config: &Config) -> Result<()> {
    let input = prepare_image(load_image(path)?, config);
    let result = get_banding_pattern(&input.image, &config.extraction);

    match &result {
        ExtractionResult::Failed(failure) => {
            log::error!("Extraction of '{}' failed: {}", input.filename, failure.message);
        }
        _ => {
            let bands = result.bands().unwrap_or_default();
            log::info!(
                "{}: {} bands, {} blob(s)",
                input.filename,
                bands.len(),
                result.num_blobs().unwrap_or(0)
            );
            println!("{}", format_bands(bands));
        }
    }

    let report = ExtractionReport::from_result(&input.filename, &result);
    let report_path = PathBuf::from(&config.output_base_dir)
        .join(format!("{}.json", file_stem(&input.filename)));
    write_json_report(&report, report_path)?;

    save_images(&input.filename, &result, config)
}

fn process_folder(dir: &Path, config: &Config) -> Result<()> {
    let mut files = get_image_files_in_dir(dir)?;
    if let Some(identifier) = &config.identifier {
        files.retain(|path| {
            path.file_name()
                .and_then(|s| s.to_str())
                .map_or(false, |name| name.contains(identifier.as_str()))
        });
    }
    log::info!("Found {} image files in {}", files.len(), dir.display());

    let load = |path: &PathBuf| match load_image(path) {
        Ok(input) => Some(prepare_image(input, config)),
        Err(e) => {
            log::warn!("Skipping {}: {}", path.display(), e);
            None
        }
    };
    let inputs: Vec<InputImage> = if config.use_parallel {
        files.par_iter().filter_map(load).collect()
    } else {
        files.iter().filter_map(load).collect()
    };

    let images: Vec<_> = inputs.iter().map(|input| input.image.clone()).collect();
    let results = if config.use_parallel {
        get_banding_patterns_parallel(&images, &config.extraction, config.workers)?
    } else {
        images
            .iter()
            .map(|image| get_banding_pattern(image, &config.extraction))
            .collect()
    };

    let mut patterns = Vec::new();
    for (input, result) in inputs.iter().zip(&results) {
        match result.bands() {
            Some(bands) => {
                let name = match &config.identifier {
                    Some(identifier) => input.filename.replace(identifier.as_str(), ""),
                    None => input.filename.clone(),
                };
                patterns.push((name, bands.to_vec()));
            }
            None => {
                let message = result.failure().map_or("unknown error", |f| f.message.as_str());
                log::warn!("Extraction of '{}' failed, due to: {}", input.filename, message);
            }
        }

        if let Err(e) = save_images(&input.filename, result, config) {
            log::warn!("Could not save images for {}: {}", input.filename, e);
        }
    }

    let output_base = PathBuf::from(&config.output_base_dir);
    write_banding_patterns_csv(&patterns, output_base.join(&config.csv_name))?;

    let lengths: Vec<usize> = patterns.iter().map(|(_, bands)| bands.len()).collect();
    if let Some(statistics) = BandLengthStatistics::from_lengths(&lengths) {
        log::info!(
            "Banding pattern lengths: min {}, max {}, mean {:.1}",
            statistics.min,
            statistics.max,
            statistics.mean
        );
        write_statistics_csv(&statistics, output_base.join("statistics.csv"))?;
    }

    log::info!(
        "{} of {} images extracted successfully",
        patterns.len(),
        files.len()
    );
    Ok(())
}

/// Main function
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = Config::from_file_or_default(&args.config)?;
    args.apply_to(&mut config);
    config.validate()?;

    let start_time = Instant::now();
    fs::create_dir_all(&config.output_base_dir)?;

    let input_path = PathBuf::from(&config.input_path);
    if input_path.is_file() {
        log::info!("Processing single file: {}", input_path.display());
        process_single_image(&input_path, &config)?;
    } else if input_path.is_dir() {
        log::info!("Processing directory: {}", input_path.display());
        process_folder(&input_path, &config)?;
    } else {
        return Err(BandingError::InvalidPath(input_path));
    }

    log::info!(
        "Processing completed in {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
