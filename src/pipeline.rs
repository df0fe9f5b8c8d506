// src/pipeline.rs - Banding pattern extraction from a chromosome image

use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::banding::{binarize, filter_profile, resize_banding_pattern, Band};
use crate::config::ExtractionConfig;
use crate::cross_section::sample_cross_sections;
use crate::errors::{BandingError, ErrorKind, Result};
use crate::image_utils::{GridPoint, Pixel};
use crate::morphology::{fill_holes, resolve_threshold, skeletonize, threshold_blobs};
use crate::path_algorithms::merge_longest;
use crate::path_conditioning::{extrapolate_ends, subsample};
use crate::skeleton_graph::build_with_fallback;

/// Every artifact of a successful extraction
#[derive(Debug, Clone)]
pub struct BandingExtraction {
    /// Final band sequence, resized when an output size is configured
    pub binarized_banding_pattern: Vec<Band>,
    /// Band of every cross-section, before any resizing
    pub sampled_bands: Vec<Band>,
    pub banding_pattern_filtered: Vec<f64>,
    pub banding_pattern_smooth: Vec<f64>,
    /// Raw density profile, one mean intensity per cross-section
    pub banding_pattern: Vec<f64>,
    /// Pixels averaged for each raw profile value
    pub banding_points: Vec<Vec<Pixel>>,
    /// Medial axis points the cross-sections were taken at
    pub sampled_centers: Vec<(f64, f64)>,
    pub subsampled_path: Vec<Pixel>,
    pub conditioned_path: Vec<GridPoint>,
    /// Shortest endpoint paths of the dominant skeleton cluster
    pub paths: Vec<Vec<Pixel>>,
    pub longest_path: Vec<Pixel>,
    pub skeleton: GrayImage,
    pub blobs: GrayImage,
    pub num_blobs: usize,
}

impl BandingExtraction {
    pub fn summary(&self) -> BandingSummary {
        BandingSummary {
            binarized_banding_pattern: self.binarized_banding_pattern.clone(),
            num_blobs: self.num_blobs,
        }
    }
}

/// Serializable outcome of a successful extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandingSummary {
    pub binarized_banding_pattern: Vec<Band>,
    pub num_blobs: usize,
}

/// Why an extraction failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Debug form of the error followed by its chain of sources
    pub trace: Vec<String>,
}

impl ExtractionFailure {
    pub fn from_error(error: &BandingError) -> Self {
        let mut trace = vec![format!("{:?}", error)];
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = std::error::Error::source(cause);
        }

        Self {
            kind: error.kind(),
            message: error.to_string(),
            trace,
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };

        Self {
            kind: ErrorKind::Internal,
            message: format!("extraction panicked: {}", message),
            trace: Vec::new(),
        }
    }
}

/// Result of one extraction; failures are carried, never raised
#[derive(Debug, Clone)]
pub enum ExtractionResult {
    Full(Box<BandingExtraction>),
    Reduced(BandingSummary),
    Failed(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExtractionResult::Failed(_))
    }

    pub fn bands(&self) -> Option<&[Band]> {
        match self {
            ExtractionResult::Full(extraction) => Some(&extraction.binarized_banding_pattern),
            ExtractionResult::Reduced(summary) => Some(&summary.binarized_banding_pattern),
            ExtractionResult::Failed(_) => None,
        }
    }

    pub fn num_blobs(&self) -> Option<usize> {
        match self {
            ExtractionResult::Full(extraction) => Some(extraction.num_blobs),
            ExtractionResult::Reduced(summary) => Some(summary.num_blobs),
            ExtractionResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<BandingSummary> {
        match self {
            ExtractionResult::Full(extraction) => Some(extraction.summary()),
            ExtractionResult::Reduced(summary) => Some(summary.clone()),
            ExtractionResult::Failed(_) => None,
        }
    }
}

/// Extract the banding pattern from a skeleton, its blob mask and the grayscale image
///
/// Stages: skeleton graph, dominant cluster paths, longest merged path, subsampling,
/// end extrapolation, cross-section sampling, filtering and binarization.
pub fn try_extract_from_masks(
    skeleton: &GrayImage,
    blobs: &GrayImage,
    image: &GrayImage,
    config: &ExtractionConfig,
) -> Result<BandingExtraction> {
    config.validate()?;

    let dimensions = image.dimensions();
    if dimensions.0 == 0 || dimensions.1 == 0 {
        return Err(BandingError::EmptyInput);
    }
    check_dimensions("skeleton", skeleton, dimensions)?;
    check_dimensions("blob mask", blobs, dimensions)?;

    // Step 1: Skeleton graph and its clusters
    let (graph, skeleton) = build_with_fallback(skeleton)?;
    let num_blobs = graph.num_clusters();

    if num_blobs > 1 && config.reject_multiple_blobs {
        return Err(BandingError::MultipleBlobsRejected(num_blobs));
    }

    let cluster = graph.dominant_cluster()?;
    if cluster.paths.is_empty() {
        return Err(BandingError::NoSkeletonPath(
            "dominant cluster has no endpoint path".to_string(),
        ));
    }

    // Step 2: Medial axis
    let longest = merge_longest(&graph, &cluster.paths).ok_or_else(|| {
        BandingError::NoSkeletonPath("no path could be merged".to_string())
    })?;
    let longest_path = graph.path_pixels(&longest);
    let paths: Vec<Vec<Pixel>> = cluster.paths.iter().map(|p| graph.path_pixels(p)).collect();

    log::debug!(
        "{} cluster(s), {} endpoint paths, medial axis of {} pixels",
        num_blobs,
        paths.len(),
        longest_path.len()
    );

    // Step 3: Subsample and extend to the blob border
    let subsampled_path = subsample(&longest_path, config.pixel_sampling);
    let conditioned_path = extrapolate_ends(&subsampled_path, blobs)?;

    // Step 4: Density profile
    let mut sections = sample_cross_sections(
        &conditioned_path,
        blobs,
        image,
        config.step_resolution,
        config.ray_max_length,
    )?;

    let start = subsampled_path[0];
    let end = subsampled_path[subsampled_path.len() - 1];
    if sections.orient(start, end) {
        log::debug!("Medial axis runs upwards, profile reversed");
    }

    // Step 5: Filter and binarize
    let (filtered, smooth) = filter_profile(&sections.profile, config.density_sigma);
    let sampled_bands = binarize(&filtered);

    let binarized_banding_pattern = match config.output_size {
        Some(size) => resize_banding_pattern(&sampled_bands, size),
        None => sampled_bands.clone(),
    };

    Ok(BandingExtraction {
        binarized_banding_pattern,
        sampled_bands,
        banding_pattern_filtered: filtered,
        banding_pattern_smooth: smooth,
        banding_pattern: sections.profile,
        banding_points: sections.points,
        sampled_centers: sections.centers,
        subsampled_path,
        conditioned_path,
        paths,
        longest_path,
        skeleton,
        blobs: blobs.clone(),
        num_blobs,
    })
}

/// Segment the image and extract its banding pattern
///
/// Foreground is every pixel darker than the configured threshold, with enclosed
/// holes filled; the skeleton is its Zhang-Suen thinning.
pub fn try_get_banding_pattern(
    image: &GrayImage,
    config: &ExtractionConfig,
) -> Result<BandingExtraction> {
    if image.width() == 0 || image.height() == 0 {
        return Err(BandingError::EmptyInput);
    }

    let threshold = resolve_threshold(image, config.chromosome_threshold)?;
    log::debug!("Segmenting with threshold {:.1}", threshold);

    let blobs = fill_holes(&threshold_blobs(image, threshold));
    let skeleton = skeletonize(&blobs);

    try_extract_from_masks(&skeleton, &blobs, image, config)
}

/// Extraction from precomputed masks with every failure captured in the result
pub fn extract_from_masks(
    skeleton: &GrayImage,
    blobs: &GrayImage,
    image: &GrayImage,
    config: &ExtractionConfig,
) -> ExtractionResult {
    guarded(config, || try_extract_from_masks(skeleton, blobs, image, config))
}

/// Full extraction from a grayscale image with every failure captured in the result
pub fn get_banding_pattern(image: &GrayImage, config: &ExtractionConfig) -> ExtractionResult {
    guarded(config, || try_get_banding_pattern(image, config))
}

/// Extract many images in parallel; results keep the input order
///
/// # Arguments
/// * `images` - Grayscale chromosome images
/// * `config` - Extraction parameters shared by all images
/// * `workers` - Thread count, rayon's global pool when `None`
pub fn get_banding_patterns_parallel(
    images: &[GrayImage],
    config: &ExtractionConfig,
    workers: Option<usize>,
) -> Result<Vec<ExtractionResult>> {
    let extract_all = || {
        images
            .par_iter()
            .map(|image| get_banding_pattern(image, config))
            .collect::<Vec<_>>()
    };

    let results = match workers {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| BandingError::Config(format!("cannot start worker pool: {}", e)))?
            .install(extract_all),
        None => extract_all(),
    };

    let failed = results.iter().filter(|r| !r.is_success()).count();
    log::info!(
        "Extracted {} of {} banding patterns",
        results.len() - failed,
        results.len()
    );

    Ok(results)
}

fn guarded<F>(config: &ExtractionConfig, extract: F) -> ExtractionResult
where
    F: FnOnce() -> Result<BandingExtraction>,
{
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(extraction)) if config.reduced_results => {
            ExtractionResult::Reduced(extraction.summary())
        }
        Ok(Ok(extraction)) => ExtractionResult::Full(Box::new(extraction)),
        Ok(Err(error)) => {
            log::debug!("Extraction failed: {}", error);
            ExtractionResult::Failed(ExtractionFailure::from_error(&error))
        }
        Err(payload) => {
            log::error!("Extraction panicked");
            ExtractionResult::Failed(ExtractionFailure::from_panic(payload))
        }
    }
}

fn check_dimensions(what: &'static str, mask: &GrayImage, expected: (u32, u32)) -> Result<()> {
    let actual = mask.dimensions();
    if actual != expected {
        return Err(BandingError::DimensionMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn failure_records_kind_and_message() {
        let failure = ExtractionFailure::from_error(&BandingError::MultipleBlobsRejected(3));
        assert_eq!(failure.kind, ErrorKind::MultipleBlobsRejected);
        assert!(failure.message.contains('3'));
        assert_eq!(failure.trace.len(), 1);
    }

    #[test]
    fn panics_become_internal_failures() {
        let result = guarded(&ExtractionConfig::default(), || panic!("boom"));
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Internal);
        assert!(failure.message.contains("boom"));
    }

    #[test]
    fn mismatched_masks_are_rejected() {
        let image = GrayImage::new(4, 4);
        let skeleton = GrayImage::new(4, 5);
        let err = try_extract_from_masks(&skeleton, &image, &image, &ExtractionConfig::default())
            .unwrap_err();
        assert!(matches!(err, BandingError::DimensionMismatch { what: "skeleton", .. }));
    }

    #[test]
    fn zero_sized_image_is_empty_input() {
        let result = get_banding_pattern(&GrayImage::new(0, 0), &ExtractionConfig::default());
        assert_eq!(result.failure().map(|f| f.kind), Some(ErrorKind::EmptyInput));
    }

    #[test]
    fn white_image_has_no_skeleton() {
        let image = GrayImage::from_pixel(8, 8, Luma([255]));
        let result = get_banding_pattern(&image, &ExtractionConfig::default());
        assert_eq!(result.failure().map(|f| f.kind), Some(ErrorKind::NoSkeletonPath));
        assert_eq!(result.bands(), None);
    }

    #[test]
    fn invalid_config_is_reported() {
        let config = ExtractionConfig {
            pixel_sampling: 0,
            ..ExtractionConfig::default()
        };
        let image = GrayImage::new(4, 4);
        let result = extract_from_masks(&image, &image, &image, &config);
        assert_eq!(result.failure().map(|f| f.kind), Some(ErrorKind::InvalidInput));
    }
}
