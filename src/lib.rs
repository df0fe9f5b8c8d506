// src/lib.rs - Library interface for chromosome banding pattern extraction

pub mod banding;
pub mod config;
pub mod cross_section;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod line_sampler;
pub mod morphology;
pub mod output;
pub mod path_algorithms;
pub mod path_conditioning;
pub mod pipeline;
pub mod reconstruction;
pub mod skeleton_graph;

// Re-export commonly used types and functions
pub use errors::{BandingError, ErrorKind, Result};
pub use config::{Config, ExtractionConfig, ThresholdChoice};
pub use image_io::{InputImage, load_image, save_image};

// Re-export the extraction entry points
pub use pipeline::{
    extract_from_masks,
    get_banding_pattern,
    get_banding_patterns_parallel,
    try_extract_from_masks,
    try_get_banding_pattern,
    BandingExtraction,
    BandingSummary,
    ExtractionFailure,
    ExtractionResult,
};

// Re-export signal processing functions
pub use banding::{
    binarize,
    filter_profile,
    gaussian_smooth,
    relaxation_filter,
    resize_banding_pattern,
    Band,
};

pub use reconstruction::reconstruct_segmentation;
pub use skeleton_graph::SkeletonGraph;
