// src/cross_section.rs - Perpendicular intensity sampling along the medial axis

use image::GrayImage;

use crate::config::MIN_STEP_RESOLUTION;
use crate::errors::{BandingError, Result};
use crate::image_utils::{in_bounds, is_foreground, round_to_grid, GridPoint, Pixel};
use crate::line_sampler::sample_line;

const EPSILON: f64 = 1e-9;

/// Cross-sections taken along a path, one entry per sampled step point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossSections {
    /// Step points on the medial axis as (row, column)
    pub centers: Vec<(f64, f64)>,
    /// Pixels averaged for each profile value, from one side of the blob to the other
    pub points: Vec<Vec<Pixel>>,
    /// Mean intensity across each cross-section
    pub profile: Vec<f64>,
}

impl CrossSections {
    pub fn len(&self) -> usize {
        self.profile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// Reverse the sampling order when the path runs upwards, so the profile
    /// always starts at the end of the path nearest the top of the image.
    pub fn orient(&mut self, start: Pixel, end: Pixel) -> bool {
        if start.0 <= end.0 {
            return false;
        }

        self.centers.reverse();
        self.points.reverse();
        self.profile.reverse();
        true
    }

    fn push(&mut self, center: (f64, f64), points: Vec<Pixel>, value: f64) {
        self.centers.push(center);
        self.points.push(points);
        self.profile.push(value);
    }
}

/// One straight piece of the conditioned path
#[derive(Debug, Clone, Copy)]
struct Segment {
    origin: (f64, f64),
    direction: (f64, f64),
    perpendicular: (f64, f64),
    length: f64,
}

impl Segment {
    fn between(from: GridPoint, to: GridPoint) -> Option<Self> {
        let dr = (to.0 - from.0) as f64;
        let dc = (to.1 - from.1) as f64;
        let length = dr.hypot(dc);
        if length < EPSILON {
            return None;
        }

        let direction = (dr / length, dc / length);
        Some(Self {
            origin: (from.0 as f64, from.1 as f64),
            direction,
            perpendicular: (direction.1, -direction.0),
            length,
        })
    }

    fn midpoint(&self) -> f64 {
        self.length / 2.0
    }

    fn point_at(&self, t: f64) -> (f64, f64) {
        (
            self.origin.0 + self.direction.0 * t,
            self.origin.1 + self.direction.1 * t,
        )
    }
}

/// Sample intensity profiles perpendicular to a polyline
///
/// Walks the path in steps of `resolution`, carrying the leftover distance across
/// each vertex so step points stay evenly spaced along the polyline. At every
/// step point inside the mask, two opposite rays of up to `max_length` pixels are
/// cast along the local perpendicular and the intensities they cover are averaged.
///
/// # Arguments
/// * `path` - Conditioned path as (row, column) grid points
/// * `blobs` - Binary mask bounding the rays
/// * `image` - Grayscale image to sample
/// * `resolution` - Distance between step points
/// * `max_length` - Maximum length of each ray
pub fn sample_cross_sections(
    path: &[GridPoint],
    blobs: &GrayImage,
    image: &GrayImage,
    resolution: f64,
    max_length: u32,
) -> Result<CrossSections> {
    if !(resolution.is_finite() && resolution >= MIN_STEP_RESOLUTION) {
        return Err(BandingError::Config(format!(
            "step resolution must be at least {}, got {}",
            MIN_STEP_RESOLUTION, resolution
        )));
    }

    let segments: Vec<Segment> = path
        .windows(2)
        .filter_map(|pair| Segment::between(pair[0], pair[1]))
        .collect();

    let (width, height) = image.dimensions();
    let max_length = max_length as f64;
    let mut sections = CrossSections::default();
    let mut buffer = 0.0;

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();
        let mut last_step = None;

        for k in 0.. {
            let t = buffer + k as f64 * resolution;
            let inside = if is_last {
                t <= segment.length + EPSILON
            } else {
                t < segment.length - EPSILON
            };
            if !inside {
                break;
            }
            last_step = Some(t);

            let center = segment.point_at(t);
            let (row, col) = (round_to_grid(center.0), round_to_grid(center.1));
            if !is_foreground(blobs, row, col) || !in_bounds(row, col, width, height) {
                continue;
            }

            let (dr, dc) = blended_perpendicular(&segments, i, t);
            let forward = (center.0 + dr * max_length, center.1 + dc * max_length);
            let backward = (center.0 - dr * max_length, center.1 - dc * max_length);

            let ray_1 = sample_line(center, forward, blobs, image);
            let ray_2 = sample_line(center, backward, blobs, image);

            // both rays start on the centre pixel, count it once
            let values: Vec<f64> = ray_1.values.iter().skip(1)
                .chain(ray_2.values.iter())
                .map(|&v| v as f64)
                .collect();
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;

            let mut points: Vec<Pixel> = ray_1.pixels.into_iter().skip(1).collect();
            points.reverse();
            points.extend(ray_2.pixels);

            sections.push(center, points, mean);
        }

        if is_last {
            break;
        }

        buffer = match last_step {
            Some(t) => carry_over(segment, &segments[i + 1], segment.length - t, resolution),
            None => buffer - segment.length,
        };
    }

    if sections.is_empty() {
        return Err(BandingError::EmptyProfile);
    }

    log::debug!(
        "Sampled {} cross-sections along {} segments",
        sections.len(),
        segments.len()
    );

    Ok(sections)
}

/// Perpendicular at distance `t` along segment `index`, rotated towards the
/// neighbouring segment in proportion to the distance from the segment midpoint
fn blended_perpendicular(segments: &[Segment], index: usize, t: f64) -> (f64, f64) {
    let current = &segments[index];
    let mid = current.midpoint();

    let (neighbor, weight) = if t < mid {
        let neighbor = index.checked_sub(1).map_or(current, |j| &segments[j]);
        (neighbor, (mid - t) / (mid + neighbor.midpoint()))
    } else {
        let neighbor = segments.get(index + 1).unwrap_or(current);
        (neighbor, (t - mid) / (mid + neighbor.midpoint()))
    };

    let blended = (
        current.perpendicular.0 * (1.0 - weight) + neighbor.perpendicular.0 * weight,
        current.perpendicular.1 * (1.0 - weight) + neighbor.perpendicular.1 * weight,
    );
    let norm = blended.0.hypot(blended.1);

    if norm > EPSILON {
        (blended.0 / norm, blended.1 / norm)
    } else {
        current.perpendicular
    }
}

/// Offset of the first step on `next` so that it lies `resolution` away from the
/// last step on `previous`, which stopped `leftover` short of the shared vertex
fn carry_over(previous: &Segment, next: &Segment, leftover: f64, resolution: f64) -> f64 {
    let dot = previous.direction.0 * next.direction.0 + previous.direction.1 * next.direction.1;
    let c = std::f64::consts::PI - dot.clamp(-1.0, 1.0).acos();
    let sin_c = c.sin();

    if sin_c.abs() < EPSILON {
        return resolution - leftover;
    }

    let a = (leftover * sin_c / resolution).clamp(-1.0, 1.0).asin();
    let b = std::f64::consts::PI - c - a;
    resolution * b.sin() / sin_c
}
