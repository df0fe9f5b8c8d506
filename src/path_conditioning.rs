// src/path_conditioning.rs - Path subsampling and end extrapolation

use image::GrayImage;

use crate::errors::{BandingError, Result};
use crate::image_utils::{is_foreground, round_to_grid, GridPoint, Pixel};

/// Hard cap on extrapolation steps at either end of the path
pub const MAX_EXTRAPOLATION_STEPS: usize = 5000;

/// Keep `len / stride` evenly spaced points spanning the whole path
///
/// Index spacing truncates toward zero. The first and last points are always kept;
/// when fewer than two points would remain, only those two are returned.
pub fn subsample(path: &[Pixel], stride: usize) -> Vec<Pixel> {
    let n = path.len();
    if n < 2 {
        return path.to_vec();
    }

    let k = n / stride.max(1);
    if k <= 1 {
        return vec![path[0], path[n - 1]];
    }

    (0..k).map(|i| path[i * (n - 1) / (k - 1)]).collect()
}

/// Extend both ends of a path along its end directions until it leaves the mask
///
/// Each end walks away from its neighbouring point one pixel per step along the
/// dominant axis. Every visited pixel is kept, including the first one outside the
/// mask or image, which ends the walk.
///
/// # Arguments
/// * `path` - Subsampled path with at least two points
/// * `blobs` - Binary mask the path lives in
///
/// # Returns
/// The path with the start extension prepended (reversed) and the end extension appended
pub fn extrapolate_ends(path: &[Pixel], blobs: &GrayImage) -> Result<Vec<GridPoint>> {
    if path.len() < 2 {
        return Err(BandingError::NoSkeletonPath(format!(
            "path of {} points cannot be extrapolated",
            path.len()
        )));
    }

    let points: Vec<GridPoint> = path
        .iter()
        .map(|&(row, col)| (row as isize, col as isize))
        .collect();
    let n = points.len();

    let head = walk_outward(points[1], points[0], blobs)?;
    let tail = walk_outward(points[n - 2], points[n - 1], blobs)?;

    log::debug!(
        "Extrapolated path by {} points at the start and {} at the end",
        head.len(),
        tail.len()
    );

    let mut conditioned = Vec::with_capacity(head.len() + n + tail.len());
    conditioned.extend(head.into_iter().rev());
    conditioned.extend(points);
    conditioned.extend(tail);
    Ok(conditioned)
}

/// Step from `end` away from `previous` until the mask is left
fn walk_outward(previous: GridPoint, end: GridPoint, blobs: &GrayImage) -> Result<Vec<GridPoint>> {
    let dr = (end.0 - previous.0) as f64;
    let dc = (end.1 - previous.1) as f64;
    let scale = dr.abs().max(dc.abs());
    if scale == 0.0 {
        return Err(BandingError::ExtrapolationRunaway(0));
    }
    let (ur, uc) = (dr / scale, dc / scale);

    let mut extension = Vec::new();
    for count in 1..=MAX_EXTRAPOLATION_STEPS {
        let step = count as f64;
        let point = (
            round_to_grid(end.0 as f64 + ur * step),
            round_to_grid(end.1 as f64 + uc * step),
        );
        extension.push(point);

        if !is_foreground(blobs, point.0, point.1) {
            return Ok(extension);
        }
    }

    Err(BandingError::ExtrapolationRunaway(MAX_EXTRAPOLATION_STEPS))
}
