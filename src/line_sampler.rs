// src/line_sampler.rs - Mask-bounded intensity sampling along discrete lines

use image::GrayImage;

use crate::image_utils::{in_bounds, intensity, is_foreground, round_to_grid, GridPoint, Pixel};

/// Pixels visited by a ray and their grayscale values, in walking order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineSample {
    pub pixels: Vec<Pixel>,
    pub values: Vec<u8>,
}

/// Rasterize the line between two grid points, both ends included
///
/// Midpoint rasterization walking from `start` towards `end`: the dominant axis
/// advances one unit per pixel and the minor axis rounds to the nearest pixel.
/// Ties between the axes walk along the column axis.
///
/// # Arguments
/// * `start` - Starting point as (row, column)
/// * `end` - Ending point as (row, column)
pub fn trace_line(start: GridPoint, end: GridPoint) -> Vec<GridPoint> {
    let row_step = if end.0 > start.0 { 1 } else { -1 };
    let col_step = if end.1 > start.1 { 1 } else { -1 };
    let rows = (end.0 - start.0).abs();
    let cols = (end.1 - start.1).abs();

    // (major step, minor step) as (row, column) offsets
    let (major, minor, long, short) = if rows > cols {
        ((row_step, 0), (0, col_step), rows, cols)
    } else {
        ((0, col_step), (row_step, 0), cols, rows)
    };

    let mut line = Vec::with_capacity(long as usize + 1);
    let mut decision = 2 * short - long;
    let mut offset = 0;

    for step in 0..=long {
        line.push((
            start.0 + step * major.0 + offset * minor.0,
            start.1 + step * major.1 + offset * minor.1,
        ));
        if decision >= 0 {
            offset += 1;
            decision -= 2 * long;
        }
        decision += 2 * short;
    }

    line
}

/// Collect grayscale values along a line until it leaves the mask
///
/// Both points are snapped to the pixel grid first. The walk stops at the first
/// pixel that lies outside the mask or the image; only pixels visited before that
/// are returned.
///
/// # Arguments
/// * `start` - Real-valued starting point as (row, column)
/// * `end` - Real-valued ending point as (row, column)
/// * `blobs` - Binary mask bounding the walk
/// * `image` - Grayscale image to sample
pub fn sample_line(
    start: (f64, f64),
    end: (f64, f64),
    blobs: &GrayImage,
    image: &GrayImage,
) -> LineSample {
    let start = (round_to_grid(start.0), round_to_grid(start.1));
    let end = (round_to_grid(end.0), round_to_grid(end.1));

    let (width, height) = image.dimensions();
    let mut sample = LineSample::default();

    for (row, col) in trace_line(start, end) {
        if !is_foreground(blobs, row, col) || !in_bounds(row, col, width, height) {
            break;
        }

        let pixel = (row as usize, col as usize);
        sample.values.push(intensity(image, pixel));
        sample.pixels.push(pixel);
    }

    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filled(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn trace_includes_both_ends() {
        let line = trace_line((0, 0), (0, 3));
        assert_eq!(line, vec![(0, 0), (0, 1), (0, 2), (0, 3)]);

        let line = trace_line((2, 2), (2, 2));
        assert_eq!(line, vec![(2, 2)]);
    }

    #[test]
    fn trace_rounds_minor_axis_to_nearest() {
        assert_eq!(
            trace_line((0, 0), (3, 1)),
            vec![(0, 0), (1, 0), (2, 1), (3, 1)]
        );
        assert_eq!(
            trace_line((0, 0), (2, 5)),
            vec![(0, 0), (0, 1), (1, 2), (1, 3), (2, 4), (2, 5)]
        );
    }

    #[test]
    fn trace_walks_away_from_start() {
        assert_eq!(
            trace_line((0, 0), (-3, -1)),
            vec![(0, 0), (-1, 0), (-2, -1), (-3, -1)]
        );
        assert_eq!(
            trace_line((5, 5), (5, 2)),
            vec![(5, 5), (5, 4), (5, 3), (5, 2)]
        );
    }

    #[test]
    fn trace_diagonal_steps_both_axes() {
        assert_eq!(trace_line((0, 0), (2, 2)), vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(trace_line((0, 0), (2, -2)), vec![(0, 0), (1, -1), (2, -2)]);
    }

    #[test]
    fn sloped_ray_stops_at_mask_border() {
        let mut image = filled(6, 6, 0);
        let mut blobs = filled(6, 6, 0);
        for (row, col) in [(0, 0), (1, 0), (2, 1), (2, 0)] {
            blobs.put_pixel(col, row, Luma([255]));
            image.put_pixel(col, row, Luma([10 * (row as u8 + 1)]));
        }

        let sample = sample_line((0.0, 0.0), (3.0, 1.0), &blobs, &image);
        assert_eq!(sample.pixels, vec![(0, 0), (1, 0), (2, 1)]);
        assert_eq!(sample.values, vec![10, 20, 30]);
    }

    #[test]
    fn walk_stops_at_mask_border() {
        let mut image = filled(10, 3, 0);
        for x in 0..10 {
            image.put_pixel(x, 1, Luma([x as u8 * 10]));
        }
        let mut blobs = filled(10, 3, 0);
        for x in 2..6 {
            blobs.put_pixel(x, 1, Luma([255]));
        }

        let sample = sample_line((1.0, 3.0), (1.0, 9.0), &blobs, &image);
        assert_eq!(sample.pixels, vec![(1, 3), (1, 4), (1, 5)]);
        assert_eq!(sample.values, vec![30, 40, 50]);

        let sample = sample_line((1.0, 3.0), (1.0, -40.0), &blobs, &image);
        assert_eq!(sample.pixels, vec![(1, 3), (1, 2)]);
    }

    #[test]
    fn start_outside_mask_yields_nothing() {
        let image = filled(4, 4, 7);
        let blobs = filled(4, 4, 0);
        let sample = sample_line((1.0, 1.0), (1.0, 3.0), &blobs, &image);
        assert!(sample.pixels.is_empty());
        assert!(sample.values.is_empty());
    }

    #[test]
    fn walk_stops_at_image_border() {
        let image = filled(4, 4, 9);
        let blobs = filled(4, 4, 255);
        let sample = sample_line((0.0, 0.0), (-10.0, 0.0), &blobs, &image);
        assert_eq!(sample.pixels, vec![(0, 0)]);
        assert_eq!(sample.values, vec![9]);
    }
}
