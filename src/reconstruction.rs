// src/reconstruction.rs - Paint extracted bands back onto the chromosome

use image::{GrayImage, Luma};

use crate::banding::Band;
use crate::image_utils::{foreground_pixels, Pixel};
use crate::pipeline::BandingExtraction;

/// Gray level of a white band; black bands are 0
const WHITE_BAND_LEVEL: f64 = 127.5;
const BACKGROUND: u8 = 255;

/// Band-painted segmentation of an extraction
pub fn reconstruct_segmentation(extraction: &BandingExtraction) -> GrayImage {
    paint_bands(
        &extraction.banding_points,
        &extraction.sampled_bands,
        &extraction.blobs,
    )
}

/// Paint each band onto the pixels of its cross-section
///
/// A pixel touched by several cross-sections takes their rounded average. Blob
/// pixels no cross-section reached copy the nearest painted pixel; everything
/// else stays white.
pub fn paint_bands(points: &[Vec<Pixel>], bands: &[Band], blobs: &GrayImage) -> GrayImage {
    let (width, height) = blobs.dimensions();
    let index = |(row, col): Pixel| row * width as usize + col;

    let mut sum = vec![0.0f64; width as usize * height as usize];
    let mut count = vec![0u32; width as usize * height as usize];

    for (section, band) in points.iter().zip(bands) {
        let whiteness = match band {
            Band::White => 1.0,
            Band::Black => 0.0,
        };
        for &pixel in section {
            if pixel.0 < height as usize && pixel.1 < width as usize {
                sum[index(pixel)] += whiteness;
                count[index(pixel)] += 1;
            }
        }
    }

    let mut segmentation = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    let mut painted = Vec::new();

    for row in 0..height as usize {
        for col in 0..width as usize {
            let i = index((row, col));
            if count[i] > 0 {
                let level = (sum[i] / count[i] as f64).round_ties_even() * WHITE_BAND_LEVEL;
                segmentation.put_pixel(col as u32, row as u32, Luma([level as u8]));
                painted.push((row, col));
            }
        }
    }

    if painted.is_empty() {
        return segmentation;
    }

    for pixel in foreground_pixels(blobs) {
        if count[index(pixel)] > 0 {
            continue;
        }

        let nearest = painted
            .iter()
            .copied()
            .min_by_key(|&p| squared_distance(p, pixel))
            .unwrap_or(pixel);
        let level = segmentation.get_pixel(nearest.1 as u32, nearest.0 as u32)[0];
        segmentation.put_pixel(pixel.1 as u32, pixel.0 as u32, Luma([level]));
    }

    segmentation
}

fn squared_distance(a: Pixel, b: Pixel) -> usize {
    let dr = a.0.abs_diff(b.0);
    let dc = a.1.abs_diff(b.1);
    dr * dr + dc * dc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::set_foreground;

    #[test]
    fn bands_are_painted_in_gray_and_black() {
        let mut blobs = GrayImage::new(3, 2);
        for col in 0..3 {
            set_foreground(&mut blobs, (0, col));
            set_foreground(&mut blobs, (1, col));
        }
        let points = vec![vec![(0, 0), (0, 1), (0, 2)], vec![(1, 0), (1, 1)]];

        let painted = paint_bands(&points, &[Band::White, Band::Black], &blobs);
        assert_eq!(painted.get_pixel(1, 0)[0], 127);
        assert_eq!(painted.get_pixel(0, 1)[0], 0);
        // (1, 2) is as close to (0, 2) as to (1, 1); the row-major first wins
        assert_eq!(painted.get_pixel(2, 1)[0], 127);
    }

    #[test]
    fn background_stays_white() {
        let mut blobs = GrayImage::new(4, 4);
        set_foreground(&mut blobs, (1, 1));
        let painted = paint_bands(&[vec![(1, 1)]], &[Band::Black], &blobs);

        assert_eq!(painted.get_pixel(1, 1)[0], 0);
        assert_eq!(painted.get_pixel(3, 3)[0], BACKGROUND);
    }

    #[test]
    fn overlapping_sections_round_to_even() {
        let mut blobs = GrayImage::new(2, 1);
        set_foreground(&mut blobs, (0, 0));
        let points = vec![vec![(0, 0)], vec![(0, 0)]];

        // an even split rounds down to black
        let painted = paint_bands(&points, &[Band::White, Band::Black], &blobs);
        assert_eq!(painted.get_pixel(0, 0)[0], 0);
    }
}
