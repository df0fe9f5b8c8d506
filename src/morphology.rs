use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashSet;

use crate::config::ThresholdChoice;
use crate::errors::{BandingError, Result};
use crate::image_utils::{median_intensity, FOREGROUND};

/// 8-neighbourhood in Zhang-Suen order (P2..P9): north, then clockwise
const ZHANG_SUEN_NEIGHBORHOOD: [(i32, i32); 8] = [
    (-1, 0),  // north
    (-1, 1),  // north-east
    (0, 1),   // east
    (1, 1),   // south-east
    (1, 0),   // south
    (1, -1),  // south-west
    (0, -1),  // west
    (-1, -1), // north-west
];

/// Resolve the threshold choice for an image
pub fn resolve_threshold(image: &GrayImage, choice: ThresholdChoice) -> Result<f64> {
    match choice {
        ThresholdChoice::Fixed(value) => Ok(value),
        ThresholdChoice::Median => median_intensity(image).ok_or(BandingError::EmptyInput),
    }
}

/// Binary mask of all pixels darker than the threshold
pub fn threshold_blobs(image: &GrayImage, threshold: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if (image.get_pixel(x, y)[0] as f64) < threshold {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Fill background regions that are not connected to the image border
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }

    // Label background regions: background pixels become the labelled "foreground"
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] == 0 { Luma([FOREGROUND]) } else { Luma([0]) }
    });
    let labels = connected_components(&inverted, Connectivity::Four, Luma([0u8]));

    let mut border_labels = HashSet::new();
    for x in 0..width {
        border_labels.insert(labels.get_pixel(x, 0)[0]);
        border_labels.insert(labels.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        border_labels.insert(labels.get_pixel(0, y)[0]);
        border_labels.insert(labels.get_pixel(width - 1, y)[0]);
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y)[0];
        if label == 0 || !border_labels.contains(&label) {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Reduce a binary mask to a 1-pixel-wide 8-connected curve (Zhang-Suen thinning)
pub fn skeletonize(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut skeleton = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] != 0 { Luma([FOREGROUND]) } else { Luma([0]) }
    });

    loop {
        let mut changed = false;

        for sub_iteration in 0..2 {
            let mut to_remove = Vec::new();

            for y in 0..height {
                for x in 0..width {
                    if skeleton.get_pixel(x, y)[0] == 0 {
                        continue;
                    }

                    let p = neighborhood(&skeleton, x, y);
                    if is_removable(&p, sub_iteration) {
                        to_remove.push((x, y));
                    }
                }
            }

            for &(x, y) in &to_remove {
                skeleton.put_pixel(x, y, Luma([0]));
            }
            changed |= !to_remove.is_empty();
        }

        if !changed {
            break;
        }
    }

    skeleton
}

/// Neighbour occupancy P2..P9; out-of-bounds pixels are background
fn neighborhood(image: &GrayImage, x: u32, y: u32) -> [bool; 8] {
    let (width, height) = image.dimensions();
    let mut p = [false; 8];

    for (i, &(dy, dx)) in ZHANG_SUEN_NEIGHBORHOOD.iter().enumerate() {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx >= 0 && ny >= 0 && nx < width as i32 && ny < height as i32 {
            p[i] = image.get_pixel(nx as u32, ny as u32)[0] != 0;
        }
    }

    p
}

fn is_removable(p: &[bool; 8], sub_iteration: usize) -> bool {
    let neighbours = p.iter().filter(|&&v| v).count();
    if !(2..=6).contains(&neighbours) {
        return false;
    }

    // Number of 0 -> 1 transitions in the cyclic sequence P2, P3, ..., P9, P2
    let transitions = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
    if transitions != 1 {
        return false;
    }

    let (north, east, south, west) = (p[0], p[2], p[4], p[6]);
    if sub_iteration == 0 {
        !(north && east && south) && !(east && south && west)
    } else {
        !(north && east && west) && !(north && south && west)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::foreground_pixels;

    #[test]
    fn threshold_marks_dark_pixels() {
        let image = GrayImage::from_raw(3, 1, vec![10, 254, 255]).unwrap();
        let mask = threshold_blobs(&image, 254.0);
        assert_eq!(mask.as_raw(), &vec![FOREGROUND, 0, 0]);
    }

    #[test]
    fn median_threshold_uses_image_median() {
        let image = GrayImage::from_raw(3, 1, vec![10, 100, 200]).unwrap();
        let threshold = resolve_threshold(&image, ThresholdChoice::Median).unwrap();
        assert_eq!(threshold, 100.0);
        assert!(resolve_threshold(&GrayImage::new(0, 0), ThresholdChoice::Median).is_err());
    }

    #[test]
    fn enclosed_background_is_filled() {
        // 5x5 ring with a single-pixel hole in the middle
        let mut mask = GrayImage::new(5, 5);
        for y in 1..4 {
            for x in 1..4 {
                if (x, y) != (2, 2) {
                    mask.put_pixel(x, y, Luma([FOREGROUND]));
                }
            }
        }

        let filled = fill_holes(&mask);
        assert_eq!(filled.get_pixel(2, 2)[0], FOREGROUND);
        assert_eq!(filled.get_pixel(0, 0)[0], 0);
        assert_eq!(foreground_pixels(&filled).len(), 9);
    }

    #[test]
    fn thick_bar_thins_to_single_column() {
        let mut mask = GrayImage::new(9, 24);
        for y in 2..22 {
            for x in 2..7 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }

        let skeleton = skeletonize(&mask);
        let pixels = foreground_pixels(&skeleton);
        assert!(!pixels.is_empty());

        // away from the bar ends the skeleton is the centre column
        for row in 8..16 {
            let in_row: Vec<_> = pixels.iter().filter(|p| p.0 == row).collect();
            assert_eq!(in_row, vec![&(row, 4)], "row {}", row);
        }
        assert!(pixels.iter().all(|&(r, c)| (2..22).contains(&r) && (2..7).contains(&c)));
        assert!(pixels.len() < 40);
    }
}
