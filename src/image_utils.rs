use image::{GrayImage, Luma};

/// Value written for foreground pixels in binary masks
pub const FOREGROUND: u8 = 255;

/// Pixel index inside an image as (row, column)
pub type Pixel = (usize, usize);

/// Pixel coordinate that may lie outside the image, as (row, column)
pub type GridPoint = (isize, isize);

/// Resize an image to the specified dimensions
pub fn resize_image(
    image: &GrayImage,
    dimensions: [u32; 2],
) -> GrayImage {
    let (width, height) = (dimensions[0], dimensions[1]);
    image::imageops::resize(
        image,
        width,
        height,
        image::imageops::FilterType::Triangle,
    )
}

/// Check if a (row, column) coordinate is inside the image bounds
#[inline]
pub fn in_bounds(row: isize, col: isize, width: u32, height: u32) -> bool {
    row >= 0 && col >= 0 && (row as u64) < height as u64 && (col as u64) < width as u64
}

/// Check if a (row, column) coordinate is a foreground pixel of a mask.
/// Out-of-bounds coordinates are background.
#[inline]
pub fn is_foreground(mask: &GrayImage, row: isize, col: isize) -> bool {
    let (width, height) = mask.dimensions();
    in_bounds(row, col, width, height) && mask.get_pixel(col as u32, row as u32)[0] != 0
}

/// Grayscale value at a (row, column) pixel
#[inline]
pub fn intensity(image: &GrayImage, pixel: Pixel) -> u8 {
    image.get_pixel(pixel.1 as u32, pixel.0 as u32)[0]
}

/// Mark a (row, column) pixel as foreground
#[inline]
pub fn set_foreground(mask: &mut GrayImage, pixel: Pixel) {
    mask.put_pixel(pixel.1 as u32, pixel.0 as u32, Luma([FOREGROUND]));
}

/// Foreground pixels of a mask in row-major order
pub fn foreground_pixels(mask: &GrayImage) -> Vec<Pixel> {
    let (width, height) = mask.dimensions();
    let mut pixels = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if mask.get_pixel(x, y)[0] != 0 {
                pixels.push((y as usize, x as usize));
            }
        }
    }

    pixels
}

/// Median grayscale value of an image (mean of the two middle values for even counts)
pub fn median_intensity(image: &GrayImage) -> Option<f64> {
    let mut values: Vec<u8> = image.as_raw().clone();
    if values.is_empty() {
        return None;
    }

    values.sort_unstable();
    let mid = values.len() / 2;

    if values.len() % 2 == 1 {
        Some(values[mid] as f64)
    } else {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    }
}

/// Round half to even, the way the profile coordinates are snapped to pixels
#[inline]
pub fn round_to_grid(value: f64) -> isize {
    value.round_ties_even() as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_background() {
        let mut mask = GrayImage::new(3, 2);
        set_foreground(&mut mask, (1, 2));

        assert!(is_foreground(&mask, 1, 2));
        assert!(!is_foreground(&mask, 0, 0));
        assert!(!is_foreground(&mask, -1, 2));
        assert!(!is_foreground(&mask, 1, 3));
        assert!(!is_foreground(&mask, 2, 0));
    }

    #[test]
    fn foreground_pixels_are_row_major() {
        let mut mask = GrayImage::new(4, 4);
        set_foreground(&mut mask, (2, 0));
        set_foreground(&mut mask, (0, 3));
        set_foreground(&mut mask, (2, 1));

        assert_eq!(foreground_pixels(&mask), vec![(0, 3), (2, 0), (2, 1)]);
    }

    #[test]
    fn median_of_even_count_averages_middle_values() {
        let image = GrayImage::from_raw(2, 2, vec![10, 40, 20, 30]).unwrap();
        assert_eq!(median_intensity(&image), Some(25.0));

        let image = GrayImage::from_raw(3, 1, vec![9, 1, 5]).unwrap();
        assert_eq!(median_intensity(&image), Some(5.0));

        assert_eq!(median_intensity(&GrayImage::new(0, 0)), None);
    }

    #[test]
    fn grid_rounding_matches_half_to_even() {
        assert_eq!(round_to_grid(2.5), 2);
        assert_eq!(round_to_grid(3.5), 4);
        assert_eq!(round_to_grid(-0.5), 0);
        assert_eq!(round_to_grid(-1.6), -2);
    }
}
