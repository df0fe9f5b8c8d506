use image::{GrayImage, Luma};

/// Binary mask with the given (row, column) pixels set
pub fn mask_from_pixels(width: u32, height: u32, pixels: &[(usize, usize)]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for &(row, col) in pixels {
        mask.put_pixel(col as u32, row as u32, Luma([255]));
    }
    mask
}

/// Uniform grayscale image
pub fn uniform(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Skeleton, blob mask and image of a 3 pixel wide vertical bar over rows 3..=12
/// of a 7x16 image. Bands are 2 rows high, dark (50) first, then bright (200).
pub fn banded_bar() -> (GrayImage, GrayImage, GrayImage) {
    let skeleton = mask_from_pixels(7, 16, &(3..=12).map(|r| (r, 3)).collect::<Vec<_>>());

    let mut blobs = GrayImage::new(7, 16);
    let mut image = uniform(7, 16, 255);
    for row in 3..=12u32 {
        let value = if ((row - 3) / 2) % 2 == 0 { 50 } else { 200 };
        for col in 2..=4u32 {
            blobs.put_pixel(col, row, Luma([255]));
            image.put_pixel(col, row, Luma([value]));
        }
    }

    (skeleton, blobs, image)
}

/// Y-shaped skeleton: a stem down column 5 forking at (5, 5) into two diagonal arms
pub fn y_skeleton() -> GrayImage {
    let mut pixels: Vec<(usize, usize)> = (2..=5).map(|r| (r, 5)).collect();
    for k in 0..5 {
        pixels.push((6 + k, 4 - k));
        pixels.push((6 + k, 6 + k));
    }
    mask_from_pixels(12, 12, &pixels)
}

/// Grayscale chromosome: a `chromosome_width` wide vertical strip on a white
/// background, alternating dark (60) and light (180) bands of `band_height` rows
pub fn striped_chromosome(
    width: u32,
    height: u32,
    chromosome_width: u32,
    margin: u32,
    band_height: u32,
) -> GrayImage {
    let mut image = uniform(width, height, 255);
    let left = (width - chromosome_width) / 2;

    for row in margin..height - margin {
        let value = if ((row - margin) / band_height) % 2 == 0 { 60 } else { 180 };
        for col in left..left + chromosome_width {
            image.put_pixel(col, row, Luma([value]));
        }
    }

    image
}
