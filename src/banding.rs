// src/banding.rs - Profile filtering, binarization and resizing

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pass cap for the relaxation filter
pub const MAX_RELAXATION_PASSES: usize = 10_000;

/// Gaussian kernel half-width in standard deviations
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Label of one banding pattern position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    White,
    Black,
}

impl Band {
    /// Numeric tag used in exported patterns: white 0, black 1
    pub fn tag(self) -> u8 {
        match self {
            Band::White => 0,
            Band::Black => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Band::White),
            1 => Some(Band::Black),
            _ => None,
        }
    }
}

impl Serialize for Band {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.tag())
    }
}

impl<'de> Deserialize<'de> for Band {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = u8::deserialize(deserializer)?;
        Band::from_tag(tag)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid band tag {}", tag)))
    }
}

/// Format a banding pattern as space separated tags
pub fn format_bands(bands: &[Band]) -> String {
    bands
        .iter()
        .map(|band| band.tag().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1D Gaussian convolution with mirrored borders (`d c b a | a b c d`)
///
/// The kernel reaches `int(4 * sigma + 0.5)` samples to each side and is
/// normalized to unit sum. A non-positive sigma returns the input unchanged.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 || values.is_empty() {
        return values.to_vec();
    }

    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);

    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, offset)| w * values[reflect_index(i + offset, n)])
                .sum()
        })
        .collect()
}

fn reflect_index(index: isize, len: isize) -> usize {
    let period = 2 * len;
    let m = index.rem_euclid(period);
    if m < len {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Iteratively shrink every value towards the closer of its neighbourhood extremes
///
/// Each pass moves a value by the smaller of `max - value` and `value - min` over
/// its 3-neighbourhood, divided by a radius that starts at 2 and drops to 1. The
/// filter stops at the first pass that leaves the sequence bit-identical.
pub fn relaxation_filter(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut current = values.to_vec();
    let mut radius = 2.0;

    for _ in 0..MAX_RELAXATION_PASSES {
        let next: Vec<f64> = (0..n)
            .map(|i| {
                let value = current[i];
                let prev = if i == 0 { value } else { current[i - 1] };
                let succ = if i + 1 == n { value } else { current[i + 1] };

                let min = prev.min(value).min(succ);
                let max = prev.max(value).max(succ);
                let dif_min = value - min;
                let dif_max = max - value;

                if dif_max <= dif_min {
                    value + dif_max / radius
                } else {
                    value - dif_min / radius
                }
            })
            .collect();

        radius = f64::max(radius - 1.0, 1.0);
        if next == current {
            return next;
        }
        current = next;
    }

    log::warn!(
        "Relaxation filter did not settle after {} passes",
        MAX_RELAXATION_PASSES
    );
    current
}

/// Gaussian smoothing followed by the relaxation filter
///
/// # Returns
/// Tuple of (filtered, smoothed) profiles
pub fn filter_profile(raw: &[f64], sigma: f64) -> (Vec<f64>, Vec<f64>) {
    let smooth = gaussian_smooth(raw, sigma);
    let filtered = relaxation_filter(&smooth);
    (filtered, smooth)
}

/// Tag falling stretches black and rising stretches white
///
/// Flat steps keep the previous tag. Everything before the first change takes the
/// tag opposite to that change's, so the sequence never opens on a guessed label.
pub fn mark_monotonic_runs(values: &[f64]) -> Vec<Band> {
    let mut bands = Vec::with_capacity(values.len());
    let mut current = Band::White;
    let mut first_band = true;

    for (i, &value) in values.iter().enumerate() {
        let diff = if i == 0 { 0.0 } else { values[i - 1] - value };

        if diff > 0.0 {
            current = Band::Black;
            if first_band {
                bands.iter_mut().for_each(|b| *b = Band::White);
                first_band = false;
            }
        } else if diff < 0.0 {
            current = Band::White;
            if first_band {
                bands.iter_mut().for_each(|b| *b = Band::Black);
                first_band = false;
            }
        }

        bands.push(current);
    }

    bands
}

/// Maximal runs of `true` as (start, length)
pub fn cluster_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;

    while i < mask.len() {
        if mask[i] {
            let start = i;
            while i < mask.len() && mask[i] {
                i += 1;
            }
            runs.push((start, i - start));
        } else {
            i += 1;
        }
    }

    runs
}

/// Binarize a filtered profile into black and white bands
///
/// Forward and backward scans are compared; where they disagree (saddle points)
/// the first half of the disputed run takes the band before it and the second
/// half the band after it.
pub fn binarize(values: &[f64]) -> Vec<Band> {
    let forward = mark_monotonic_runs(values);

    let reversed: Vec<f64> = values.iter().rev().copied().collect();
    let mut backward = mark_monotonic_runs(&reversed);
    backward.reverse();

    let disagreement: Vec<bool> = forward
        .iter()
        .zip(&backward)
        .map(|(f, b)| f != b)
        .collect();

    let mut bands = backward.clone();
    for (start, len) in cluster_runs(&disagreement) {
        let before = start.checked_sub(1).map(|i| backward[i]);
        let after = backward.get(start + len).copied();
        let half = len / 2;

        if let Some(band) = before.or(after) {
            bands[start..start + half].fill(band);
        }
        if let Some(band) = after.or(before) {
            bands[start + half..start + len].fill(band);
        }
    }

    bands
}

/// Linearly resample a profile to `new_length` values, rounding half to even
///
/// Source samples sit on `linspace(0, L, L)` and are read at `linspace(0, L, N)`.
pub fn resize_profile(values: &[f64], new_length: usize) -> Vec<f64> {
    let len = values.len();
    if new_length == 0 || len == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![values[0].round_ties_even(); new_length];
    }

    let span = len as f64;
    let source_x = |k: usize| k as f64 * span / (len - 1) as f64;

    (0..new_length)
        .map(|j| {
            let x = if new_length == 1 {
                0.0
            } else {
                j as f64 * span / (new_length - 1) as f64
            };

            let k = ((x / source_x(1)) as usize).min(len - 2);
            let (x0, x1) = (source_x(k), source_x(k + 1));
            let frac = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
            (values[k] + (values[k + 1] - values[k]) * frac).round_ties_even()
        })
        .collect()
}

/// Resize a banding pattern to a fixed length
pub fn resize_banding_pattern(bands: &[Band], new_length: usize) -> Vec<Band> {
    let values: Vec<f64> = bands.iter().map(|b| b.tag() as f64).collect();
    resize_profile(&values, new_length)
        .into_iter()
        .map(|v| if v >= 0.5 { Band::Black } else { Band::White })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use Band::{Black as B, White as W};

    #[test]
    fn zero_sigma_is_identity() {
        let values = vec![1.0, 5.0, 2.0];
        assert_eq!(gaussian_smooth(&values, 0.0), values);
    }

    #[test]
    fn gaussian_preserves_constants_and_symmetry() {
        for v in gaussian_smooth(&[7.0; 6], 2.0) {
            assert_approx_eq!(v, 7.0, 1e-12);
        }

        let smooth = gaussian_smooth(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], 1.0);
        assert_approx_eq!(smooth[2], smooth[4], 1e-12);
        assert_approx_eq!(smooth[1], smooth[5], 1e-12);
        assert!(smooth[3] > smooth[2] && smooth[2] > smooth[1]);
        assert_approx_eq!(smooth.iter().sum::<f64>(), 1.0, 1e-9);
    }

    #[test]
    fn reflection_mirrors_edge_samples() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(-5, 2), 1);
    }

    #[test]
    fn relaxation_output_is_a_fixed_point() {
        let raw = [12.0, 30.5, 28.0, 90.0, 91.0, 40.0, 12.0, 15.0, 60.0, 58.5, 61.0];
        let once = relaxation_filter(&raw);
        assert_eq!(relaxation_filter(&once), once);
        assert_eq!(once.len(), raw.len());
    }

    #[test]
    fn relaxation_keeps_plateaus() {
        let raw = [50.0, 50.0, 200.0, 200.0, 50.0, 50.0];
        assert_eq!(relaxation_filter(&raw), raw.to_vec());
    }

    #[test]
    fn monotonic_runs_retag_the_opening() {
        let profile = [50.0, 50.0, 200.0, 200.0, 50.0, 50.0, 200.0];
        assert_eq!(mark_monotonic_runs(&profile), vec![B, B, W, W, B, B, W]);

        let profile = [9.0, 9.0, 3.0];
        assert_eq!(mark_monotonic_runs(&profile), vec![W, W, B]);

        assert_eq!(mark_monotonic_runs(&[4.0, 4.0]), vec![W, W]);
    }

    #[test]
    fn runs_are_clustered() {
        let mask = [true, false, true, true, false, false, true];
        assert_eq!(cluster_runs(&mask), vec![(0, 1), (2, 2), (6, 1)]);
        assert!(cluster_runs(&[false, false]).is_empty());
    }

    #[test]
    fn saddle_is_split_between_flanking_bands() {
        // the plateau at 3 is falling for the backward scan and rising for the forward one
        let profile = [1.0, 3.0, 3.0, 5.0];
        assert_eq!(binarize(&profile), vec![B, B, W, W]);
    }

    #[test]
    fn binarization_labels_every_position() {
        let profile = relaxation_filter(&gaussian_smooth(
            &[80.0, 75.0, 60.0, 60.0, 110.0, 140.0, 141.0, 90.0, 70.0, 72.0, 150.0, 150.0],
            1.0,
        ));
        let bands = binarize(&profile);
        assert_eq!(bands.len(), profile.len());
        assert!(bands.iter().all(|b| matches!(b, Band::Black | Band::White)));
    }

    #[test]
    fn resize_to_same_length_is_identity() {
        let bands = vec![B, B, W, B, W, W, W];
        assert_eq!(resize_banding_pattern(&bands, bands.len()), bands);

        let resized = resize_banding_pattern(&bands, 20);
        assert_eq!(resized.len(), 20);
        assert_eq!(resize_banding_pattern(&resized, 20), resized);
    }

    #[test]
    fn resize_keeps_the_ends() {
        let bands = vec![B, W, W, W, B];
        let resized = resize_banding_pattern(&bands, 11);
        assert_eq!(resized.first(), Some(&B));
        assert_eq!(resized.last(), Some(&B));
        assert_eq!(resize_banding_pattern(&bands, 0), vec![]);
        assert_eq!(resize_banding_pattern(&[W], 3), vec![W, W, W]);
    }

    #[test]
    fn band_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&vec![B, W]).unwrap(), "[1,0]");
        let parsed: Vec<Band> = serde_json::from_str("[0,1]").unwrap();
        assert_eq!(parsed, vec![W, B]);
        assert!(serde_json::from_str::<Band>("2").is_err());
        assert_eq!(format_bands(&[B, W, B]), "1 0 1");
    }
}
