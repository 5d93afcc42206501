//! Equirectangular standardisation of panorama photos.
//!
//! Phone panoramas are wider than 2:1 and cover less than the full vertical
//! field. The photo is padded with black rows above and below so that it
//! becomes exactly 2:1, splitting the padding according to where the horizon
//! sits: a low horizon gets more padding below, a high one more above. The
//! left and right edge strips are blended 50/50 beforehand so the wrap-around
//! seam is less visible on the sphere.

use image::{Rgb, RgbImage};
use serde::Serialize;

pub const DEFAULT_STRIP_WIDTH: u32 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadError {
    EmptyImage,
    /// The photo is already taller than 2:1 allows.
    TooTall { height: u32, target: u32 },
    StripTooWide { strip: u32, width: u32 },
    HorizonOutOfRange { horizon_y: u32, height: u32 },
}

impl std::fmt::Display for PadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PadError::EmptyImage => write!(f, "image has no pixels"),
            PadError::TooTall { height, target } => write!(
                f,
                "image is already taller ({height}px) than the 2:1 target ({target}px)"
            ),
            PadError::StripTooWide { strip, width } => write!(
                f,
                "seam strip of {strip}px does not fit twice into an image {width}px wide"
            ),
            PadError::HorizonOutOfRange { horizon_y, height } => {
                write!(f, "horizon y={horizon_y} is outside an image {height}px tall")
            }
        }
    }
}

impl std::error::Error for PadError {}

/// Rows added above and below the photo.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Padding {
    pub pad_above: u32,
    pub pad_below: u32,
    /// Height of the padded image (`width / 2`).
    pub height: u32,
}

/// Mean of the clicked horizon rows, truncated to a pixel row.
pub fn average_horizon(points: &[f64]) -> Option<u32> {
    let finite: Vec<f64> = points.iter().copied().filter(|y| y.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    Some(mean.max(0.0) as u32)
}

pub fn equirect_padding(width: u32, height: u32, horizon_y: u32) -> Result<Padding, PadError> {
    if width == 0 || height == 0 {
        return Err(PadError::EmptyImage);
    }
    if horizon_y > height {
        return Err(PadError::HorizonOutOfRange { horizon_y, height });
    }
    let target = width / 2;
    let total = target
        .checked_sub(height)
        .ok_or(PadError::TooTall { height, target })?;

    let pad_below = (u64::from(total) * u64::from(horizon_y) / u64::from(height)) as u32;
    Ok(Padding {
        pad_above: total - pad_below,
        pad_below,
        height: target,
    })
}

/// Replaces both edge strips with their 50/50 blend, column by column.
pub fn blend_seam(img: &mut RgbImage, strip: u32) -> Result<(), PadError> {
    let (width, height) = img.dimensions();
    if strip.saturating_mul(2) > width {
        return Err(PadError::StripTooWide { strip, width });
    }
    let right_start = width - strip;
    for y in 0..height {
        for x in 0..strip {
            let left = *img.get_pixel(x, y);
            let right = *img.get_pixel(right_start + x, y);
            let blended = Rgb([
                mix(left[0], right[0]),
                mix(left[1], right[1]),
                mix(left[2], right[2]),
            ]);
            img.put_pixel(x, y, blended);
            img.put_pixel(right_start + x, y, blended);
        }
    }
    Ok(())
}

pub fn pad_to_equirectangular(
    img: &RgbImage,
    horizon_y: u32,
) -> Result<(RgbImage, Padding), PadError> {
    let (width, height) = img.dimensions();
    let padding = equirect_padding(width, height, horizon_y)?;
    let mut out = RgbImage::new(width, padding.height);
    image::imageops::replace(&mut out, img, 0, i64::from(padding.pad_above));
    Ok((out, padding))
}

fn mix(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b) + 1) / 2) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn low_horizon_pads_more_below() {
        // 4000x1000 -> 4000x2000, 1000 rows of padding; horizon at 75%.
        let p = equirect_padding(4000, 1000, 750).expect("pads");
        assert_eq!(
            p,
            Padding {
                pad_above: 250,
                pad_below: 750,
                height: 2000
            }
        );
    }

    #[test]
    fn already_two_to_one_needs_no_padding() {
        let p = equirect_padding(200, 100, 40).expect("pads");
        assert_eq!((p.pad_above, p.pad_below, p.height), (0, 0, 100));
    }

    #[test]
    fn rejects_tall_images_and_bad_horizons() {
        assert_eq!(
            equirect_padding(100, 60, 10),
            Err(PadError::TooTall {
                height: 60,
                target: 50
            })
        );
        assert!(matches!(
            equirect_padding(100, 20, 21),
            Err(PadError::HorizonOutOfRange { .. })
        ));
        assert_eq!(equirect_padding(0, 0, 0), Err(PadError::EmptyImage));
    }

    #[test]
    fn seam_strips_are_blended_evenly() {
        let mut img = RgbImage::new(10, 2);
        for y in 0..2 {
            for x in 0..10 {
                let v = if x < 5 { 0 } else { 200 };
                img.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        blend_seam(&mut img, 3).expect("fits");
        assert_eq!(img.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(img.get_pixel(9, 1), &Rgb([100, 100, 100]));
        // Untouched middle.
        assert_eq!(img.get_pixel(4, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(5, 0), &Rgb([200, 200, 200]));

        assert_eq!(
            blend_seam(&mut img, 6),
            Err(PadError::StripTooWide { strip: 6, width: 10 })
        );
    }

    #[test]
    fn padded_image_places_photo_after_top_padding() {
        let img = RgbImage::from_pixel(8, 2, Rgb([255, 0, 0]));
        let (out, p) = pad_to_equirectangular(&img, 1).expect("pads");
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!((p.pad_above, p.pad_below), (1, 1));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(0, 1), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(7, 2), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(7, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn horizon_average_truncates() {
        assert_eq!(average_horizon(&[100.0, 101.0, 103.0]), Some(101));
        assert_eq!(average_horizon(&[]), None);
        assert_eq!(average_horizon(&[f64::NAN]), None);
    }
}
