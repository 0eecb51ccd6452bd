use image::{Rgba, RgbaImage};

use crate::{
    assets::decode::BaseImage,
    foundation::error::{CampaignError, CampaignResult},
    model::RatioSpec,
    render::composite::{DestRect, draw_image_over, premultiply_rgba8_in_place},
};

/// Background every canvas starts from.
pub const BACKGROUND_RGBA: [u8; 4] = [255, 255, 255, 255];

/// Absorbs binary floating-point error before truncating scaled sizes, so e.g.
/// `1000 * (1920 / 1000)` lands on 1920 rather than 1919.
const FLOOR_EPSILON: f64 = 1e-9;

/// Output raster for one (product, ratio) variant.
///
/// Pixels are always opaque, so straight and premultiplied RGBA coincide.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    /// Allocate a `width x height` canvas filled with [`BACKGROUND_RGBA`].
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(BACKGROUND_RGBA)),
        }
    }

    #[cfg(test)]
    pub(crate) fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }
}

/// Scale-to-fill geometry of a source image on a target canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left corner; negative values crop the overflow symmetrically.
    pub x: i64,
    pub y: i64,
}

impl Placement {
    pub fn dest_rect(&self) -> DestRect {
        DestRect {
            x: self.x,
            y: self.y,
            width: self.scaled_width,
            height: self.scaled_height,
        }
    }
}

/// Compute the scale-to-fill placement of a `src_width x src_height` image on `target`.
///
/// `scale = max(tw / sw, th / sh)`; scaled sizes are truncated; offsets are
/// `(target - scaled) / 2` truncated toward zero.
pub fn fill_placement(
    src_width: u32,
    src_height: u32,
    target: &RatioSpec,
) -> CampaignResult<Placement> {
    if src_width == 0 || src_height == 0 {
        return Err(CampaignError::invalid_image(format!(
            "base image has zero size ({src_width}x{src_height})"
        )));
    }
    target.validate()?;

    let tw = f64::from(target.width);
    let th = f64::from(target.height);
    let scale = (tw / f64::from(src_width)).max(th / f64::from(src_height));

    let scaled_width = scaled_len(src_width, scale)?;
    let scaled_height = scaled_len(src_height, scale)?;

    Ok(Placement {
        scale,
        scaled_width,
        scaled_height,
        x: (i64::from(target.width) - i64::from(scaled_width)) / 2,
        y: (i64::from(target.height) - i64::from(scaled_height)) / 2,
    })
}

fn scaled_len(len: u32, scale: f64) -> CampaignResult<u32> {
    let v = (f64::from(len) * scale + FLOOR_EPSILON).floor();
    if !v.is_finite() || v > f64::from(u32::MAX) {
        return Err(CampaignError::invalid_image(format!(
            "scaled size {v} is out of range"
        )));
    }
    Ok(v as u32)
}

/// Render `base` onto a fresh white canvas of `target` size, scaled to fill and centred.
///
/// The base image is never modified; repeated calls with the same inputs produce identical
/// pixels.
pub fn render(base: &BaseImage, target: &RatioSpec) -> CampaignResult<Canvas> {
    let placement = fill_placement(base.width(), base.height(), target)?;
    tracing::debug!(
        ratio = target.name,
        scale = placement.scale,
        scaled_width = placement.scaled_width,
        scaled_height = placement.scaled_height,
        x = placement.x,
        y = placement.y,
        "placing base image"
    );

    let mut canvas = Canvas::blank(target.width, target.height);
    let src = premultiplied(base.pixels());
    draw_image_over(canvas.pixels_mut(), &src, placement.dest_rect())?;
    Ok(canvas)
}

pub(crate) fn premultiplied(src: &RgbaImage) -> RgbaImage {
    let mut out = src.clone();
    premultiply_rgba8_in_place(&mut out);
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
