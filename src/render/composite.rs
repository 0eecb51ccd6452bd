use std::sync::Arc;

use image::RgbaImage;
use vello_cpu::kurbo::Affine;

use crate::foundation::{
    error::{CampaignError, CampaignResult},
    math::mul_div255,
};

pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied RGBA8.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> CampaignResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CampaignError::invalid_image(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Destination rectangle in canvas pixels. The origin may be negative or the extent may
/// overflow the canvas; everything outside is clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Paint `src` (premultiplied) scaled into `rect` and blend it over `dst`.
///
/// The image is sampled bilinearly by `vello_cpu` and clipped to `dst`, so large overflowing
/// rectangles cost no more than the canvas itself. `dst` must hold opaque pixels, for which
/// straight and premultiplied encodings coincide.
pub fn draw_image_over(dst: &mut RgbaImage, src: &RgbaImage, rect: DestRect) -> CampaignResult<()> {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return Err(CampaignError::invalid_image("source image has zero size"));
    }
    if rect.width == 0 || rect.height == 0 {
        return Ok(());
    }

    let (dw, dh) = dst.dimensions();
    let w: u16 = dw
        .try_into()
        .map_err(|_| CampaignError::invalid_image("canvas width exceeds u16"))?;
    let h: u16 = dh
        .try_into()
        .map_err(|_| CampaignError::invalid_image("canvas height exceeds u16"))?;

    let visible_x = rect.x < i64::from(dw) && rect.x + i64::from(rect.width) > 0;
    let visible_y = rect.y < i64::from(dh) && rect.y + i64::from(rect.height) > 0;
    if !visible_x || !visible_y {
        return Ok(());
    }

    let pixmap = premul_bytes_to_pixmap(src.as_raw(), sw, sh)?;
    let paint = vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    };

    let transform = Affine::translate((rect.x as f64, rect.y as f64))
        * Affine::scale_non_uniform(
            f64::from(rect.width) / f64::from(sw),
            f64::from(rect.height) / f64::from(sh),
        );

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_transform(transform);
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(sw), f64::from(sh)));
    ctx.flush();

    let mut layer = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut layer);
    let dst: &mut [u8] = dst;
    over_in_place(dst, layer.data_as_u8_slice(), 1.0)
}

/// Wrap premultiplied RGBA8 bytes in a `vello_cpu` pixmap.
pub fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> CampaignResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| CampaignError::invalid_image("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CampaignError::invalid_image("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(CampaignError::invalid_image("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
