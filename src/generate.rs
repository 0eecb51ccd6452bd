//! Image-generation collaborators used when a product has no uploaded photo.

use std::io::Cursor;

use image::{Rgba, RgbaImage};

use crate::{foundation::math::Fnv1a64, model::Product};

pub mod openai;

/// External text-to-image service. Returns encoded image bytes (PNG, JPEG, ...).
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>>;
}

/// Describe the product photo to synthesize for `product` in `region`.
pub fn product_prompt(product: &Product, region: &str) -> String {
    format!(
        "Professional product photography of {}, {} style. \
         Context: targeted for {} region. High resolution, photorealistic, clean lighting.",
        product.name, product.visual_style, region
    )
}

/// Offline generator producing a deterministic two-tone gradient seeded from the prompt.
///
/// Used for dry runs without API credentials.
#[derive(Clone, Copy, Debug)]
pub struct PlaceholderGenerator {
    pub width: u32,
    pub height: u32,
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl PlaceholderGenerator {
    pub fn render(&self, prompt: &str) -> RgbaImage {
        let mut h = Fnv1a64::new_default();
        h.write_bytes(prompt.as_bytes());
        let seed = h.finish().to_le_bytes();
        let top = [seed[0], seed[1], seed[2]];
        let bottom = [seed[3], seed[4], seed[5]];

        let span = self.height.saturating_sub(1).max(1) as f32;
        RgbaImage::from_fn(self.width, self.height, |_, y| {
            let t = y as f32 / span;
            let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
            Rgba([
                mix(top[0], bottom[0]),
                mix(top[1], bottom[1]),
                mix(top[2], bottom[2]),
                255,
            ])
        })
    }
}

impl ImageGenerator for PlaceholderGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("placeholder size must be non-zero");
        }
        let img = self.render(prompt);
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(buf)
    }
}
