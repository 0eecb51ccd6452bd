use std::sync::Arc;

use image::RgbaImage;

use crate::foundation::error::{CampaignError, CampaignResult};

/// Resolved product image, shared read-only across every ratio variant of one product.
#[derive(Clone, Debug)]
pub struct BaseImage {
    pixels: Arc<RgbaImage>,
}

impl BaseImage {
    /// Wrap an owned straight-alpha RGBA8 raster.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrow the underlying raster.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Decode encoded image bytes (PNG, JPEG, ...) into a [`BaseImage`].
pub fn decode_base_image(bytes: &[u8]) -> CampaignResult<BaseImage> {
    decode_rgba8(bytes).map(BaseImage::new)
}

/// Decode encoded image bytes into straight-alpha RGBA8.
pub fn decode_rgba8(bytes: &[u8]) -> CampaignResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| CampaignError::decode(format!("decode image from memory: {e}")))?;
    Ok(dyn_img.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
