use std::sync::Arc;

use crate::{
    assets::{
        decode::{BaseImage, decode_base_image},
        store::AssetStore,
    },
    foundation::error::{CampaignError, CampaignResult},
    generate::{ImageGenerator, product_prompt},
    model::Product,
};

/// Where a resolved base image came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseImageSource {
    /// Uploaded product photo.
    Existing,
    /// Synthesized by the image-generation collaborator.
    Generated,
}

/// Picks the base image for a product: the uploaded photo when present, otherwise a
/// generated one.
#[derive(Clone)]
pub struct BaseImageResolver {
    store: Arc<AssetStore>,
    generator: Arc<dyn ImageGenerator>,
}

impl BaseImageResolver {
    pub fn new(store: Arc<AssetStore>, generator: Arc<dyn ImageGenerator>) -> Self {
        Self { store, generator }
    }

    /// Resolve the base image for `product`.
    ///
    /// The uploaded photo is returned unchanged. Only a missing upload triggers generation,
    /// which is attempted exactly once; a corrupt upload is reported rather than replaced.
    #[tracing::instrument(skip(self, product), fields(product = %product.name))]
    pub fn resolve(
        &self,
        product: &Product,
        region: &str,
    ) -> CampaignResult<(BaseImage, BaseImageSource)> {
        match self.store.load_input(&product.name) {
            Ok(image) => {
                tracing::info!(
                    width = image.width(),
                    height = image.height(),
                    "loaded existing asset"
                );
                Ok((image, BaseImageSource::Existing))
            }
            Err(CampaignError::NotFound(_)) => {
                tracing::info!("no existing asset, generating base image");
                let image = self.generate(product, region)?;
                Ok((image, BaseImageSource::Generated))
            }
            Err(e) => Err(e),
        }
    }

    fn generate(&self, product: &Product, region: &str) -> CampaignResult<BaseImage> {
        let prompt = product_prompt(product, region);
        tracing::debug!(%prompt, "requesting generated image");

        let bytes = self
            .generator
            .generate(&prompt)
            .map_err(|e| CampaignError::generation(format!("{e:#}")))?;
        let image = decode_base_image(&bytes).map_err(|e| {
            CampaignError::generation(format!("generated image is not decodable: {e}"))
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CampaignError::generation("generated image has zero size"));
        }
        Ok(image)
    }
}
