use std::collections::BTreeSet;

use crate::{
    assets::store::validate_product_key,
    foundation::error::{CampaignError, CampaignResult},
};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String, // also the input/output filesystem key
    pub visual_style: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub campaign_name: String,
    pub products: Vec<Product>, // processed in order
    pub target_region: String,
    #[serde(default)]
    pub target_audience: String,
    pub campaign_message: String,
}

/// One output aspect ratio: a directory name plus canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RatioSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl RatioSpec {
    pub const SQUARE: Self = Self {
        name: "1-1",
        width: 1080,
        height: 1080,
    };
    pub const PORTRAIT: Self = Self {
        name: "9-16",
        width: 1080,
        height: 1920,
    };
    pub const LANDSCAPE: Self = Self {
        name: "16-9",
        width: 1920,
        height: 1080,
    };

    pub fn validate(&self) -> CampaignResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CampaignError::invalid_image(format!(
                "ratio '{}' must have width/height > 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// The fixed set of variants rendered for every product, in output order.
pub const RATIO_SPECS: [RatioSpec; 3] = [RatioSpec::SQUARE, RatioSpec::PORTRAIT, RatioSpec::LANDSCAPE];

impl Brief {
    pub fn validate(&self) -> CampaignResult<()> {
        let mut seen = BTreeSet::new();
        for product in &self.products {
            validate_product_key(&product.name)?;
            if !seen.insert(product.name.as_str()) {
                return Err(CampaignError::invalid_key(format!(
                    "product '{}' appears more than once in the brief",
                    product.name
                )));
            }
        }
        Ok(())
    }
}
