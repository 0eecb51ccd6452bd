#![forbid(unsafe_code)]
//! Turn a campaign brief into finished ad images at fixed social-media aspect ratios.
//!
//! Each product gets one base image (an uploaded photo, or a generated one when none exists),
//! which is scaled to fill every [`RatioSpec`], stamped with the brand logo and the campaign
//! message, and written under `output/<product>/<product>_<timestamp>/<ratio>/`.

pub mod assets;
pub mod compliance;
pub mod foundation;
pub mod generate;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod resolve;

pub use assets::{decode::BaseImage, store::AssetStore};
pub use compliance::ContentSafety;
pub use foundation::config::{ApiConfig, AppConfig, StoreConfig};
pub use foundation::error::{CampaignError, CampaignResult};
pub use generate::{ImageGenerator, PlaceholderGenerator, openai::OpenAiClient};
pub use model::{Brief, Product, RATIO_SPECS, RatioSpec};
pub use pipeline::{BriefReport, PipelineThreading, VariantPipeline};
pub use render::{
    compositor::Canvas,
    overlay::{LogoOutcome, OverlayRenderer},
    text::OverlayFont,
};
pub use resolve::{BaseImageResolver, BaseImageSource};
