use std::path::PathBuf;

use crate::foundation::error::{CampaignError, CampaignResult};

/// Default root for uploaded product photos and the brand logo.
pub const DEFAULT_INPUT_DIR: &str = "input";
/// Default root for rendered variants.
pub const DEFAULT_OUTPUT_DIR: &str = "output";
/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com";
/// Default image-generation model.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
/// Default chat model for the compliance check.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Filesystem roots injected into [`AssetStore`](crate::AssetStore).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding `<product>.png` uploads and `logo.png`.
    pub input_dir: PathBuf,
    /// Directory receiving `<product>/<folder>/<ratio>/campaign_asset.png`.
    pub output_dir: PathBuf,
}

impl StoreConfig {
    /// Build a config from explicit roots.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR)
    }
}

/// Credentials and model names for the hosted generation/compliance API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub image_model: String,
    pub chat_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

/// Full process configuration.
///
/// Values come from `CAMPAIGN_*` / `OPENAI_*` environment variables with defaults; the CLI
/// overrides individual fields from flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    /// Font used for the promotional text overlay.
    pub font_path: PathBuf,
    /// Worker count for the render pool; `None` lets rayon decide.
    pub threads: Option<usize>,
    pub api: ApiConfig,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> CampaignResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CampaignResult<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let input_dir = non_empty("CAMPAIGN_INPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));
        let output_dir = non_empty("CAMPAIGN_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let font_path = non_empty("CAMPAIGN_FONT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| input_dir.join("font.ttf"));

        let threads = match non_empty("CAMPAIGN_THREADS") {
            Some(raw) => {
                let n = raw.trim().parse::<usize>().map_err(|_| {
                    CampaignError::config(format!("CAMPAIGN_THREADS must be an integer, got '{raw}'"))
                })?;
                if n == 0 {
                    return Err(CampaignError::config("CAMPAIGN_THREADS must be > 0"));
                }
                Some(n)
            }
            None => None,
        };

        let defaults = ApiConfig::default();
        let api = ApiConfig {
            base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: non_empty("OPENAI_API_KEY"),
            image_model: non_empty("CAMPAIGN_IMAGE_MODEL").unwrap_or(defaults.image_model),
            chat_model: non_empty("CAMPAIGN_CHAT_MODEL").unwrap_or(defaults.chat_model),
        };

        Ok(Self {
            store: StoreConfig::new(input_dir, output_dir),
            font_path,
            threads,
            api,
        })
    }
}
