use std::{
    fs::OpenOptions,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use image::{RgbaImage, codecs::png::PngEncoder};

use crate::{
    assets::decode::{BaseImage, decode_base_image, decode_rgba8},
    foundation::config::StoreConfig,
    foundation::error::{CampaignError, CampaignResult},
};

/// File name of every rendered variant inside its ratio directory.
pub const OUTPUT_FILE_NAME: &str = "campaign_asset.png";
/// Key of the brand logo inside the input directory.
pub const LOGO_KEY: &str = "logo";

/// Filesystem-backed store for uploads, the logo and rendered variants.
///
/// Layout:
/// - `<input>/<product>.png` and `<input>/logo.png`
/// - `<output>/<product>/<folder>/<ratio>/campaign_asset.png`
#[derive(Clone, Debug)]
pub struct AssetStore {
    config: StoreConfig,
}

impl AssetStore {
    /// Create a store rooted at the configured directories. Nothing is touched on disk.
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Path of the uploaded asset for `key`.
    pub fn input_path(&self, key: &str) -> PathBuf {
        self.config.input_dir.join(format!("{key}.png"))
    }

    /// Path of the brand logo.
    pub fn logo_path(&self) -> PathBuf {
        self.input_path(LOGO_KEY)
    }

    /// Directory holding one rendered variant.
    pub fn output_dir(&self, product: &str, folder: &str, ratio: &str) -> PathBuf {
        self.config.output_dir.join(product).join(folder).join(ratio)
    }

    /// Load and decode the uploaded asset for `key`.
    ///
    /// Returns [`CampaignError::NotFound`] when no file exists, so callers can fall back to
    /// generation.
    pub fn load_input(&self, key: &str) -> CampaignResult<BaseImage> {
        let path = self.input_path(key);
        let bytes = read_existing(&path)?;
        decode_base_image(&bytes).map_err(|e| match e {
            CampaignError::Decode(msg) => {
                CampaignError::decode(format!("'{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Load the brand logo if one is present and decodable.
    ///
    /// Absence is expected and logged at debug level; a corrupt logo is logged as a warning.
    /// Neither is an error for the caller.
    pub fn load_logo(&self) -> Option<RgbaImage> {
        let path = self.logo_path();
        let bytes = match read_existing(&path) {
            Ok(bytes) => bytes,
            Err(CampaignError::NotFound(_)) => {
                tracing::debug!(path = %path.display(), "no logo asset, skipping logo overlay");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read logo");
                return None;
            }
        };
        match decode_rgba8(&bytes) {
            Ok(logo) => Some(logo),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not decode logo");
                None
            }
        }
    }

    /// Persist uploaded bytes as the input asset for `key`, replacing any previous upload.
    pub fn save_upload(&self, bytes: &[u8], key: &str) -> CampaignResult<PathBuf> {
        validate_product_key(key)?;
        let dir = &self.config.input_dir;
        std::fs::create_dir_all(dir).map_err(|e| CampaignError::io(dir, e))?;

        let path = self.input_path(key);
        std::fs::write(&path, bytes).map_err(|e| CampaignError::io(&path, e))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "saved uploaded asset");
        Ok(path)
    }

    /// Encode `raster` as PNG under its variant directory.
    ///
    /// The directory is created on demand. An existing file is never replaced: the write fails
    /// with [`CampaignError::Io`] instead.
    pub fn save_output(
        &self,
        raster: &RgbaImage,
        product: &str,
        folder: &str,
        ratio: &str,
    ) -> CampaignResult<PathBuf> {
        validate_product_key(product)?;
        let dir = self.output_dir(product, folder, ratio);
        std::fs::create_dir_all(&dir).map_err(|e| CampaignError::io(&dir, e))?;

        let path = dir.join(OUTPUT_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| CampaignError::io(&path, e))?;

        if let Err(e) = write_png(file, raster, &path) {
            std::fs::remove_file(&path).ok();
            return Err(e);
        }

        tracing::info!(path = %path.display(), "saved variant");
        Ok(path)
    }
}

fn read_existing(path: &Path) -> CampaignResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CampaignError::NotFound(path.to_path_buf())
        } else {
            CampaignError::io(path, e)
        }
    })
}

fn write_png(file: std::fs::File, raster: &RgbaImage, path: &Path) -> CampaignResult<()> {
    let mut w = BufWriter::new(file);
    raster
        .write_with_encoder(PngEncoder::new(&mut w))
        .map_err(|e| {
            CampaignError::Other(
                anyhow::Error::new(e).context(format!("encode png '{}'", path.display())),
            )
        })?;
    w.flush().map_err(|e| CampaignError::io(path, e))
}

/// Check that a product name is usable as a single path component.
///
/// Rejects empty names, path separators, `.`/`..`, leading dots, and control characters.
pub fn validate_product_key(key: &str) -> CampaignResult<()> {
    if key.trim().is_empty() {
        return Err(CampaignError::invalid_key("product name must be non-empty"));
    }
    if key.contains(['/', '\\']) {
        return Err(CampaignError::invalid_key(format!(
            "product name '{key}' must not contain path separators"
        )));
    }
    if key.starts_with('.') {
        return Err(CampaignError::invalid_key(format!(
            "product name '{key}' must not start with '.'"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(CampaignError::invalid_key(
            "product name must not contain control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
