use std::path::PathBuf;

/// Convenience result type used across the pipeline.
pub type CampaignResult<T> = Result<T, CampaignError>;

/// Failure taxonomy for asset resolution, rendering and persistence.
#[derive(thiserror::Error, Debug)]
pub enum CampaignError {
    /// An input asset does not exist. Triggers the generation fallback.
    #[error("asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The image-generation collaborator failed or returned unusable data.
    #[error("generation error: {0}")]
    Generation(String),

    /// Bytes could not be decoded as a raster image.
    #[error("decode error: {0}")]
    Decode(String),

    /// A raster violates a geometric invariant (e.g. zero width).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A product name cannot be used as a filesystem key.
    #[error("invalid product key: {0}")]
    InvalidKey(String),

    /// Font loading, text layout or glyph drawing failed.
    #[error("text error: {0}")]
    Text(String),

    /// Invalid runtime configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem create/read/write failure.
    #[error("io error at '{}': {source}", path.display())]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CampaignError {
    /// Build a [`CampaignError::Generation`] value.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Build a [`CampaignError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`CampaignError::InvalidImage`] value.
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Build a [`CampaignError::InvalidKey`] value.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Build a [`CampaignError::Text`] value.
    pub fn text(msg: impl Into<String>) -> Self {
        Self::Text(msg.into())
    }

    /// Build a [`CampaignError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`CampaignError::Io`] value for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error only signals a missing input asset.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
