//! Raster side of the pipeline: scale-to-fill compositing and brand overlays.

pub mod composite;
pub mod compositor;
pub mod overlay;
pub mod text;
