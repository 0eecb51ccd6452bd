use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDateTime;
use image::RgbaImage;
use rayon::prelude::*;

use crate::{
    assets::{
        decode::BaseImage,
        store::{AssetStore, validate_product_key},
    },
    foundation::error::{CampaignError, CampaignResult},
    generate::ImageGenerator,
    model::{Brief, Product, RATIO_SPECS, RatioSpec},
    render::{compositor, overlay::OverlayRenderer},
    resolve::{BaseImageResolver, BaseImageSource},
};

/// Format of the per-run folder suffix, e.g. `2025-01-31_09-05-07`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Folder name grouping the variants of one product run: `<name>_<yyyy-MM-dd_HH-mm-ss>`.
pub fn timestamp_folder(product_name: &str, at: NaiveDateTime) -> String {
    format!("{product_name}_{}", at.format(TIMESTAMP_FORMAT))
}

#[derive(Clone, Debug)]
pub struct PipelineThreading {
    /// Fan products and ratios out on a rayon pool.
    pub parallel: bool,
    /// Pool size; `None` lets rayon pick.
    pub threads: Option<usize>,
}

impl Default for PipelineThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Result of rendering one (product, ratio) variant.
#[derive(Debug)]
pub struct VariantOutcome {
    pub ratio: &'static str,
    pub result: CampaignResult<PathBuf>,
}

/// Everything produced for one product.
#[derive(Debug)]
pub struct ProductReport {
    pub product: String,
    pub folder: String,
    pub source: BaseImageSource,
    pub variants: Vec<VariantOutcome>,
}

impl ProductReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &Path> {
        self.variants
            .iter()
            .filter_map(|v| v.result.as_ref().ok().map(PathBuf::as_path))
    }

    pub fn is_complete(&self) -> bool {
        self.variants.iter().all(|v| v.result.is_ok())
    }
}

#[derive(Debug)]
pub struct ProductOutcome {
    pub product: String,
    pub result: CampaignResult<ProductReport>,
}

#[derive(Debug)]
pub struct BriefReport {
    pub campaign: String,
    pub products: Vec<ProductOutcome>,
}

impl BriefReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &Path> {
        self.products
            .iter()
            .filter_map(|p| p.result.as_ref().ok())
            .flat_map(|report| report.artifacts())
    }

    /// Human-readable failure lines: `product: error` or `product/ratio: error`.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        for p in &self.products {
            match &p.result {
                Err(e) => out.push(format!("{}: {e}", p.product)),
                Ok(report) => {
                    for v in &report.variants {
                        if let Err(e) = &v.result {
                            out.push(format!("{}/{}: {e}", p.product, v.ratio));
                        }
                    }
                }
            }
        }
        out
    }

    pub fn is_success(&self) -> bool {
        self.products
            .iter()
            .all(|p| p.result.as_ref().is_ok_and(ProductReport::is_complete))
    }
}

/// Drives base-image resolution, compositing, overlays and persistence for every product of
/// a brief.
pub struct VariantPipeline {
    store: Arc<AssetStore>,
    resolver: BaseImageResolver,
    overlay: OverlayRenderer,
    ratios: Vec<RatioSpec>,
    pool: Option<rayon::ThreadPool>,
}

impl VariantPipeline {
    pub fn new(
        store: Arc<AssetStore>,
        generator: Arc<dyn ImageGenerator>,
        overlay: OverlayRenderer,
        threading: &PipelineThreading,
    ) -> CampaignResult<Self> {
        let pool = if threading.parallel {
            Some(build_thread_pool(threading.threads)?)
        } else {
            None
        };
        Ok(Self {
            resolver: BaseImageResolver::new(store.clone(), generator),
            store,
            overlay,
            ratios: RATIO_SPECS.to_vec(),
            pool,
        })
    }

    /// Replace the ratio set. Mostly useful to keep tests small.
    pub fn with_ratios(mut self, ratios: Vec<RatioSpec>) -> CampaignResult<Self> {
        for spec in &ratios {
            spec.validate()?;
        }
        self.ratios = ratios;
        Ok(self)
    }

    /// Run every product of `brief`. A failing product never aborts its siblings.
    ///
    /// An invalid product key fails that product only. A repeated product name fails every
    /// occurrence after the first, which would otherwise race on the same run folder.
    #[tracing::instrument(skip(self, brief), fields(campaign = %brief.campaign_name))]
    pub fn run_brief(&self, brief: &Brief) -> CampaignResult<BriefReport> {
        tracing::info!(products = brief.products.len(), "running campaign");

        let mut seen = BTreeSet::new();
        let jobs: Vec<(&Product, bool)> = brief
            .products
            .iter()
            .map(|product| (product, !seen.insert(product.name.as_str())))
            .collect();

        let products = self.fan_out(&jobs, |&(product, repeated)| {
            let result = if repeated {
                Err(CampaignError::invalid_key(format!(
                    "product '{}' appears more than once in the brief",
                    product.name
                )))
            } else {
                self.run_product(product, &brief.target_region, &brief.campaign_message)
            };
            if let Err(e) = &result {
                tracing::error!(product = %product.name, error = %e, "product failed");
            }
            ProductOutcome {
                product: product.name.clone(),
                result,
            }
        });
        Ok(BriefReport {
            campaign: brief.campaign_name.clone(),
            products,
        })
    }

    /// Render all variants for one product, stamping the run folder with the local time.
    pub fn run_product(
        &self,
        product: &Product,
        region: &str,
        message: &str,
    ) -> CampaignResult<ProductReport> {
        let now = chrono::Local::now().naive_local();
        self.run_product_at(product, region, message, now)
    }

    /// Render all variants for one product into the folder derived from `at`.
    ///
    /// The base image is resolved once and shared across ratios. A base-image failure aborts
    /// the product; a ratio failure is recorded on its [`VariantOutcome`].
    #[tracing::instrument(skip(self, product, message), fields(product = %product.name))]
    pub fn run_product_at(
        &self,
        product: &Product,
        region: &str,
        message: &str,
        at: NaiveDateTime,
    ) -> CampaignResult<ProductReport> {
        validate_product_key(&product.name)?;
        let (base, source) = self.resolver.resolve(product, region)?;
        let folder = timestamp_folder(&product.name, at);
        let logo = self.store.load_logo();

        let variants = self.fan_out(&self.ratios, |spec| {
            let result =
                self.render_variant(&base, spec, logo.as_ref(), message, &product.name, &folder);
            if let Err(e) = &result {
                tracing::error!(ratio = spec.name, error = %e, "variant failed");
            }
            VariantOutcome {
                ratio: spec.name,
                result,
            }
        });

        Ok(ProductReport {
            product: product.name.clone(),
            folder,
            source,
            variants,
        })
    }

    fn render_variant(
        &self,
        base: &BaseImage,
        spec: &RatioSpec,
        logo: Option<&RgbaImage>,
        message: &str,
        product: &str,
        folder: &str,
    ) -> CampaignResult<PathBuf> {
        let mut canvas = compositor::render(base, spec)?;
        self.overlay.apply_logo(&mut canvas, logo);
        self.overlay.apply_text(&mut canvas, message)?;
        self.store
            .save_output(canvas.pixels(), product, folder, spec.name)
    }

    fn fan_out<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> CampaignResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CampaignError::config(
            "pipeline threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CampaignError::config(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
