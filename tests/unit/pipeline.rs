use std::{
    io::Cursor,
    sync::atomic::{AtomicUsize, Ordering},
};

use chrono::NaiveDate;

use super::*;
use crate::{
    foundation::config::StoreConfig,
    generate::PlaceholderGenerator,
    render::text::OverlayFont,
};

const FONT_PATH: &str = "tests/data/fonts/DejaVuSans-Bold.ttf";

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "campaign_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 4)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

impl ImageGenerator for Counting {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PlaceholderGenerator {
            width: 64,
            height: 48,
        }
        .generate(prompt)
    }
}

struct Failing;

impl ImageGenerator for Failing {
    fn generate(&self, _prompt: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("quota exceeded")
    }
}

fn font_overlay() -> OverlayRenderer {
    OverlayRenderer::new(OverlayFont::load(Path::new(FONT_PATH)).unwrap())
}

fn store(root: &Path) -> Arc<AssetStore> {
    Arc::new(AssetStore::new(StoreConfig::new(
        root.join("input"),
        root.join("output"),
    )))
}

fn pipeline(
    store: Arc<AssetStore>,
    generator: Arc<dyn ImageGenerator>,
    parallel: bool,
) -> VariantPipeline {
    VariantPipeline::new(
        store,
        generator,
        font_overlay(),
        &PipelineThreading {
            parallel,
            threads: Some(2),
        },
    )
    .unwrap()
}

fn product(name: &str) -> Product {
    Product {
        name: name.to_string(),
        visual_style: "bold".to_string(),
    }
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
}

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba(px)))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn timestamp_folder_uses_fixed_layout() {
    assert_eq!(timestamp_folder("lamp", at(5, 6, 7)), "lamp_2025-03-04_05-06-07");
    assert_eq!(timestamp_folder("mug", at(23, 59, 0)), "mug_2025-03-04_23-59-00");
}

#[test]
fn zero_threads_is_rejected() {
    let tmp = temp_dir("pipeline_threads");
    let err = VariantPipeline::new(
        store(&tmp),
        Arc::new(Counting::default()),
        OverlayRenderer::without_font(),
        &PipelineThreading {
            parallel: true,
            threads: Some(0),
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, CampaignError::Config(_)));
}

#[test]
fn missing_asset_yields_three_variants_in_one_folder() {
    let tmp = temp_dir("pipeline_e2e");
    let generator = Arc::new(Counting::default());
    let p = pipeline(store(&tmp), generator.clone(), true);

    let report = p
        .run_product_at(&product("lamp"), "EU", "Light up your nights", at(5, 6, 7))
        .unwrap();

    assert_eq!(report.source, BaseImageSource::Generated);
    assert_eq!(report.folder, "lamp_2025-03-04_05-06-07");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert!(report.is_complete());

    let folder = tmp.join("output").join("lamp").join("lamp_2025-03-04_05-06-07");
    for spec in RATIO_SPECS {
        let path = folder.join(spec.name).join("campaign_asset.png");
        let written = report
            .variants
            .iter()
            .find(|v| v.ratio == spec.name)
            .and_then(|v| v.result.as_ref().ok())
            .unwrap();
        assert_eq!(written, &path);
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (spec.width, spec.height));
    }
    assert_eq!(report.artifacts().count(), 3);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn existing_asset_skips_generation() {
    let tmp = temp_dir("pipeline_existing");
    let store = store(&tmp);
    store.save_upload(&png(40, 30, [0, 128, 0, 255]), "plant").unwrap();
    let generator = Arc::new(Counting::default());
    let p = pipeline(store, generator.clone(), false);

    let report = p.run_product_at(&product("plant"), "EU", "", at(1, 2, 3)).unwrap();
    assert_eq!(report.source, BaseImageSource::Existing);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    // No logo and no text: every pixel is the uploaded colour.
    let path = report.artifacts().next().unwrap();
    let img = image::open(path).unwrap().to_rgba8();
    assert!(img.pixels().all(|p| close(p.0, [0, 128, 0, 255])));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn base_image_failure_aborts_the_product() {
    let tmp = temp_dir("pipeline_abort");
    let p = pipeline(store(&tmp), Arc::new(Failing), true);
    let err = p
        .run_product_at(&product("lamp"), "EU", "Hi", at(1, 1, 1))
        .unwrap_err();
    assert!(matches!(err, CampaignError::Generation(_)));
    assert!(!tmp.join("output").exists());
}

#[test]
fn logo_is_stamped_on_every_variant() {
    let tmp = temp_dir("pipeline_logo");
    let store = store(&tmp);
    store.save_upload(&png(20, 10, [255, 0, 0, 255]), "logo").unwrap();
    store.save_upload(&png(8, 8, [0, 0, 255, 255]), "cup").unwrap();
    let p = pipeline(store, Arc::new(Counting::default()), true);

    let report = p.run_product_at(&product("cup"), "EU", "", at(9, 9, 9)).unwrap();
    for v in &report.variants {
        let img = image::open(v.result.as_ref().unwrap()).unwrap().to_rgba8();
        let w = img.width();
        let padding = (f64::from(w) * 0.05) as u32;
        let logo_w = ((f64::from(w) * 0.15) as u32).max(50);
        let logo_px = img.get_pixel(w - padding - logo_w, padding).0;
        assert!(close(logo_px, [255, 0, 0, 255]), "{logo_px:?}");
        assert!(close(img.get_pixel(w - padding, padding).0, [0, 0, 255, 255]));
        assert!(close(img.get_pixel(0, 0).0, [0, 0, 255, 255]));
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn rerun_in_same_second_does_not_overwrite() {
    let tmp = temp_dir("pipeline_rerun");
    let p = pipeline(store(&tmp), Arc::new(Counting::default()), false)
        .with_ratios(vec![RatioSpec::SQUARE])
        .unwrap();

    let first = p.run_product_at(&product("lamp"), "EU", "", at(2, 2, 2)).unwrap();
    let path = first.artifacts().next().unwrap().to_path_buf();
    let before = std::fs::read(&path).unwrap();

    let second = p.run_product_at(&product("lamp"), "EU", "", at(2, 2, 2)).unwrap();
    assert!(matches!(
        second.variants[0].result,
        Err(CampaignError::Io { .. })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), before);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn failing_ratio_does_not_abort_siblings() {
    let tmp = temp_dir("pipeline_isolation");
    // A canvas wider than the rasterizer supports fails that ratio only.
    let too_wide = RatioSpec {
        name: "too-wide",
        width: 70_000,
        height: 2,
    };
    let p = pipeline(store(&tmp), Arc::new(Counting::default()), true)
        .with_ratios(vec![RatioSpec::SQUARE, too_wide, RatioSpec::LANDSCAPE])
        .unwrap();

    let report = p
        .run_product_at(&product("lamp"), "EU", "Go", at(3, 3, 3))
        .unwrap();
    let ratios: Vec<_> = report.variants.iter().map(|v| v.ratio).collect();
    assert_eq!(ratios, ["1-1", "too-wide", "16-9"]);
    assert!(report.variants[0].result.is_ok());
    assert!(matches!(
        report.variants[1].result,
        Err(CampaignError::InvalidImage(_))
    ));
    assert!(report.variants[2].result.is_ok());
    assert!(!report.is_complete());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn parallel_and_sequential_runs_match() {
    let tmp = temp_dir("pipeline_parity");
    let seq = pipeline(store(&tmp), Arc::new(Counting::default()), false);
    let par = pipeline(store(&tmp), Arc::new(Counting::default()), true);

    let a = seq.run_product_at(&product("lamp"), "EU", "Same", at(4, 0, 0)).unwrap();
    let b = par.run_product_at(&product("lamp"), "EU", "Same", at(4, 0, 1)).unwrap();
    for (va, vb) in a.variants.iter().zip(&b.variants) {
        assert_eq!(va.ratio, vb.ratio);
        let fa = std::fs::read(va.result.as_ref().unwrap()).unwrap();
        let fb = std::fs::read(vb.result.as_ref().unwrap()).unwrap();
        assert_eq!(fa, fb, "ratio {}", va.ratio);
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn brief_reports_failures_per_product() {
    let tmp = temp_dir("pipeline_brief");
    let store = store(&tmp);
    store.save_upload(b"not an image", "mug").unwrap();
    let p = pipeline(store, Arc::new(Counting::default()), true)
        .with_ratios(vec![RatioSpec::SQUARE])
        .unwrap();

    let brief = Brief {
        campaign_name: "Autumn".to_string(),
        products: vec![product("mug"), product("lamp")],
        target_region: "EU".to_string(),
        target_audience: String::new(),
        campaign_message: "Cozy season".to_string(),
    };
    let report = p.run_brief(&brief).unwrap();

    assert_eq!(report.campaign, "Autumn");
    assert_eq!(report.products[0].product, "mug");
    assert!(matches!(report.products[0].result, Err(CampaignError::Decode(_))));
    assert!(report.products[1].result.is_ok());
    assert_eq!(report.artifacts().count(), 1);
    assert!(!report.is_success());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("mug: "));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn invalid_product_key_fails_only_that_product() {
    let tmp = temp_dir("pipeline_bad_key");
    let p = pipeline(store(&tmp), Arc::new(Counting::default()), true)
        .with_ratios(vec![RatioSpec::SQUARE])
        .unwrap();
    let brief = Brief {
        campaign_name: "Mixed".to_string(),
        products: vec![product("good"), product("bad/name")],
        target_region: "EU".to_string(),
        target_audience: String::new(),
        campaign_message: String::new(),
    };

    let report = p.run_brief(&brief).unwrap();
    assert_eq!(report.products[0].product, "good");
    assert!(report.products[0].result.as_ref().unwrap().is_complete());
    assert_eq!(report.products[1].product, "bad/name");
    assert!(matches!(
        report.products[1].result,
        Err(CampaignError::InvalidKey(_))
    ));
    assert_eq!(report.artifacts().count(), 1);
    assert!(!report.is_success());
    assert!(!tmp.join("output").join("bad").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn repeated_product_fails_after_first_occurrence() {
    let tmp = temp_dir("pipeline_dupes");
    let p = pipeline(store(&tmp), Arc::new(Counting::default()), false)
        .with_ratios(vec![RatioSpec::SQUARE])
        .unwrap();
    let brief = Brief {
        campaign_name: "Dupes".to_string(),
        products: vec![product("lamp"), product("vase"), product("lamp")],
        target_region: "EU".to_string(),
        target_audience: String::new(),
        campaign_message: String::new(),
    };

    let report = p.run_brief(&brief).unwrap();
    assert!(report.products[0].result.is_ok());
    assert!(report.products[1].result.is_ok());
    assert!(matches!(
        report.products[2].result,
        Err(CampaignError::InvalidKey(_))
    ));
    assert_eq!(report.artifacts().count(), 2);
    assert_eq!(
        std::fs::read_dir(tmp.join("output").join("lamp")).unwrap().count(),
        1
    );

    std::fs::remove_dir_all(&tmp).ok();
}
