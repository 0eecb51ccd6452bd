use std::io::Cursor;

use super::*;

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

fn store_in(root: &Path) -> AssetStore {
    AssetStore::new(StoreConfig::new(root.join("input"), root.join("output")))
}

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn load_input_missing_is_not_found() {
    let tmp = temp_dir("store_missing");
    let store = store_in(&tmp);
    let err = store.load_input("sneaker").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn upload_then_load_roundtrips_pixels() {
    let tmp = temp_dir("store_upload");
    let store = store_in(&tmp);

    let path = store
        .save_upload(&png_bytes(4, 2, [10, 20, 30, 255]), "sneaker")
        .unwrap();
    assert_eq!(path, tmp.join("input").join("sneaker.png"));

    let base = store.load_input("sneaker").unwrap();
    assert_eq!((base.width(), base.height()), (4, 2));
    assert_eq!(base.pixels().get_pixel(3, 1).0, [10, 20, 30, 255]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn upload_overwrites_previous_asset() {
    let tmp = temp_dir("store_overwrite");
    let store = store_in(&tmp);
    store.save_upload(&png_bytes(1, 1, [0, 0, 0, 255]), "mug").unwrap();
    store.save_upload(&png_bytes(2, 2, [9, 9, 9, 255]), "mug").unwrap();
    assert_eq!(store.load_input("mug").unwrap().width(), 2);
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn corrupt_input_is_decode_error() {
    let tmp = temp_dir("store_corrupt");
    let store = store_in(&tmp);
    store.save_upload(b"not an image", "broken").unwrap();
    let err = store.load_input("broken").unwrap_err();
    assert!(matches!(err, CampaignError::Decode(_)));
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn logo_absent_or_corrupt_is_none() {
    let tmp = temp_dir("store_logo");
    let store = store_in(&tmp);
    assert!(store.load_logo().is_none());

    store.save_upload(b"garbage", LOGO_KEY).unwrap();
    assert!(store.load_logo().is_none());

    store.save_upload(&png_bytes(8, 4, [255, 0, 0, 255]), LOGO_KEY).unwrap();
    let logo = store.load_logo().unwrap();
    assert_eq!(logo.dimensions(), (8, 4));
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn save_output_uses_fixed_layout_and_never_overwrites() {
    let tmp = temp_dir("store_output");
    let store = store_in(&tmp);
    let raster = RgbaImage::from_pixel(3, 5, image::Rgba([1, 2, 3, 255]));

    let path = store
        .save_output(&raster, "sneaker", "sneaker_2026-01-02_03-04-05", "9-16")
        .unwrap();
    assert_eq!(
        path,
        tmp.join("output")
            .join("sneaker")
            .join("sneaker_2026-01-02_03-04-05")
            .join("9-16")
            .join("campaign_asset.png")
    );

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (3, 5));

    let again = store.save_output(&raster, "sneaker", "sneaker_2026-01-02_03-04-05", "9-16");
    assert!(matches!(again, Err(CampaignError::Io { .. })));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn concurrent_uploads_share_directory_creation() {
    let tmp = temp_dir("store_concurrent");
    let store = store_in(&tmp);
    let bytes = png_bytes(1, 1, [5, 5, 5, 255]);

    std::thread::scope(|s| {
        for i in 0..8 {
            let store = &store;
            let bytes = &bytes;
            s.spawn(move || store.save_upload(bytes, &format!("p{i}")).unwrap());
        }
    });

    for i in 0..8 {
        store.load_input(&format!("p{i}")).unwrap();
    }
    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn product_key_validation() {
    validate_product_key("sneaker").unwrap();
    validate_product_key("Trail Runner 2").unwrap();
    validate_product_key("logo").unwrap();
    assert!(validate_product_key("").is_err());
    assert!(validate_product_key("   ").is_err());
    assert!(validate_product_key("../x").is_err());
    assert!(validate_product_key("a/b").is_err());
    assert!(validate_product_key("a\\b").is_err());
    assert!(validate_product_key("..").is_err());
    assert!(validate_product_key(".hidden").is_err());
    assert!(validate_product_key("bad\nname").is_err());
}

#[test]
fn upload_rejects_traversal_key() {
    let tmp = temp_dir("store_traversal");
    let store = store_in(&tmp);
    let err = store.save_upload(b"x", "../escape").unwrap_err();
    assert!(matches!(err, CampaignError::InvalidKey(_)));
    assert!(!tmp.join("escape.png").exists());
}
