use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CampaignError::generation("x")
            .to_string()
            .contains("generation error:")
    );
    assert!(CampaignError::decode("x").to_string().contains("decode error:"));
    assert!(
        CampaignError::invalid_image("x")
            .to_string()
            .contains("invalid image:")
    );
    assert!(
        CampaignError::invalid_key("x")
            .to_string()
            .contains("invalid product key:")
    );
    assert!(CampaignError::text("x").to_string().contains("text error:"));
    assert!(CampaignError::config("x").to_string().contains("config error:"));
}

#[test]
fn not_found_names_the_path() {
    let err = CampaignError::NotFound(PathBuf::from("input/shoe.png"));
    assert!(err.is_not_found());
    assert!(err.to_string().contains("input/shoe.png"));
    assert!(!CampaignError::decode("x").is_not_found());
}

#[test]
fn io_keeps_path_and_source() {
    let err = CampaignError::io("output/a", std::io::Error::other("disk full"));
    let msg = err.to_string();
    assert!(msg.contains("output/a"));
    assert!(msg.contains("disk full"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CampaignError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
