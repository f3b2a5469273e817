//! Error handling and edge case testing
//!
//! Boundary conditions of the local passes, configuration validation, and the
//! degraded paths of the generative boundary.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use jewel_studio::{
    config::{OutputFormat, StudioConfig},
    error::{Result, StudioError},
    find_content_bounds,
    generative::{test_utils::MockGenerativeBackend, GenerativeResponse, InlineImage},
    services::{ImageIOService, OutputFormatHandler},
    strip_background, CaptureSource, CapturedImage, Compositor, ImageMime, Rect, RecoveryAction,
    StageOutcome, StudioProcessor,
};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_config_validation_edge_cases() -> Result<()> {
    let config = StudioConfig::builder()
        .fill_fraction(0.5)
        .background_threshold(200)
        .build()?;
    assert!(config.validate().is_ok());

    let config = StudioConfig::builder().jpeg_quality(0).build()?;
    assert_eq!(config.jpeg_quality, 1);

    let mut config = StudioConfig::default();
    config.fill_fraction = 0.4;
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("fill fraction"));
    assert!(error.to_string().contains("0.5-1.0"));

    let mut config = StudioConfig::default();
    config.background_threshold = 120;
    assert!(matches!(config.validate(), Err(StudioError::InvalidConfig(_))));

    let mut config = StudioConfig::default();
    config.diptych_size = (0, 1250);
    assert!(config.validate().unwrap_err().to_string().contains("diptych size"));

    let mut config = StudioConfig::default();
    config.video_poll.max_attempts = 0;
    assert!(config.validate().is_err());

    Ok(())
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("studio.json");
    std::fs::write(&path, r#"{"fill_fraction": 3.0}"#).unwrap();
    assert!(matches!(
        StudioConfig::from_json_file(&path),
        Err(StudioError::InvalidConfig(_))
    ));

    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        StudioConfig::from_json_file(&path),
        Err(StudioError::Json(_))
    ));

    let missing = dir.path().join("missing.json");
    let error = StudioConfig::from_json_file(&missing).unwrap_err();
    assert!(matches!(error, StudioError::Io(_)));
    assert!(error.to_string().contains("missing.json"));
}

#[test]
fn test_threshold_is_inclusive_and_needs_all_channels() {
    let mut img = RgbaImage::new(4, 1);
    img.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
    img.put_pixel(1, 0, Rgba([249, 250, 250, 255]));
    img.put_pixel(2, 0, Rgba([255, 255, 249, 255]));
    img.put_pixel(3, 0, Rgba([255, 255, 255, 40]));

    let stripped = strip_background(&img, 250);

    assert_eq!(stripped.get_pixel(0, 0)[3], 0);
    assert_eq!(stripped.get_pixel(1, 0), &Rgba([249, 250, 250, 255]));
    assert_eq!(stripped.get_pixel(2, 0), &Rgba([255, 255, 249, 255]));
    assert_eq!(stripped.get_pixel(3, 0)[3], 0);
}

#[test]
fn test_all_white_image_falls_back_to_full_canvas() {
    let white = RgbaImage::from_pixel(64, 32, Rgba([255, 255, 255, 255]));
    let stripped = strip_background(&white, 250);
    let bounds = find_content_bounds(&stripped, 10);

    assert!(bounds.is_fallback);
    assert_eq!(bounds.rect, Rect::new(0, 0, 64, 32));
}

#[test]
fn test_single_pixel_product_has_unit_bounds() {
    let mut img = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
    img.put_pixel(49, 0, Rgba([10, 10, 10, 255]));
    let bounds = find_content_bounds(&strip_background(&img, 250), 10);

    assert!(!bounds.is_fallback);
    assert_eq!(bounds.rect, Rect::new(49, 0, 1, 1));
}

#[test]
fn test_alpha_noise_is_ignored_by_bounds() {
    let mut img = RgbaImage::new(20, 20);
    img.put_pixel(0, 0, Rgba([0, 0, 0, 10]));
    img.put_pixel(5, 6, Rgba([0, 0, 0, 11]));
    let bounds = find_content_bounds(&img, 10);
    assert_eq!(bounds.rect, Rect::new(5, 6, 1, 1));
}

#[test]
fn test_compositor_rejects_out_of_range_fill() {
    assert!(Compositor::new(0.2).is_err());
    assert!(Compositor::new(1.5).is_err());
    assert!(Compositor::new(0.9).is_ok());
}

#[tokio::test]
async fn test_response_without_image_fails_treatment() {
    let mut processor = StudioProcessor::new(
        StudioConfig::builder().catalog_size(200, 200).build().unwrap(),
        Arc::new(MockGenerativeBackend::new_without_images()),
    )
    .unwrap();
    let bytes = OutputFormatHandler::encode_png(&DynamicImage::new_rgba8(8, 8)).unwrap();
    let captured = CapturedImage::from_encoded(bytes, CaptureSource::Upload).unwrap();

    let error = processor.process_capture(&captured).await.unwrap_err();

    assert!(matches!(error, StudioError::Generation(_)));
    assert_eq!(error.user_message().recovery, RecoveryAction::Retry);
}

#[test]
fn test_empty_inline_image_is_not_a_result() {
    let response = GenerativeResponse {
        image: Some(InlineImage::new(Vec::new(), ImageMime::Png)),
        json: None,
    };
    assert!(matches!(response.into_image(), Err(StudioError::Generation(_))));

    let response = GenerativeResponse {
        image: None,
        json: None,
    };
    assert!(response.into_json().is_err());
}

#[test]
fn test_undecodable_bytes_are_rejected() {
    let result = CapturedImage::from_encoded(b"not an image".to_vec(), CaptureSource::Upload);
    assert!(result.is_err());
    assert!(ImageIOService::load_from_bytes(&[0, 1, 2, 3]).is_err());
    assert!(InlineImage::from_base64("%%%", None).is_err());
}

#[test]
fn test_jpeg_export_flattens_transparency_on_white() {
    let mut img = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0]));
    img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
    let bytes =
        OutputFormatHandler::encode(&DynamicImage::ImageRgba8(img), OutputFormat::Jpeg, 95)
            .unwrap();
    let decoded = ImageIOService::load_from_bytes(&bytes).unwrap();

    let corner = decoded.get_pixel(31, 31);
    assert!(corner[0] > 240 && corner[1] > 240 && corner[2] > 240);
}

#[test]
fn test_saving_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));

    let save = || {
        ImageIOService::save_download(dir.path(), "studio", "branded", &image, OutputFormat::Png, 95)
    };

    let first = save().unwrap();
    let second = save().unwrap();

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
}

#[test]
fn test_failed_and_empty_outcomes_are_not_ready() {
    let failed: StageOutcome<Vec<u8>> = StageOutcome::Failed("boom".to_string());
    assert!(!failed.is_ready());
    assert!(failed.ready().is_none());
    assert!(StageOutcome::from_bytes(Vec::new()).ready().is_none());
}
