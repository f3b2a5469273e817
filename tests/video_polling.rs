//! Product video generation through the processor

use jewel_studio::{
    generative::test_utils::{sample_treated_image, MockGenerativeBackend},
    services::OutputFormatHandler,
    share_or_copy, CaptureSource, CapturedImage, PollConfig, SharePayload, ShareOutcome,
    StageOutcome, StudioConfig, StudioProcessor,
};
use std::sync::Arc;

fn video_config(max_attempts: u32) -> StudioConfig {
    StudioConfig::builder()
        .catalog_size(300, 300)
        .editorial(false)
        .video(true)
        .video_poll(PollConfig {
            interval_ms: 10_000,
            max_attempts,
        })
        .build()
        .unwrap()
}

fn capture() -> CapturedImage {
    let bytes = OutputFormatHandler::encode_png(&sample_treated_image()).unwrap();
    CapturedImage::from_encoded(bytes, CaptureSource::Upload).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_slow_video_times_out_without_losing_the_catalog() {
    let backend = Arc::new(MockGenerativeBackend::new().with_video_after_polls(10, vec![1, 2, 3]));
    let mut processor = StudioProcessor::new(video_config(3), backend.clone()).unwrap();

    let result = processor.process_capture(&capture()).await.unwrap();

    match &result.video {
        StageOutcome::Failed(message) => assert!(message.starts_with("Timed out")),
        other => panic!("expected a failed video, got {}", other.label()),
    }
    assert!(result.branded.is_ready());
    assert_eq!(backend.count_calls("poll_video"), 3);
    assert!(result.timings.video_ms.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_backend_without_video_support_marks_video_failed() {
    let backend = Arc::new(MockGenerativeBackend::new().without_video());
    let mut processor = StudioProcessor::new(video_config(5), backend.clone()).unwrap();

    let result = processor.process_capture(&capture()).await.unwrap();

    assert!(matches!(result.video, StageOutcome::Failed(_)));
    assert_eq!(backend.count_calls("poll_video"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_finished_video_needs_a_single_poll() {
    let backend = Arc::new(MockGenerativeBackend::new().with_video_after_polls(0, vec![9]));
    let mut processor = StudioProcessor::new(video_config(2), backend.clone()).unwrap();

    let result = processor.process_capture(&capture()).await.unwrap();

    assert_eq!(result.video.ready(), Some(&vec![9]));
    assert_eq!(
        backend.get_call_history(),
        vec!["generate:image", "generate:json", "start_video", "poll_video"]
    );
}

#[tokio::test]
async fn test_generated_video_link_is_shared_or_copied() {
    let surface = jewel_studio::share::MockShareSurface::clipboard_only();
    let payload = SharePayload::for_url("https://cdn.example.com/video.mp4");

    let outcome = share_or_copy(&surface, &payload).await.unwrap();

    assert_eq!(outcome, ShareOutcome::Copied);
    assert_eq!(surface.clipboard().len(), 1);
    assert!(surface.clipboard()[0].contains("https://cdn.example.com/video.mp4"));
}
