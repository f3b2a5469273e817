//! Camera session lifecycle against the scripted platform

use jewel_studio::{
    camera::test_utils::MockCameraPlatform, CameraController, CameraError, CameraState,
    CapabilityError, CaptureSource, ImageMime, RecoveryAction,
};
use std::sync::Arc;

#[tokio::test]
async fn test_capture_flow_from_open_to_close() {
    let platform = Arc::new(MockCameraPlatform::new().with_resolution(320, 240));
    let mut controller = CameraController::new(platform.clone());
    assert_eq!(controller.state(), CameraState::Closed);

    controller.open().await.unwrap();
    assert_eq!(controller.state(), CameraState::Streaming);
    assert_eq!(
        platform.get_call_history(),
        vec!["has_camera", "open_stream:preferred"]
    );

    assert_eq!(controller.set_zoom(3.0), Ok(3.0));
    controller.set_torch(true).unwrap();

    let captured = controller.capture().await.unwrap();
    assert_eq!(controller.state(), CameraState::Streaming);
    assert_eq!(captured.mime, ImageMime::Jpeg);
    assert_eq!(captured.source, CaptureSource::Camera);
    assert_eq!((captured.width, captured.height), (320, 240));
    assert_eq!(ImageMime::sniff(&captured.bytes), Some(ImageMime::Jpeg));

    controller.close();
    assert_eq!(controller.state(), CameraState::Closed);
    assert!(!controller.torch_enabled());
    assert_eq!(controller.zoom(), None);

    let events = platform.stream_events();
    let torch_off = events.iter().position(|e| e == "apply:torch=false").unwrap();
    let stopped = events.iter().position(|e| e == "stop_tracks").unwrap();
    assert!(torch_off < stopped);
}

#[tokio::test]
async fn test_rejected_constraints_retry_once_with_fallback() {
    let platform = Arc::new(MockCameraPlatform::new_failing_preferred());
    let mut controller = CameraController::new(platform.clone());

    controller.open().await.unwrap();

    assert_eq!(controller.state(), CameraState::Streaming);
    assert_eq!(
        platform.get_call_history(),
        vec!["has_camera", "open_stream:preferred", "open_stream:fallback"]
    );
}

#[tokio::test]
async fn test_permission_denied_returns_to_closed() {
    let platform = Arc::new(MockCameraPlatform::new_failing_all(
        CameraError::PermissionDenied("NotAllowedError".to_string()),
    ));
    let mut controller = CameraController::new(platform.clone());

    let err = controller.open().await.unwrap_err();

    assert_eq!(controller.state(), CameraState::Closed);
    assert!(matches!(
        controller.last_error(),
        Some(CameraError::PermissionDenied(_))
    ));
    assert_eq!(err.user_message().recovery, RecoveryAction::Retry);
    assert_eq!(platform.get_call_history().len(), 3);
}

#[tokio::test]
async fn test_no_camera_never_requests_a_stream() {
    let platform = Arc::new(MockCameraPlatform::no_camera());
    let mut controller = CameraController::new(platform.clone());

    let err = controller.open().await.unwrap_err();

    assert_eq!(controller.state(), CameraState::Closed);
    assert_eq!(err.user_message().recovery, RecoveryAction::Reselect);
    assert!(!platform
        .get_call_history()
        .iter()
        .any(|c| c.starts_with("open_stream")));
}

#[tokio::test]
async fn test_rejected_controls_keep_streaming() {
    let platform = Arc::new(MockCameraPlatform::new().rejecting_controls());
    let mut controller = CameraController::new(platform);

    controller.open().await.unwrap();
    assert_eq!(controller.state(), CameraState::Streaming);
    assert_eq!(controller.zoom(), None);

    let err = controller.set_torch(true).unwrap_err();
    assert!(matches!(err, CapabilityError::Rejected { control: "torch", .. }));
    assert!(!controller.torch_enabled());
    assert!(controller.capture().await.is_ok());
}

#[tokio::test]
async fn test_drop_releases_the_stream() {
    let platform = Arc::new(MockCameraPlatform::new());
    {
        let mut controller = CameraController::new(platform.clone());
        controller.open().await.unwrap();
    }
    assert_eq!(
        platform
            .stream_events()
            .iter()
            .filter(|e| *e == "stop_tracks")
            .count(),
        1
    );
}
