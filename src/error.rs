//! Error types for studio pipeline operations

use std::fmt;
use thiserror::Error;

/// Result type alias for studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Camera acquisition failures surfaced to the user as blocking errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The platform reports no video input device
    #[error("no camera available on this device")]
    NoCamera,

    /// The user or the platform refused access to the camera
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    /// The device exists but could not be opened
    #[error("camera hardware failure: {0}")]
    Hardware(String),

    /// An operation that needs an open stream was called while closed
    #[error("camera is not streaming")]
    NotStreaming,

    /// Frame grab or encode failed
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Best-effort hardware control failures (zoom, torch, focus)
///
/// These never abort a capture session; callers log them and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The active track does not expose this control
    #[error("{0} is not supported by the active camera")]
    Unsupported(&'static str),

    /// The track rejected the constraint update
    #[error("failed to apply {control}: {reason}")]
    Rejected {
        control: &'static str,
        reason: String,
    },

    /// No stream is open
    #[error("no active camera stream")]
    NoStream,
}

/// Recovery action offered alongside a user-facing error
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Re-trigger the failed operation
    Retry,
    /// Dismiss the message and clear the current work
    Clear,
    /// Pick or capture a different image
    Reselect,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "Tentar novamente"),
            Self::Clear => write!(f, "Limpar"),
            Self::Reselect => write!(f, "Escolher outra foto"),
        }
    }
}

/// Localized, human-readable error presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub text: String,
    pub recovery: RecoveryAction,
}

/// Comprehensive error types for studio operations
#[derive(Error, Debug)]
pub enum StudioError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding/encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport errors talking to the generative API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON payloads
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Camera acquisition errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Hardware control errors
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// The generative API answered but the answer is unusable
    #[error("Generation error: {0}")]
    Generation(String),

    /// A bounded wait ran out of attempts
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Share sheet and clipboard both failed
    #[error("Share error: {0}")]
    Share(String),

    /// Local pixel pipeline errors
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudioError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new generation error
    pub fn generation<S: Into<String>>(msg: S) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new share error
    pub fn share<S: Into<String>>(msg: S) -> Self {
        Self::Share(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether the error belongs to the camera category
    #[must_use]
    pub fn is_camera(&self) -> bool {
        matches!(self, Self::Camera(_))
    }

    /// Localized (pt-BR) text and recovery action for display
    #[must_use]
    pub fn user_message(&self) -> UserMessage {
        let (text, recovery) = match self {
            Self::Camera(CameraError::NoCamera) => (
                "Nenhuma câmera encontrada neste dispositivo.",
                RecoveryAction::Reselect,
            ),
            Self::Camera(CameraError::PermissionDenied(_)) => (
                "Permita o acesso à câmera para fotografar a joia.",
                RecoveryAction::Retry,
            ),
            Self::Camera(_) => (
                "Não foi possível acessar a câmera. Tente novamente.",
                RecoveryAction::Retry,
            ),
            Self::Capability(_) => (
                "Este ajuste não é suportado pela câmera.",
                RecoveryAction::Clear,
            ),
            Self::Http(_) | Self::Generation(_) | Self::Json(_) => (
                "Falha ao processar imagem. Verifique a conexão ou a iluminação da foto.",
                RecoveryAction::Retry,
            ),
            Self::Timeout(_) => (
                "O vídeo demorou demais para ficar pronto. Tente novamente.",
                RecoveryAction::Retry,
            ),
            Self::Image(_) => (
                "Não foi possível ler esta imagem. Escolha outra foto.",
                RecoveryAction::Reselect,
            ),
            Self::Share(_) => (
                "Não foi possível compartilhar. Baixe a imagem.",
                RecoveryAction::Clear,
            ),
            Self::Io(_) | Self::InvalidConfig(_) | Self::Processing(_) | Self::Internal(_) => (
                "Falha no processamento. Tente novamente.",
                RecoveryAction::Retry,
            ),
        };
        UserMessage {
            text: text.to_string(),
            recovery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = StudioError::invalid_config("fill fraction out of range");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: fill fraction out of range"
        );
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = StudioError::file_io_error("write download", Path::new("/out/a.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write download"));
        assert!(error_string.contains("/out/a.png"));

        let err = StudioError::config_value_error("background threshold", 300, "0-254", Some(250));
        let error_string = err.to_string();
        assert!(error_string.contains("background threshold"));
        assert!(error_string.contains("300"));
        assert!(error_string.contains("Recommended: 250"));

        let err = StudioError::processing_stage_error("compositing", "empty envelope", Some("0x0"));
        assert!(err.to_string().contains("compositing"));
        assert!(err.to_string().contains("0x0"));
    }

    #[test]
    fn test_camera_errors_map_to_blocking_messages() {
        let err = StudioError::from(CameraError::NoCamera);
        assert!(err.is_camera());
        let msg = err.user_message();
        assert_eq!(msg.recovery, RecoveryAction::Reselect);
        assert!(msg.text.contains("câmera"));

        let err = StudioError::from(CameraError::PermissionDenied("NotAllowedError".into()));
        assert_eq!(err.user_message().recovery, RecoveryAction::Retry);
    }

    #[test]
    fn test_generation_errors_offer_retry() {
        let err = StudioError::generation("no inline image in response");
        let msg = err.user_message();
        assert_eq!(msg.recovery, RecoveryAction::Retry);
        assert!(!msg.text.is_empty());
    }
}
