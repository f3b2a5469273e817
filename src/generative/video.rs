//! Fixed-interval polling of long-running video operations

use super::{GenerativeBackend, VideoOperation, VideoStatus};
use crate::{
    config::PollConfig,
    error::{Result, StudioError},
};
use std::time::Duration;

/// Waits for a video operation to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for VideoPoller {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl VideoPoller {
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    #[must_use]
    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms), config.max_attempts)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep one interval before every poll until the video is done
    ///
    /// # Errors
    /// - `StudioError::Timeout` after `max_attempts` polls without completion
    /// - Any error the backend returns while polling
    pub async fn wait(
        &self,
        backend: &dyn GenerativeBackend,
        operation: &VideoOperation,
    ) -> Result<Vec<u8>> {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;
            match backend.poll_video(operation).await? {
                VideoStatus::Done(bytes) if bytes.is_empty() => {
                    return Err(StudioError::generation("video operation returned no data"));
                }
                VideoStatus::Done(bytes) => {
                    log::debug!(
                        "Video {} ready after {} poll(s), {} bytes",
                        operation.name,
                        attempt,
                        bytes.len()
                    );
                    return Ok(bytes);
                }
                VideoStatus::Running => {
                    log::debug!("Video {} still running ({}/{})", operation.name, attempt, self.max_attempts);
                }
            }
        }
        Err(StudioError::timeout(format!(
            "video {} not ready after {} polls",
            operation.name, self.max_attempts
        )))
    }
}
