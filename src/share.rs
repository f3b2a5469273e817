//! Sharing with clipboard fallback
//!
//! The platform share sheet and the clipboard sit behind [`ShareSurface`].
//! [`share_or_copy`] prefers the share sheet and falls back to copying the
//! link whenever sharing is unavailable, the URL is not absolute, or the
//! share attempt fails.

use crate::error::{Result, StudioError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Default share title
pub const DEFAULT_SHARE_TITLE: &str = "Vilaça Joias Studio";

/// Default share text
pub const DEFAULT_SHARE_TEXT: &str =
    "Transforme suas fotos de joias em imagens profissionais para site com um clique!";

/// What gets shared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    /// Payload with the default title and text
    #[must_use]
    pub fn for_url<S: Into<String>>(url: S) -> Self {
        Self {
            title: DEFAULT_SHARE_TITLE.to_string(),
            text: DEFAULT_SHARE_TEXT.to_string(),
            url: url.into(),
        }
    }

    /// Share sheets only accept absolute http(s) URLs
    #[must_use]
    pub fn has_shareable_url(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// How a payload left the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

/// Platform share sheet and clipboard
#[async_trait]
pub trait ShareSurface: Send + Sync {
    fn can_share(&self) -> bool;

    async fn share(&self, payload: &SharePayload) -> Result<()>;

    async fn copy_to_clipboard(&self, text: &str) -> Result<()>;
}

/// Share `payload`, falling back to copying its URL
///
/// # Errors
/// - `StudioError::Share` when both sharing and copying fail
pub async fn share_or_copy(surface: &dyn ShareSurface, payload: &SharePayload) -> Result<ShareOutcome> {
    if surface.can_share() && payload.has_shareable_url() {
        match surface.share(payload).await {
            Ok(()) => return Ok(ShareOutcome::Shared),
            Err(e) => log::warn!("Share failed, copying link instead: {e}"),
        }
    }
    surface
        .copy_to_clipboard(&payload.url)
        .await
        .map_err(|e| StudioError::share(format!("could not copy link: {e}")))?;
    Ok(ShareOutcome::Copied)
}

/// Scripted share surface
#[derive(Debug, Clone, Default)]
pub struct MockShareSurface {
    can_share: bool,
    fail_share: bool,
    fail_copy: bool,
    shared: Arc<Mutex<Vec<SharePayload>>>,
    clipboard: Arc<Mutex<Vec<String>>>,
}

impl MockShareSurface {
    /// Surface with a working share sheet
    #[must_use]
    pub fn new() -> Self {
        Self {
            can_share: true,
            ..Self::default()
        }
    }

    /// Surface without a share sheet (desktop browsers)
    #[must_use]
    pub fn clipboard_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_share(mut self) -> Self {
        self.fail_share = true;
        self
    }

    #[must_use]
    pub fn failing_clipboard(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    #[must_use]
    pub fn shared(&self) -> Vec<SharePayload> {
        self.shared.lock().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ShareSurface for MockShareSurface {
    fn can_share(&self) -> bool {
        self.can_share
    }

    async fn share(&self, payload: &SharePayload) -> Result<()> {
        if self.fail_share {
            return Err(StudioError::share("AbortError"));
        }
        if let Ok(mut shared) = self.shared.lock() {
            shared.push(payload.clone());
        }
        Ok(())
    }

    async fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        if self.fail_copy {
            return Err(StudioError::share("clipboard unavailable"));
        }
        if let Ok(mut clipboard) = self.clipboard.lock() {
            clipboard.push(text.to_string());
        }
        Ok(())
    }
}
