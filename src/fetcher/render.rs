//! Headless-rendering capability seam.
//!
//! Some career pages only materialize their listings client-side. The
//! Fetcher asks a `PageRenderer` for those; when no renderer is wired in,
//! the request fails with `RequiresJs` instead of crashing or returning an
//! empty shell.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no renderer available")]
    Unsupported,
    #[error("render failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render the page and return the post-JS DOM as HTML.
    async fn render(&self, url: &str) -> Result<String, RenderError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Default renderer for deployments without a headless browser.
pub struct NoopRenderer;

#[async_trait]
impl PageRenderer for NoopRenderer {
    async fn render(&self, _url: &str) -> Result<String, RenderError> {
        Err(RenderError::Unsupported)
    }

    fn is_available(&self) -> bool {
        false
    }
}
