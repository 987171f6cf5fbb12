//! Screenshot capturers shipped with the crate

use crate::crawler::traits::{CaptureOptions, ScreenshotCapturer, Screenshots};
use async_trait::async_trait;

/// Capturer for runs without a rendering backend; captures nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCapturer;

#[async_trait]
impl ScreenshotCapturer for NullCapturer {
    async fn capture(&self, url: &str, options: CaptureOptions) -> crate::Result<Screenshots> {
        if options.any() {
            tracing::trace!("No rendering backend, skipping screenshots of {}", url);
        }
        Ok(Screenshots::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_capturer_returns_nothing() {
        let shots = NullCapturer
            .capture(
                "https://site.test/",
                CaptureOptions {
                    desktop: true,
                    mobile: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(shots.images().count(), 0);
    }
}
