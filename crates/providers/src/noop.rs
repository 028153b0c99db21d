use crate::{ChatLauncher, ProviderError, TextRecognizer};
use std::path::Path;

/// Recognizer and launcher that do nothing; used when no service is configured.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl TextRecognizer for NoopProvider {
    async fn recognize(&self, _image: &Path) -> Option<String> {
        None
    }
}

#[async_trait::async_trait]
impl ChatLauncher for NoopProvider {
    async fn notify(&self, _chat_id: i64) -> Result<(), ProviderError> {
        Ok(())
    }
}
