//! Local recognition through Tesseract, for running without network access.

use crate::{ProviderError, TextRecognizer};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct TesseractProvider {
    pub data_path: Option<String>,
    pub language: String,
}

impl TesseractProvider {
    pub fn new(data_path: Option<String>, language: &str) -> Self {
        Self {
            data_path,
            language: language.to_string(),
        }
    }

    fn read_text(&self, image: &Path) -> Result<String, ProviderError> {
        let mut lt = leptess::LepTess::new(self.data_path.as_deref(), &self.language)
            .map_err(|e| ProviderError::Service(e.to_string()))?;
        lt.set_image(image)
            .map_err(|e| ProviderError::Service(e.to_string()))?;
        lt.get_utf8_text()
            .map_err(|e| ProviderError::Service(e.to_string()))
    }
}

#[async_trait::async_trait]
impl TextRecognizer for TesseractProvider {
    async fn recognize(&self, image: &Path) -> Option<String> {
        let this = self.clone();
        let path: PathBuf = image.to_path_buf();
        let result = tokio::task::spawn_blocking(move || this.read_text(&path)).await;
        match result {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!(image = %image.display(), error = %e, "tesseract failed");
                None
            }
            Err(e) => {
                warn!(image = %image.display(), error = %e, "tesseract task panicked");
                None
            }
        }
    }
}
