//! Provider abstractions for text recognition and the chat front door.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub mod noop;
pub mod ocrspace;
pub mod telegram;
#[cfg(feature = "tesseract")]
pub mod tesseract;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Turns an image on disk into raw text.
///
/// Implementations never fail past this boundary: connection problems,
/// service-side processing errors and empty results all come back as `None`.
#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Option<String>;
}

/// Sends a user the entry point into the companion web view.
#[async_trait::async_trait]
pub trait ChatLauncher: Send + Sync {
    async fn notify(&self, chat_id: i64) -> Result<(), ProviderError>;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    recognizers: HashMap<String, Arc<dyn TextRecognizer>>,
    pub preferred_recognizer: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recognizer(mut self, name: &str, provider: Arc<dyn TextRecognizer>) -> Self {
        self.recognizers.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_recognizer(mut self, name: &str) -> Self {
        self.preferred_recognizer = Some(name.to_string());
        self
    }

    pub fn recognizer(&self, name: Option<&str>) -> Result<Arc<dyn TextRecognizer>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_recognizer.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no recognition provider configured".into())
            })?;
        self.recognizers
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.recognizers.keys().cloned().collect();
        names.sort();
        names
    }
}
