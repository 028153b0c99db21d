use crate::extractor::Extractor;
use crate::models::ResolvedExpiry;
use crate::preprocess::{self, PreprocessOptions};
use chrono::{Datelike, Local, NaiveDate};
use providers::TextRecognizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Caller input problems. Service failures never show up here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid manual date {0:?}, expected YYYY-MM-DD")]
    InvalidManualDate(String),
    #[error("a photo or a manual date is required")]
    MissingInput,
}

/// Decides the expiry date for one upload.
///
/// A manual date always wins over the photo. Photos go through
/// preprocessing, recognition and extraction; when any of those come up
/// empty the result is `unresolved` rather than an error.
pub struct ExpiryResolver {
    recognizer: Arc<dyn TextRecognizer>,
    extractor: Extractor,
    preprocess: PreprocessOptions,
    recognition_timeout: Duration,
    current_year: Option<i32>,
}

impl ExpiryResolver {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            extractor: Extractor::default(),
            preprocess: PreprocessOptions::default(),
            recognition_timeout: Duration::from_secs(30),
            current_year: None,
        }
    }

    pub fn with_preprocess(mut self, opts: PreprocessOptions) -> Self {
        self.preprocess = opts;
        self
    }

    pub fn with_recognition_timeout(mut self, timeout: Duration) -> Self {
        self.recognition_timeout = timeout;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Pins the year used for day-month dates instead of the local clock.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub async fn resolve(
        &self,
        manual_date: Option<&str>,
        image: Option<&Path>,
    ) -> Result<ResolvedExpiry, ResolveError> {
        if let Some(raw) = manual_date.filter(|s| !s.is_empty()) {
            let date = parse_manual_date(raw)?;
            return Ok(ResolvedExpiry::manual(date));
        }
        match image {
            Some(path) => Ok(self.resolve_image(path).await),
            None => Err(ResolveError::MissingInput),
        }
    }

    async fn resolve_image(&self, path: &Path) -> ResolvedExpiry {
        let prepared = self.prepare(path).await;
        let Some(text) = self.recognize(&prepared).await else {
            return ResolvedExpiry::unresolved();
        };
        let year = self.current_year.unwrap_or_else(|| Local::now().year());
        match self.extractor.extract_in_year(&text, year) {
            Some(date) => {
                info!(image = %path.display(), %date, "expiry recognized");
                ResolvedExpiry::recognized(date)
            }
            None => {
                info!(image = %path.display(), "no date found in recognized text");
                ResolvedExpiry::unresolved()
            }
        }
    }

    async fn prepare(&self, path: &Path) -> PathBuf {
        let owned = path.to_path_buf();
        let opts = self.preprocess;
        match tokio::task::spawn_blocking(move || preprocess::prepare(&owned, &opts)).await {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(image = %path.display(), error = %e, "preprocessing task failed");
                path.to_path_buf()
            }
        }
    }

    async fn recognize(&self, path: &Path) -> Option<String> {
        match tokio::time::timeout(self.recognition_timeout, self.recognizer.recognize(path)).await {
            Ok(text) => text,
            Err(_) => {
                warn!(
                    image = %path.display(),
                    timeout_secs = self.recognition_timeout.as_secs(),
                    "text recognition timed out"
                );
                None
            }
        }
    }
}

/// Strict `YYYY-MM-DD`: zero-padded, nothing before or after.
pub fn parse_manual_date(raw: &str) -> Result<NaiveDate, ResolveError> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(ResolveError::InvalidManualDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ResolveError::InvalidManualDate(raw.to_string()))
}
