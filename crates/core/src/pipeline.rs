use crate::config::AppConfig;
use crate::inventory::Inventory;
use crate::preprocess::PreprocessOptions;
use crate::resolver::ExpiryResolver;
use anyhow::Context;
use providers::noop::NoopProvider;
use providers::ocrspace::{OcrSpaceConfig, OcrSpaceProvider};
use providers::ProviderRegistry;
use std::sync::Arc;
use std::time::Duration;
use storage::{connect, migrate};
use tracing::info;

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let ocr = &config.ocr;
    let api_key = std::env::var("OCR_API_KEY").unwrap_or_else(|_| ocr.api_key.clone());
    let ocrspace = OcrSpaceProvider::new(OcrSpaceConfig {
        api_key,
        base_url: ocr.base_url.clone(),
        engine: ocr.engine,
        language: ocr.language.clone(),
        scale: ocr.scale,
        timeout: Duration::from_secs(ocr.timeout_secs),
    });

    #[allow(unused_mut)]
    let mut reg = ProviderRegistry::new()
        .with_recognizer("noop", Arc::new(NoopProvider))
        .with_recognizer("ocrspace", Arc::new(ocrspace));

    #[cfg(feature = "tesseract")]
    {
        let lang = if ocr.language == "auto" {
            "eng"
        } else {
            ocr.language.as_str()
        };
        reg = reg.with_recognizer(
            "tesseract",
            Arc::new(providers::tesseract::TesseractProvider::new(
                ocr.tessdata.clone(),
                lang,
            )),
        );
    }

    reg.set_preferred_recognizer(&ocr.provider)
}

pub fn build_resolver(config: &AppConfig) -> anyhow::Result<ExpiryResolver> {
    let registry = build_registry(config);
    let recognizer = registry
        .recognizer(None)
        .with_context(|| format!("available recognizers: {}", registry.names().join(", ")))?;
    Ok(ExpiryResolver::new(recognizer)
        .with_preprocess(PreprocessOptions::from(&config.preprocess))
        .with_recognition_timeout(Duration::from_secs(config.ocr.timeout_secs)))
}

/// Opens the database, applies migrations and wires the resolver.
pub async fn build_inventory(config: &AppConfig) -> anyhow::Result<Inventory> {
    let pool = connect(&config.database.path).await.context("db connect")?;
    migrate(&pool).await.context("db migrate")?;
    let resolver = build_resolver(config)?;
    info!(
        db = %config.database.path,
        recognizer = %config.ocr.provider,
        "inventory ready"
    );
    Ok(Inventory::new(pool, Arc::new(resolver)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_prefers_configured_provider() {
        let mut cfg = AppConfig::default();
        cfg.ocr.provider = "noop".to_string();
        let reg = build_registry(&cfg);
        assert_eq!(reg.preferred_recognizer.as_deref(), Some("noop"));
        assert!(reg.recognizer(None).is_ok());
    }

    #[test]
    fn unknown_provider_fails_resolver_setup() {
        let mut cfg = AppConfig::default();
        cfg.ocr.provider = "carrier-pigeon".to_string();
        assert!(build_resolver(&cfg).is_err());
    }
}
