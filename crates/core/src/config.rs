use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub server: ServerConfig,
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/fridge.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// ocrspace | noop | tesseract
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub engine: u8,
    pub language: String,
    pub scale: bool,
    pub timeout_secs: u64,
    /// Tessdata directory for the local engine.
    pub tessdata: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: "ocrspace".to_string(),
            api_key: "helloworld".to_string(),
            base_url: providers::ocrspace::DEFAULT_BASE_URL.to_string(),
            engine: 2,
            language: "auto".to_string(),
            scale: true,
            timeout_secs: 30,
            tessdata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub max_size_kb: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_size_kb: 1024,
            max_dimension: 1600,
            jpeg_quality: 85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub upload_dir: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            upload_dir: "uploads".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: Option<String>,
    pub base_url: String,
    pub web_app_url: String,
    pub poll_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: providers::telegram::DEFAULT_BASE_URL.to_string(),
            web_app_url: "http://localhost:8000".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

/// Loads the TOML file (or `config/default` when present) and overlays
/// `FRIDGE__SECTION__KEY` environment variables.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("FRIDGE")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
