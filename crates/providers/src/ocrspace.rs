use crate::{ProviderError, TextRecognizer};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.ocr.space";

#[derive(Clone, Debug)]
pub struct OcrSpaceConfig {
    pub api_key: String,
    pub base_url: String,
    /// OCR engine number; engine 2 reads digits on receipts best.
    pub engine: u8,
    pub language: String,
    pub scale: bool,
    pub timeout: Duration,
}

impl Default for OcrSpaceConfig {
    fn default() -> Self {
        Self {
            api_key: "helloworld".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            engine: 2,
            language: "auto".to_string(),
            scale: true,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct OcrSpaceProvider {
    client: Client,
    cfg: Arc<OcrSpaceConfig>,
}

impl OcrSpaceProvider {
    pub fn new(cfg: OcrSpaceConfig) -> Self {
        let client = match Client::builder().timeout(cfg.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "http client build failed, falling back to default client without timeout");
                Client::new()
            }
        };
        Self {
            client,
            cfg: Arc::new(cfg),
        }
    }

    /// Uploads the image and returns the text of the first parsed block.
    pub async fn parse_image(&self, image: &Path) -> Result<String, ProviderError> {
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.jpg".to_string());
        let form = Form::new()
            .text("apikey", self.cfg.api_key.clone())
            .text("language", self.cfg.language.clone())
            .text("OCREngine", self.cfg.engine.to_string())
            .text("scale", self.cfg.scale.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .client
            .post(format!("{}/parse/image", self.cfg.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let parsed: OcrApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        first_parsed_text(parsed)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrApiResponse {
    #[serde(default)]
    pub parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    pub is_errored_on_processing: bool,
    /// The service sends either a string or a list of strings here.
    #[serde(default)]
    pub error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParsedResult {
    #[serde(default)]
    pub parsed_text: String,
}

pub fn first_parsed_text(resp: OcrApiResponse) -> Result<String, ProviderError> {
    if resp.is_errored_on_processing {
        let message = match resp.error_message {
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => "unknown processing error".to_string(),
        };
        return Err(ProviderError::Service(message));
    }
    resp.parsed_results
        .into_iter()
        .next()
        .map(|r| r.parsed_text)
        .ok_or_else(|| ProviderError::Service("no parsed text returned".to_string()))
}

#[async_trait::async_trait]
impl TextRecognizer for OcrSpaceProvider {
    async fn recognize(&self, image: &Path) -> Option<String> {
        info!(image = %image.display(), "sending image for text recognition");
        match self.parse_image(image).await {
            Ok(text) => {
                debug!(image = %image.display(), text = %text, "recognized text");
                Some(text)
            }
            Err(e) => {
                warn!(image = %image.display(), error = %e, "text recognition unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> OcrApiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn takes_first_block_only() {
        let resp = parse(
            r#"{"ParsedResults":[{"ParsedText":"exp 15.09.24"},{"ParsedText":"ignored"}],
                "IsErroredOnProcessing":false}"#,
        );
        assert_eq!(first_parsed_text(resp).unwrap(), "exp 15.09.24");
    }

    #[test]
    fn processing_error_is_reported() {
        let resp = parse(
            r#"{"IsErroredOnProcessing":true,"ErrorMessage":["E301: bad image","timeout"]}"#,
        );
        match first_parsed_text(resp) {
            Err(ProviderError::Service(msg)) => assert_eq!(msg, "E301: bad image; timeout"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_results_are_an_error() {
        let resp = parse(r#"{"ParsedResults":[],"IsErroredOnProcessing":false}"#);
        assert!(first_parsed_text(resp).is_err());
    }

    /// Serves one canned JSON reply and hands back the raw request it got.
    async fn fake_service(reply: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.len(),
                reply
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (base_url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end].lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        });
        match length {
            Some(len) => raw.len() >= header_end + 4 + len,
            None => text.ends_with("--\r\n") || text.ends_with("0\r\n\r\n"),
        }
    }

    fn photo() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("photo.jpg");
        std::fs::write(&image, b"jpeg payload").unwrap();
        (dir, image)
    }

    #[tokio::test]
    async fn recognize_posts_form_and_returns_first_block() {
        let (base_url, request) = fake_service(
            r#"{"ParsedResults":[{"ParsedText":"best before 15.09.24"},{"ParsedText":"other"}],"IsErroredOnProcessing":false}"#,
        )
        .await;
        let (_dir, image) = photo();
        let provider = OcrSpaceProvider::new(OcrSpaceConfig {
            base_url,
            timeout: Duration::from_secs(5),
            ..OcrSpaceConfig::default()
        });

        let text = provider.recognize(&image).await;
        assert_eq!(text.as_deref(), Some("best before 15.09.24"));

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /parse/image HTTP/1.1"), "{raw}");
        assert!(raw.contains("multipart/form-data; boundary="));
        for (field, value) in [
            ("apikey", "helloworld"),
            ("language", "auto"),
            ("OCREngine", "2"),
            ("scale", "true"),
        ] {
            let expected = format!("name=\"{field}\"\r\n\r\n{value}\r\n");
            assert!(raw.contains(&expected), "missing {field}={value} in {raw}");
        }
        assert!(raw.contains("name=\"file\"; filename=\"photo.jpg\""));
        assert!(raw.contains("jpeg payload"));
    }

    #[tokio::test]
    async fn service_processing_error_yields_none() {
        let (base_url, request) = fake_service(
            r#"{"ParsedResults":[],"IsErroredOnProcessing":true,"ErrorMessage":["E500: engine busy"]}"#,
        )
        .await;
        let (_dir, image) = photo();
        let provider = OcrSpaceProvider::new(OcrSpaceConfig {
            base_url,
            timeout: Duration::from_secs(5),
            ..OcrSpaceConfig::default()
        });

        assert!(provider.recognize(&image).await.is_none());
        assert!(request.await.unwrap().contains("name=\"file\""));
    }

    #[tokio::test]
    async fn unreachable_service_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("photo.jpg");
        std::fs::write(&image, b"not really a jpeg").unwrap();
        let provider = OcrSpaceProvider::new(OcrSpaceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..OcrSpaceConfig::default()
        });
        assert!(provider.recognize(&image).await.is_none());
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let provider = OcrSpaceProvider::new(OcrSpaceConfig::default());
        assert!(provider
            .recognize(Path::new("/definitely/not/here.jpg"))
            .await
            .is_none());
    }
}
