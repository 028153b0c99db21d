use crate::{ChatLauncher, ProviderError};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
pub const GREETING: &str = "Hi! I keep track of our fridge. Tap the button below to open it.";
pub const BUTTON_TEXT: &str = "Open the fridge";

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub token: String,
    pub base_url: String,
    pub web_app_url: String,
}

#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    cfg: TelegramConfig,
}

impl TelegramBot {
    pub fn new(cfg: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.cfg.base_url, self.cfg.token, method)
    }

    /// Long-polls for new updates starting at `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, ProviderError> {
        #[derive(Serialize)]
        struct GetUpdates {
            offset: i64,
            timeout: u64,
            allowed_updates: [&'static str; 1],
        }
        let body = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let resp = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + Duration::from_secs(10))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let parsed: ApiResponse<Vec<Update>> = check(resp).await?;
        into_result(parsed)
    }

    pub async fn send_launcher(&self, chat_id: i64) -> Result<(), ProviderError> {
        let body = launcher_message(chat_id, &self.cfg.web_app_url);
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let parsed: ApiResponse<serde_json::Value> = check(resp).await?;
        into_result(parsed).map(|_| ())
    }
}

#[async_trait::async_trait]
impl ChatLauncher for TelegramBot {
    async fn notify(&self, chat_id: i64) -> Result<(), ProviderError> {
        self.send_launcher(chat_id).await
    }
}

async fn check<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
) -> Result<ApiResponse<T>, ProviderError> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
        return Err(ProviderError::RequestFailed(format!(
            "status {} body {:?}",
            status, body
        )));
    }
    resp.json()
        .await
        .map_err(|e| ProviderError::RequestFailed(e.to_string()))
}

fn into_result<T>(resp: ApiResponse<T>) -> Result<T, ProviderError> {
    match (resp.ok, resp.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(ProviderError::Service(
            resp.description.unwrap_or_else(|| "telegram call failed".into()),
        )),
    }
}

/// Builds the `sendMessage` body carrying the web-app button.
pub fn launcher_message(chat_id: i64, web_app_url: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": GREETING,
        "reply_markup": {
            "inline_keyboard": [[{
                "text": BUTTON_TEXT,
                "web_app": { "url": web_app_url }
            }]]
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// Chat id of a `/start` command, if this update carries one.
    pub fn start_command_chat(&self) -> Option<i64> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_deref()?.trim();
        let command = text.split_whitespace().next()?;
        let command = command.split('@').next()?;
        (command == "/start").then_some(msg.chat.id)
    }
}
