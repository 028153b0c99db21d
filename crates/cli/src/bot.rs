//! Chat bot loop: answers `/start` with a button that opens the web view.

use providers::telegram::{TelegramBot, Update};
use providers::ChatLauncher;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Sends the launcher for every `/start` and returns the next update offset.
pub async fn handle_updates(launcher: &dyn ChatLauncher, updates: &[Update], offset: i64) -> i64 {
    let mut next = offset;
    for update in updates {
        next = next.max(update.update_id + 1);
        if let Some(chat_id) = update.start_command_chat() {
            info!(chat_id, "start command received");
            if let Err(e) = launcher.notify(chat_id).await {
                warn!(chat_id, error = %e, "failed to send launcher");
            }
        }
    }
    next
}

/// Long-polls until `shutdown` flips to true.
pub async fn run(bot: TelegramBot, poll_timeout: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("chat bot polling started");
    let mut offset = 0;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            res = bot.get_updates(offset, poll_timeout) => match res {
                Ok(updates) => offset = handle_updates(&bot, &updates, offset).await,
                Err(e) => {
                    warn!(error = %e, "polling updates failed");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
    info!("chat bot polling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::ProviderError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        chats: Mutex<Vec<i64>>,
    }

    #[async_trait::async_trait]
    impl ChatLauncher for Recorder {
        async fn notify(&self, chat_id: i64) -> Result<(), ProviderError> {
            self.chats.lock().unwrap().push(chat_id);
            if chat_id < 0 {
                return Err(ProviderError::Service("blocked".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn only_start_commands_get_the_launcher() {
        let updates: Vec<Update> = serde_json::from_str(
            r#"[
                {"update_id": 10, "message": {"chat": {"id": 1}, "text": "/start"}},
                {"update_id": 11, "message": {"chat": {"id": 2}, "text": "milk?"}},
                {"update_id": 12, "message": {"chat": {"id": -3}, "text": "/start"}}
            ]"#,
        )
        .unwrap();
        let recorder = Recorder::default();
        let next = handle_updates(&recorder, &updates, 0).await;
        assert_eq!(next, 13);
        assert_eq!(*recorder.chats.lock().unwrap(), vec![1, -3]);
    }

    #[tokio::test]
    async fn empty_batch_keeps_offset() {
        let recorder = Recorder::default();
        assert_eq!(handle_updates(&recorder, &[], 42).await, 42);
    }
}
