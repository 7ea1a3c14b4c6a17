//! Long-polling delivery loop.
//!
//! Calls `getUpdates` with the last seen `update_id + 1`, hands each text
//! message to the [`Handler`] on its own task, and replies with
//! `sendMessage`. Poll errors are logged and retried after a pause; the
//! loop only ends on Ctrl-C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::handler::{reply_for, Handler};
use crate::telegram::{TelegramClient, Update};

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub async fn run_bot(
    client: Arc<TelegramClient>,
    handler: Arc<Handler>,
    poll_timeout_secs: u64,
) -> Result<()> {
    let me = client.get_me().await?;
    info!(bot = %me.display_name(), "bot connected; polling for messages");
    println!("Bot {} is running. Press Ctrl-C to stop.", me.display_name());

    let mut offset: Option<i64> = None;
    loop {
        let updates = tokio::select! {
            res = client.get_updates(offset, poll_timeout_secs) => res,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
        };

        let updates = match updates {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "getUpdates failed; retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(next_offset(offset, &update));
            let client = client.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                dispatch(&client, &handler, update).await;
            });
        }
    }
}

fn next_offset(current: Option<i64>, update: &Update) -> i64 {
    let next = update.update_id + 1;
    current.map_or(next, |c| c.max(next))
}

async fn dispatch(client: &TelegramClient, handler: &Handler, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(text) = message.text.as_deref() else {
        return;
    };
    let sender = message.from.as_ref().map(|u| u.display_name());

    let Some(reply) = reply_for(handler, message.chat.id, sender.as_deref(), text).await else {
        return;
    };
    if let Err(e) = client.send_message(message.chat.id, &reply).await {
        error!(chat = message.chat.id, error = %format!("{:#}", e), "sendMessage failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: i64) -> Update {
        serde_json::from_value(serde_json::json!({ "update_id": id })).unwrap()
    }

    #[test]
    fn test_next_offset_advances_past_latest() {
        assert_eq!(next_offset(None, &update(7)), 8);
        assert_eq!(next_offset(Some(8), &update(9)), 10);
        assert_eq!(next_offset(Some(12), &update(9)), 12);
    }
}
