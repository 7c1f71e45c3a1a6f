use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{format_timestamp, now_utc};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("notification serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub account_id: String,
    pub username: String,
    pub email: Option<String>,
}

/// Delivers one message to one account. Called after the triggering write has
/// committed.
pub trait Notifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct OutboxMessage<'a> {
    id: String,
    created_at: String,
    recipient: &'a Recipient,
    subject: &'a str,
    body: &'a str,
}

/// Writes each message as `<uuid>.json` under `dir` for an external mailer.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        fs::create_dir_all(&self.dir)?;
        let message = OutboxMessage {
            id: Uuid::now_v7().to_string(),
            created_at: format_timestamp(now_utc()),
            recipient,
            subject,
            body,
        };
        let path = self.dir.join(format!("{}.json", message.id));
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;
        serde_json::to_writer_pretty(&mut file, &message)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        tracing::debug!(path = %path.display(), to = %recipient.username, "queued notification");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(
            account_id = %recipient.account_id,
            to = %recipient.username,
            subject,
            body,
            "notification"
        );
        Ok(())
    }
}
