//! Spool-directory command transport.
//!
//! A mailbox on the filesystem: each file in the inbox is one message
//! with mail-style headers, a blank line, then the body.  The first
//! non-empty body line names the drink.
//!
//! ```text
//! Subject: Drink Order
//! From: guest@example.com
//!
//! Gin & Tonic
//! ```
//!
//! Consumed messages move to `<inbox>/seen/`, as do messages that cannot
//! be read at all, so one bad file never blocks the inbox.  Confirmations
//! are written to the outbox as new files.  Anything that can move mail
//! in and out of these directories (fetchmail, a webhook, `cp`) completes
//! the loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::app::ports::{CommandSource, RemoteCommand};
use crate::config::RemoteConfig;
use crate::error::TransportError;

const SEEN_DIR: &str = "seen";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Message {
    subject: String,
    from: String,
    body: String,
}

fn parse_message(text: &str) -> Message {
    let mut msg = Message::default();
    let mut lines = text.lines();
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_lowercase().as_str() {
                "subject" => msg.subject = value.trim().to_owned(),
                "from" => msg.from = value.trim().to_owned(),
                _ => {}
            }
        }
    }
    msg.body = lines
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_owned();
    msg
}

pub struct SpoolSource {
    inbox: PathBuf,
    outbox: PathBuf,
    subject_filter: String,
    sender: String,
    recipient: String,
    sent: u64,
}

impl SpoolSource {
    /// Creates the inbox, `seen/` and outbox directories if needed.
    pub fn new(config: &RemoteConfig) -> Result<Self, TransportError> {
        fs::create_dir_all(config.inbox_dir.join(SEEN_DIR))?;
        fs::create_dir_all(&config.outbox_dir)?;
        info!(
            "SpoolSource: inbox {}, outbox {}",
            config.inbox_dir.display(),
            config.outbox_dir.display()
        );
        Ok(Self {
            inbox: config.inbox_dir.clone(),
            outbox: config.outbox_dir.clone(),
            subject_filter: config.subject_filter.clone(),
            sender: config.sender.clone(),
            recipient: config.recipient.clone(),
            sent: 0,
        })
    }

    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    fn wanted(&self, msg: &Message) -> bool {
        let subject_ok = msg
            .subject
            .to_lowercase()
            .contains(&self.subject_filter.to_lowercase());
        let sender_ok = self.sender.is_empty() || msg.from.to_lowercase().contains(&self.sender.to_lowercase());
        subject_ok && sender_ok
    }

    /// Move a message that can never be parsed out of the inbox.
    fn set_aside(&self, path: &Path, id: &str) {
        if let Err(e) = fs::rename(path, self.inbox.join(SEEN_DIR).join(id)) {
            warn!("SpoolSource: could not move {id} aside: {e}");
        }
    }
}

impl CommandSource for SpoolSource {
    fn fetch_unread(&mut self) -> Result<Vec<RemoteCommand>, TransportError> {
        let entries = fs::read_dir(&self.inbox)
            .map_err(|e| TransportError::Fetch(format!("{}: {e}", self.inbox.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut commands = Vec::new();
        for path in files {
            let Some(id) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("SpoolSource: unreadable message {id} ({e}); moving it to {SEEN_DIR}/");
                    self.set_aside(&path, &id);
                    continue;
                }
            };
            let msg = parse_message(&text);
            if self.wanted(&msg) {
                commands.push(RemoteCommand { id, text: msg.body });
            } else {
                debug!("SpoolSource: ignoring {id} (subject '{}', from '{}')", msg.subject, msg.from);
            }
        }
        Ok(commands)
    }

    fn mark_consumed(&mut self, id: &str) -> Result<(), TransportError> {
        let from = self.inbox.join(id);
        let to = self.inbox.join(SEEN_DIR).join(id);
        fs::rename(&from, &to).map_err(|e| TransportError::MarkConsumed {
            id: id.to_owned(),
            reason: e.to_string(),
        })
    }

    fn send_confirmation(&mut self, subject: &str, body: &str) -> Result<(), TransportError> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.sent += 1;
        let path = self.outbox.join(format!("{stamp}-{}.txt", self.sent));
        let text = format!("To: {}\nSubject: {subject}\n\n{body}\n", self.recipient);
        fs::write(&path, text).map_err(|e| TransportError::Send(format!("{}: {e}", path.display())))?;
        info!("Confirmation queued: {}", path.display());
        Ok(())
    }
}
