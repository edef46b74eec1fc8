//! Remote command mode.
//!
//! Polls a [`CommandSource`] for drink orders and pours them through the
//! same [`Session`] the console uses, so overlapping jobs are refused the
//! same way.
//!
//! | Outcome             | Consumed | Confirmation |
//! |---------------------|----------|--------------|
//! | dispensed           | yes      | yes          |
//! | interrupted         | yes      | no           |
//! | unknown drink       | yes      | no           |
//! | dispenser busy      | no       | no           |
//!
//! Transport faults are logged and retried on the next poll; they never
//! end the loop.  The loop exits once the emergency stop is engaged.

use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::config::RemoteConfig;
use crate::error::{Error, TransportError, UnknownCommand};

use super::ports::{CommandSource, EventSink, RemoteCommand};
use super::session::Session;

/// What one poll did with each command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Recipe names poured to completion.
    pub dispensed: Vec<String>,
    /// Ids of commands naming no known drink.
    pub unknown: Vec<String>,
    /// Ids left for redelivery.
    pub deferred: Vec<String>,
    /// Ids consumed without a confirmation (job cut short or failed).
    pub failed: Vec<String>,
}

pub struct RemoteLoop<S> {
    source: S,
    subject_filter: String,
    poll_interval: Duration,
}

impl<S: CommandSource> RemoteLoop<S> {
    pub fn new(source: S, config: &RemoteConfig) -> Self {
        Self {
            source,
            subject_filter: config.subject_filter.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and handle every pending command once.
    pub fn poll_once(
        &mut self,
        session: &Session,
        sink: &mut dyn EventSink,
    ) -> Result<PollSummary, TransportError> {
        let commands = self.source.fetch_unread()?;
        let mut summary = PollSummary::default();
        for command in commands {
            if session.engine().emergency_stop().is_engaged() {
                summary.deferred.push(command.id);
                continue;
            }
            self.handle(command, session, sink, &mut summary);
        }
        Ok(summary)
    }

    /// Poll until the emergency stop is engaged.
    pub fn run(&mut self, session: &Session, sink: &mut dyn EventSink) {
        let stop = session.engine().emergency_stop().clone();
        info!(
            "Remote mode: polling every {}s for '{}'",
            self.poll_interval.as_secs(),
            self.subject_filter
        );
        loop {
            match self.poll_once(session, sink) {
                Ok(summary) if summary != PollSummary::default() => {
                    info!(
                        "Poll: {} poured, {} unknown, {} deferred, {} failed",
                        summary.dispensed.len(),
                        summary.unknown.len(),
                        summary.deferred.len(),
                        summary.failed.len()
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("{e}; retrying in {}s", self.poll_interval.as_secs()),
            }
            if !stop.wait_until(Instant::now() + self.poll_interval) {
                info!("Remote mode stopped");
                return;
            }
        }
    }

    fn handle(
        &mut self,
        command: RemoteCommand,
        session: &Session,
        sink: &mut dyn EventSink,
        summary: &mut PollSummary,
    ) {
        let text = command.text.trim().to_lowercase();
        let Some(recipe) = session.catalog().find(&text).map(|r| r.name.clone()) else {
            warn!(
                "{}",
                UnknownCommand {
                    id: command.id.clone(),
                    text,
                }
            );
            self.consume(&command.id);
            summary.unknown.push(command.id);
            return;
        };

        info!("Remote order {}: {recipe}", command.id);
        match session.dispense(&recipe, sink) {
            Ok(result) if result.completed => {
                self.consume(&command.id);
                self.confirm(&recipe);
                summary.dispensed.push(recipe);
            }
            Ok(_) => {
                warn!("Remote order {} for {recipe} was interrupted", command.id);
                self.consume(&command.id);
                summary.failed.push(command.id);
            }
            Err(Error::Busy | Error::EmergencyStopped) => {
                info!("Remote order {} deferred: dispenser unavailable", command.id);
                summary.deferred.push(command.id);
            }
            Err(e) => {
                error!("Remote order {} failed: {e}", command.id);
                self.consume(&command.id);
                summary.failed.push(command.id);
            }
        }
    }

    fn consume(&mut self, id: &str) {
        if let Err(e) = self.source.mark_consumed(id) {
            warn!("Could not mark command {id} consumed: {e}");
        }
    }

    fn confirm(&mut self, recipe: &str) {
        let subject = format!("{recipe} ready - {}", self.subject_filter);
        let body = format!("Your {recipe} has been prepared. Enjoy!");
        if let Err(e) = self.source.send_confirmation(&subject, &body) {
            warn!("Confirmation for {recipe} not sent: {e}");
        }
    }
}
