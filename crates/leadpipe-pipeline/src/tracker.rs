//! Best-effort campaign status and log writer.
//!
//! Callers never wait on storage: commands go through an unbounded channel to
//! one writer task per run, which applies them in issue order. Storage errors
//! are logged and dropped. The writer exits once every handle is dropped.

use std::sync::Arc;

use leadpipe_core::{CampaignStatus, LogEntry};
use tokio::sync::{mpsc, oneshot};

use crate::store::{CampaignStore, StatusFields};

#[derive(Debug)]
enum Command {
    Log(LogEntry),
    Status {
        status: CampaignStatus,
        fields: StatusFields,
    },
    Flush(oneshot::Sender<()>),
}

/// Cheap-to-clone handle onto one campaign's writer task.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    campaign_id: i64,
    tx: mpsc::UnboundedSender<Command>,
}

impl StatusTracker {
    /// Starts the writer task for `campaign_id`.
    pub fn spawn(store: Arc<dyn CampaignStore>, campaign_id: i64) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Log(entry) => {
                        if let Err(e) = store.append_log(campaign_id, &entry).await {
                            tracing::warn!(
                                campaign_id,
                                message = %entry.message,
                                error = %e,
                                "failed to append campaign log"
                            );
                        }
                    }
                    Command::Status { status, fields } => {
                        if let Err(e) = store.set_status(campaign_id, status, &fields).await {
                            tracing::error!(
                                campaign_id,
                                status = %status,
                                error = %e,
                                "failed to update campaign status"
                            );
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { campaign_id, tx }
    }

    #[must_use]
    pub fn campaign_id(&self) -> i64 {
        self.campaign_id
    }

    /// Queues one log line, stamped now.
    pub fn record_log(&self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        tracing::debug!(campaign_id = self.campaign_id, message = %entry.message, "campaign log");
        self.send(Command::Log(entry));
    }

    /// Queues a status transition with its accompanying fields.
    pub fn set_status(&self, status: CampaignStatus, fields: StatusFields) {
        self.send(Command::Status { status, fields });
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!(
                campaign_id = self.campaign_id,
                "status tracker writer is gone; dropping update"
            );
        }
    }

    /// Waits until every write queued before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(Command::Flush(done));
        if wait.await.is_err() {
            tracing::error!(
                campaign_id = self.campaign_id,
                "status tracker writer stopped before flushing"
            );
        }
    }
}
