use std::sync::Arc;

use personaplus_core::{SyncReport, SyncRequest};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::profile_sync::ProfileSync;

/// Drains sync requests in order and publishes one report per request.
pub struct SyncWorker {
    sync: Arc<ProfileSync>,
    report_tx: mpsc::Sender<SyncReport>,
}

impl SyncWorker {
    pub fn new(sync: Arc<ProfileSync>, report_tx: mpsc::Sender<SyncReport>) -> Self {
        Self { sync, report_tx }
    }

    /// Run until every request sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<SyncRequest>) {
        info!("[SyncWorker] Started");

        while let Some(request) = rx.recv().await {
            debug!(
                request_id = %request.id,
                bot = %request.bot_key,
                persona = %request.persona_id,
                trigger = ?request.trigger,
                "Processing sync request"
            );
            let report = self.sync.sync(&request).await;
            // Nobody listening for reports is fine.
            let _ = self.report_tx.send(report).await;
        }

        info!("[SyncWorker] Request channel closed, stopping");
    }

    pub fn spawn(self, rx: mpsc::Receiver<SyncRequest>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}
