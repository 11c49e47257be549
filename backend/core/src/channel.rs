use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::{SyncReport, SyncRequest};

/// Default channel buffer size for sync traffic.
const DEFAULT_BUFFER_SIZE: usize = 64;

/// Channels connecting the persona engine to the background sync worker.
///
/// Requests flow engine → worker, reports flow worker → whoever watches them,
/// so a failing sync never feeds back into local state.
pub struct SyncBus {
    pub request_tx: mpsc::Sender<SyncRequest>,
    pub request_rx: Option<mpsc::Receiver<SyncRequest>>,

    pub report_tx: mpsc::Sender<SyncReport>,
    pub report_rx: Option<mpsc::Receiver<SyncReport>>,
}

impl SyncBus {
    /// Create a new bus with default buffer sizes.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (request_tx, request_rx) = mpsc::channel(buffer);
        let (report_tx, report_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "SyncBus initialized");

        Self {
            request_tx,
            request_rx: Some(request_rx),
            report_tx,
            report_rx: Some(report_rx),
        }
    }

    /// Take the request receiver (can only be called once).
    pub fn take_request_rx(&mut self) -> Option<mpsc::Receiver<SyncRequest>> {
        debug!("Sync request receiver taken");
        self.request_rx.take()
    }

    /// Take the report receiver (can only be called once).
    pub fn take_report_rx(&mut self) -> Option<mpsc::Receiver<SyncReport>> {
        debug!("Sync report receiver taken");
        self.report_rx.take()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}
