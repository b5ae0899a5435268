//! Background alignment thread.
//!
//! Requests go in over a command channel; results come back tagged with the
//! session generation that issued them, so the session can drop results that
//! a newer load has made stale.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::align::{align_channels, AlignmentOutcome};
use crate::error::Result;
use crate::pipeline::config::AlignmentConfig;
use crate::pipeline::{CancelToken, NoOpReporter, ProgressReporter};
use crate::session::AlignRequest;

/// Alignment result posted back by the worker.
#[derive(Debug)]
pub struct AlignResult {
    pub generation: u64,
    pub result: Result<AlignmentOutcome>,
}

enum Command {
    Align {
        request: AlignRequest,
        config: AlignmentConfig,
        cancel: CancelToken,
    },
}

/// Handle to the alignment thread. Dropping it stops the thread.
pub struct AlignWorker {
    cmd_tx: Option<mpsc::Sender<Command>>,
    result_rx: mpsc::Receiver<AlignResult>,
    handle: Option<JoinHandle<()>>,
    current: Option<CancelToken>,
}

impl AlignWorker {
    pub fn spawn() -> Result<Self> {
        Self::spawn_with_reporter(Arc::new(NoOpReporter))
    }

    pub fn spawn_with_reporter(reporter: Arc<dyn ProgressReporter>) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (result_tx, result_rx) = mpsc::channel::<AlignResult>();

        let handle = std::thread::Builder::new()
            .name("prokudin-align".into())
            .spawn(move || worker_loop(cmd_rx, result_tx, reporter))?;

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            result_rx,
            handle: Some(handle),
            current: None,
        })
    }

    /// Queue an alignment. Any run still in progress is cancelled.
    pub fn submit(&mut self, request: AlignRequest, config: &AlignmentConfig) -> CancelToken {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let cancel = CancelToken::new();
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Align {
                request,
                config: config.clone(),
                cancel: cancel.clone(),
            });
        }
        self.current = Some(cancel.clone());
        cancel
    }

    /// Cancel the run in progress, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    pub fn try_recv(&self) -> Option<AlignResult> {
        self.result_rx.try_recv().ok()
    }

    /// Block until the next result. `None` once the worker has stopped.
    pub fn recv(&self) -> Option<AlignResult> {
        self.result_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<AlignResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for AlignWorker {
    fn drop(&mut self) {
        self.cancel();
        self.cmd_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    cmd_rx: mpsc::Receiver<Command>,
    result_tx: mpsc::Sender<AlignResult>,
    reporter: Arc<dyn ProgressReporter>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Align {
                request,
                config,
                cancel,
            } => {
                debug!(generation = request.generation, "Alignment started");
                let result =
                    align_channels(&request.channels, &config, reporter.as_ref(), &cancel);
                let sent = result_tx.send(AlignResult {
                    generation: request.generation,
                    result,
                });
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Alignment worker stopped");
}
