use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{sampling_loop, SamplerJob};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Owns the repeating sampling task of one session.
pub struct SamplerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the sampling task. A task that was never stopped is cancelled
    /// and aborted first, so at most one loop runs per controller.
    pub fn start(&mut self, job: SamplerJob) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(previous) = self.handle.take() {
            log_warn!("replacing a sampler task that was never stopped");
            previous.abort();
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(job, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Cancels the task and waits for it to exit, so no tick runs after this
    /// returns. Calling it again is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                log_debug!("waiting for sampler task to exit");
                handle.await.context("sampler task failed to join")
            }
            None => Ok(()),
        }
    }
}

impl Default for SamplerController {
    fn default() -> Self {
        Self::new()
    }
}
