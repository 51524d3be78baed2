use chrono::Utc;
use log::error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::core::{NoteError, Result};
use crate::scheduler::DeathScheduler;

/// Background worker driving the scheduler on its configured interval.
///
/// Stopping is cooperative: an in-flight sweep finishes its dispatched
/// finalizations before the loop exits. Dropping the handle without calling
/// `stop` aborts the loop instead.
pub struct SchedulerWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl SchedulerWorker {
    /// Spawns the periodic sweep loop on the current tokio runtime.
    pub fn spawn(scheduler: DeathScheduler) -> Result<Self> {
        let interval = scheduler
            .config()
            .sweep_interval
            .to_std()
            .map_err(|_| NoteError::Validation("sweep_interval must be positive".to_string()))?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let join_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        break;
                    }
                    _ = sleep(interval) => {
                        if let Err(err) = scheduler.run_tick(Utc::now()).await {
                            error!("sweep aborted: {err}");
                        }
                    }
                }
            }
        });

        Ok(Self {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| NoteError::Internal(format!("scheduler worker join: {err}")))?;
        }

        Ok(())
    }
}

impl Drop for SchedulerWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}
