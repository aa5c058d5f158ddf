//! Fire-and-forget submission of task subjects
//!
//! [`WorkQueue::submit`] never blocks and never waits for the run. A
//! dispatcher task receives subjects and spawns one orchestrator run per
//! subject. Closing the queue lets the dispatcher drain the runs still in
//! progress and exit.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::PipelineError;
use crate::orchestrator::{PipelineOrchestrator, RunOutcome};

/// Unbounded queue in front of the orchestrator
#[derive(Debug, Clone)]
pub struct WorkQueue {
    sender: mpsc::UnboundedSender<String>,
}

impl WorkQueue {
    /// Start the dispatcher; the handle resolves once every sender is
    /// dropped and all runs have finished
    pub fn start(orchestrator: Arc<PipelineOrchestrator>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(orchestrator, receiver));
        (Self { sender }, dispatcher)
    }

    /// Queue one subject
    pub fn submit(&self, subject: impl Into<String>) -> Result<(), PipelineError> {
        let subject = subject.into();
        tracing::debug!(subject = %subject, "queued");
        self.sender
            .send(subject)
            .map_err(|e| PipelineError::Join(format!("work queue closed, dropped {}", e.0)))
    }

    /// Queue several subjects, in order
    pub fn submit_all(
        &self,
        subjects: impl IntoIterator<Item = String>,
    ) -> Result<usize, PipelineError> {
        let mut count = 0;
        for subject in subjects {
            self.submit(subject)?;
            count += 1;
        }
        Ok(count)
    }
}

async fn dispatch(
    orchestrator: Arc<PipelineOrchestrator>,
    mut receiver: mpsc::UnboundedReceiver<String>,
) {
    let mut runs = JoinSet::new();
    while let Some(subject) = receiver.recv().await {
        let orchestrator = Arc::clone(&orchestrator);
        runs.spawn(async move {
            let outcome = orchestrator.run(&subject).await;
            log_outcome(&subject, &outcome);
        });
        while let Some(finished) = runs.try_join_next() {
            if let Err(e) = finished {
                tracing::error!(error = %e, "run panicked");
            }
        }
    }
    while let Some(finished) = runs.join_next().await {
        if let Err(e) = finished {
            tracing::error!(error = %e, "run panicked");
        }
    }
    tracing::debug!("work queue drained");
}

fn log_outcome(subject: &str, outcome: &Result<RunOutcome, PipelineError>) {
    match outcome {
        Ok(RunOutcome::Succeeded(task)) => {
            tracing::info!(subject, task_id = %task.id, "run succeeded");
        }
        Ok(RunOutcome::Failed { message, .. }) => {
            tracing::warn!(subject, message = %message, "run failed");
        }
        Ok(RunOutcome::Ignored(reason)) => {
            tracing::debug!(subject, ?reason, "run ignored");
        }
        Err(e) => {
            tracing::error!(subject, error = %e, "run aborted");
        }
    }
}
