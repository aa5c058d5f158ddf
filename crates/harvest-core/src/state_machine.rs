use crate::error::PipelineError;
use crate::types::TaskStatus;

/// Validates a status transition.
///
/// A run moves `Scheduled -> Busy -> {Success, Failed}`. A failed task may
/// be moved back to `Busy` by an explicit re-submission.
pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), PipelineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
pub fn allowed_transitions(from: TaskStatus) -> Vec<TaskStatus> {
    use TaskStatus::*;
    match from {
        Scheduled => vec![Busy],
        Busy => vec![Success, Failed],
        Failed => vec![Busy],
        Success => vec![],
    }
}

fn allowed(from: TaskStatus, to: TaskStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
