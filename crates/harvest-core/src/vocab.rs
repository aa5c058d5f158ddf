//! IRIs of the job/task vocabulary

/// Predicate carrying a task's status
pub const ADMS_STATUS: &str = "http://www.w3.org/ns/adms#status";

/// Class of task records
pub const TASK_TYPE: &str = "http://redpencil.data.gift/vocabularies/tasks/Task";

/// Class of error records
pub const ERROR_TYPE: &str = "http://open-services.net/ns/core#Error";

/// Job status concepts
pub mod status {
    /// Waiting to be picked up
    pub const SCHEDULED: &str = "http://redpencil.data.gift/id/concept/JobStatus/scheduled";
    /// Being processed
    pub const BUSY: &str = "http://redpencil.data.gift/id/concept/JobStatus/busy";
    /// Finished successfully
    pub const SUCCESS: &str = "http://redpencil.data.gift/id/concept/JobStatus/success";
    /// Finished with an error
    pub const FAILED: &str = "http://redpencil.data.gift/id/concept/JobStatus/failed";
}

/// Task operation concepts
pub mod operation {
    /// Validate and keep only conforming triples
    pub const FILTERING: &str = "http://lblod.data.gift/id/jobs/concept/TaskOperation/filtering";
    /// Validate and publish the report only
    pub const VALIDATING: &str = "http://lblod.data.gift/id/jobs/concept/TaskOperation/validating";
}

/// Scheme of physical file URIs on the shared volume
pub const SHARE_SCHEME: &str = "share://";

/// Message recorded when a batch exhausts its insert attempts
pub const MAX_RETRY_MESSAGE: &str = "Reaching max retries. Check the logs for further details.";

/// Message recorded when an error carries no text
pub const DEFAULT_ERROR_MESSAGE: &str = "Unexpected error";

/// Datatype of timestamps
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Datatype of file sizes
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
