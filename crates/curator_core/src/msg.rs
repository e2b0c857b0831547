use crate::{AlbumMetadata, JobId, JobKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the identifier input box.
    InputChanged(String),
    /// User asked to run a job over the current input.
    Submitted { kind: JobKind },
    /// The content source failed to initialize; submission stays disabled.
    SourceUnavailable { reason: String },
    /// Engine picked up the dispatched job.
    JobStarted { job_id: JobId, at: String },
    /// Metadata fetch succeeded for the active job.
    MetadataReady {
        job_id: JobId,
        at: String,
        metadata: AlbumMetadata,
    },
    /// Progress line generated by the engine for the visible log.
    JobLog {
        job_id: JobId,
        at: String,
        line: String,
    },
    /// Terminal engine event; the engine sends exactly one per dispatched job.
    JobFinished {
        job_id: JobId,
        at: String,
        outcome: JobOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { message: String },
}
