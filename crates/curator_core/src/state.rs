use crate::msg::JobOutcome;
use crate::view_model::{AlbumCardView, AppViewModel, JobRowView};
use crate::{AlbumMetadata, Job, JobId, JobState, LogEntry};

/// Whole-application state. Mutated only through [`crate::update`]; the
/// shell observes it through [`AppState::view`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    source_error: Option<String>,
    active: Option<Job>,
    last_finished: Option<Job>,
    metadata: Option<AlbumMetadata>,
    log: Vec<LogEntry>,
    status: String,
    next_job_id: JobId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let job = self
            .active
            .as_ref()
            .or(self.last_finished.as_ref())
            .map(job_row);
        AppViewModel {
            status_line: self.status.clone(),
            busy: self.is_busy(),
            controls_enabled: self.source_error.is_none() && !self.is_busy(),
            input: self.input.clone(),
            job,
            album: self.metadata.as_ref().map(album_card),
            log: self.log.clone(),
            dirty: self.dirty,
        }
    }

    /// True while a job is resolving or running; checked synchronously at
    /// submit time to enforce single-flight.
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|job| job.state.is_active())
    }

    /// Returns and clears the dirty flag; the shell re-renders when true.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn set_input(&mut self, text: String) {
        self.input = text;
        self.dirty = true;
    }

    pub(crate) fn source_error(&self) -> Option<&str> {
        self.source_error.as_deref()
    }

    pub(crate) fn mark_source_unavailable(&mut self, reason: String) {
        self.status = format!("error: content source unavailable: {reason}");
        self.source_error = Some(reason);
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        self.dirty = true;
    }

    pub(crate) fn push_log(&mut self, at: String, line: String) {
        self.log.push(LogEntry { at, line });
        self.dirty = true;
    }

    pub(crate) fn allocate_job_id(&mut self) -> JobId {
        self.next_job_id += 1;
        self.next_job_id
    }

    /// Installs the new active job and clears the previous metadata card.
    pub(crate) fn begin(&mut self, job: Job) {
        self.metadata = None;
        self.active = Some(job);
        self.dirty = true;
    }

    /// Records a job that died before dispatch (resolution failure).
    pub(crate) fn record_rejected(&mut self, job: Job) {
        self.metadata = None;
        self.last_finished = Some(job);
        self.dirty = true;
    }

    /// The active job, but only if `job_id` matches and it is not terminal.
    /// Late engine events for finished jobs fall through to `None`.
    pub(crate) fn active_job(&self, job_id: JobId) -> Option<&Job> {
        self.active
            .as_ref()
            .filter(|job| job.id == job_id && !job.state.is_terminal())
    }

    pub(crate) fn store_metadata(&mut self, metadata: AlbumMetadata) {
        self.metadata = Some(metadata);
        self.dirty = true;
    }

    pub(crate) fn metadata(&self) -> Option<&AlbumMetadata> {
        self.metadata.as_ref()
    }

    /// Moves the active job to its terminal state and clears the busy flag.
    ///
    /// Consuming the active slot makes cleanup exactly-once: a duplicate or
    /// late terminal event finds no matching job and is ignored.
    pub(crate) fn finish(&mut self, job_id: JobId, outcome: &JobOutcome) -> Option<Job> {
        self.active_job(job_id)?;
        let mut job = self.active.take().expect("active job checked above");
        match outcome {
            JobOutcome::Succeeded => job.state = JobState::Succeeded,
            JobOutcome::Failed { message } => {
                job.state = JobState::Failed;
                job.error = Some(message.clone());
            }
        }
        self.last_finished = Some(job.clone());
        self.dirty = true;
        Some(job)
    }
}

fn job_row(job: &Job) -> JobRowView {
    JobRowView {
        job_id: job.id,
        kind: job.kind,
        album_id: job
            .album
            .as_ref()
            .map(|album| album.to_string())
            .unwrap_or_else(|| job.input.clone()),
        state: job.state,
        error: job.error.clone(),
    }
}

fn album_card(metadata: &AlbumMetadata) -> AlbumCardView {
    AlbumCardView {
        name: metadata.name.clone(),
        author: metadata.author.clone(),
        tags: metadata.tags.clone(),
        chapter_count: metadata.chapter_count,
        description: metadata.description.clone(),
    }
}
